//! Rule and Filter types for multimedia detection.

use crate::media::MediaSummary;
use crate::node::Node;

/// Type alias for describe functions
pub type DescribeFn = Box<dyn Fn(&Node) -> Option<MediaSummary> + Send + Sync>;

/// A filter determines which elements a rule applies to
pub enum Filter {
    /// Match a single tag name
    TagName(String),
    /// Match any of multiple tag names
    TagNames(Vec<String>),
    /// Match using a predicate function
    Predicate(Box<dyn Fn(&Node) -> bool + Send + Sync>),
}

impl Filter {
    /// Create a filter for a single tag
    pub fn tag(name: &str) -> Self {
        Filter::TagName(name.to_lowercase())
    }

    /// Create a filter for multiple tags
    pub fn tags(names: &[&str]) -> Self {
        Filter::TagNames(names.iter().map(|s| s.to_lowercase()).collect())
    }

    /// Create a filter with a predicate
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Node) -> bool + Send + Sync + 'static,
    {
        Filter::Predicate(Box::new(f))
    }

    /// Check if this filter matches an element
    pub fn matches(&self, node: &Node) -> bool {
        if !node.is_element() {
            return false;
        }
        match self {
            Filter::TagName(t) => node.tag_name() == t.as_str(),
            Filter::TagNames(tags) => tags.iter().any(|t| t.as_str() == node.tag_name()),
            Filter::Predicate(f) => f(node),
        }
    }
}

/// A rule describes a matched multimedia element.
///
/// `describe` returns `None` when the markup is too broken to summarise; the
/// element is then replaced by the generic multimedia notice.
pub struct MediaRule {
    pub filter: Filter,
    pub describe: DescribeFn,
}

impl MediaRule {
    pub fn new<F>(filter: Filter, describe: F) -> Self
    where
        F: Fn(&Node) -> Option<MediaSummary> + Send + Sync + 'static,
    {
        Self {
            filter,
            describe: Box::new(describe),
        }
    }

    /// Create a rule that matches a single tag
    pub fn for_tag<F>(tag: &str, describe: F) -> Self
    where
        F: Fn(&Node) -> Option<MediaSummary> + Send + Sync + 'static,
    {
        Self::new(Filter::tag(tag), describe)
    }

    /// Create a rule that matches multiple tags
    pub fn for_tags<F>(tags: &[&str], describe: F) -> Self
    where
        F: Fn(&Node) -> Option<MediaSummary> + Send + Sync + 'static,
    {
        Self::new(Filter::tags(tags), describe)
    }

    /// Summarise a matched element, falling back to the generic notice
    pub fn summarize(&self, node: &Node) -> MediaSummary {
        (self.describe)(node).unwrap_or_else(MediaSummary::generic)
    }
}
