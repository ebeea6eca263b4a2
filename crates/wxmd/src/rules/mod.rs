//! Rule system for multimedia detection.

mod rule;
mod wechat;

pub use rule::{DescribeFn, Filter, MediaRule};
pub use wechat::wechat_rules;

use indexmap::IndexMap;

use crate::node::Node;

/// Collection of multimedia rules
pub struct MediaRules {
    /// Custom rules added by the user (checked first)
    custom_rules: IndexMap<String, MediaRule>,
    /// Built-in WeChat widget rules
    builtin_rules: Vec<MediaRule>,
}

impl MediaRules {
    /// Create a new MediaRules instance with the built-in rules
    pub fn new() -> Self {
        Self {
            custom_rules: IndexMap::new(),
            builtin_rules: wechat_rules(),
        }
    }

    /// Add a custom rule; re-using a key replaces the earlier rule
    pub fn add(&mut self, key: &str, rule: MediaRule) {
        self.custom_rules.insert(key.to_string(), rule);
    }

    /// Find the first rule matching a node
    pub fn for_node(&self, node: &Node) -> Option<&MediaRule> {
        self.custom_rules
            .values()
            .chain(self.builtin_rules.iter())
            .find(|rule| rule.filter.matches(node))
    }
}

impl Default for MediaRules {
    fn default() -> Self {
        Self::new()
    }
}
