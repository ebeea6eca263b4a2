//! Multimedia extraction.
//!
//! Audio, video and mini-program widgets cannot survive as Markdown. Each one
//! matched by a [`MediaRule`](crate::rules::MediaRule) is replaced with a
//! paragraph describing it, plus a link when a usable URL exists.

use crate::node::Node;
use crate::rules::MediaRules;
use crate::utilities::collapse_whitespace;

/// What kind of widget was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
    MiniProgram,
    Unknown,
}

impl MediaKind {
    fn label(self) -> &'static str {
        match self {
            MediaKind::Audio => "Audio:",
            MediaKind::Video => "Video:",
            MediaKind::MiniProgram => "Mini Program:",
            MediaKind::Unknown => "Multimedia:",
        }
    }

    fn link_text(self) -> &'static str {
        match self {
            MediaKind::Audio => "Listen",
            _ => "Watch video",
        }
    }
}

/// Description of one multimedia element
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSummary {
    pub kind: MediaKind,
    pub title: Option<String>,
    pub author: Option<String>,
    /// Display duration such as `3:25`
    pub duration: Option<String>,
    pub url: Option<String>,
}

impl MediaSummary {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            title: None,
            author: None,
            duration: None,
            url: None,
        }
    }

    /// The notice used when nothing better can be said
    pub fn generic() -> Self {
        Self::new(MediaKind::Unknown)
    }

    pub fn with_title(mut self, title: Option<&str>) -> Self {
        self.title = clean_text(title);
        self
    }

    pub fn with_author(mut self, author: Option<&str>) -> Self {
        self.author = clean_text(author);
        self
    }

    pub fn with_duration(mut self, raw: Option<&str>) -> Self {
        self.duration = raw.and_then(format_duration);
        self
    }

    pub fn with_url(mut self, raw: Option<&str>) -> Self {
        self.url = raw.and_then(media_url);
        self
    }

    /// Text between the label and the link, e.g. `Name - Author (3:25)`
    pub fn description(&self) -> String {
        if self.kind == MediaKind::Unknown {
            return "embedded content detected".to_string();
        }

        let mut text = [self.title.as_deref(), self.author.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" - ");
        if text.is_empty() {
            text.push_str("untitled");
        }
        if let Some(duration) = &self.duration {
            text.push_str(&format!(" ({duration})"));
        }
        text
    }

    /// Build the replacement paragraph
    pub fn to_node(&self) -> Node {
        let mut label = Node::element("strong");
        label.add_child(Node::text(self.kind.label()));

        let mut paragraph = Node::element("p");
        paragraph.add_child(label);
        paragraph.add_child(Node::text(&format!(" {}", self.description())));

        let url = self.url.as_ref().filter(|_| self.kind != MediaKind::Unknown);
        if let Some(url) = url {
            let mut link = Node::element_with_attrs("a", vec![("href", url.as_str())]);
            link.add_child(Node::text(self.kind.link_text()));
            paragraph.add_child(Node::text(" "));
            paragraph.add_child(link);
        }

        paragraph
    }
}

/// Format a duration attribute.
///
/// Values containing `:` are already formatted; bare integers are
/// milliseconds. Anything else is dropped.
pub fn format_duration(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.contains(':') {
        return Some(raw.to_string());
    }
    let millis: u64 = raw.parse().ok()?;
    let seconds = millis / 1000;
    Some(format!("{}:{:02}", seconds / 60, seconds % 60))
}

/// Keep `http(s)` URLs; protocol-relative ones become `https:`
pub fn media_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Some(rest) = raw.strip_prefix("//") {
        return (!rest.is_empty()).then(|| format!("https://{rest}"));
    }
    let lower = raw.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://")).then(|| raw.to_string())
}

fn clean_text(value: Option<&str>) -> Option<String> {
    value
        .map(|v| collapse_whitespace(v).trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Replaces multimedia elements with descriptive paragraphs
pub struct MediaExtractor<'a> {
    rules: &'a MediaRules,
}

impl<'a> MediaExtractor<'a> {
    pub fn new(rules: &'a MediaRules) -> Self {
        Self { rules }
    }

    /// Return a copy of the tree with every matched element replaced
    pub fn extract(&self, node: &Node) -> Node {
        let mut out = node.shallow_clone();

        for child in node.children() {
            match self.rules.for_node(child) {
                Some(rule) => {
                    let summary = rule.summarize(child);
                    tracing::trace!(
                        tag = child.tag_name(),
                        kind = ?summary.kind,
                        "replaced multimedia element"
                    );
                    out.add_child(summary.to_node());
                }
                None => out.add_child(self.extract(child)),
            }
        }

        out
    }
}
