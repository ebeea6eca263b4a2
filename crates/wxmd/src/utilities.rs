//! Utility functions and constants for HTML processing.

use crate::node::Node;

/// Block-level HTML elements
pub const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "center", "dd", "dir", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hgroup", "hr", "html", "li", "main", "menu", "nav", "ol", "p", "pre",
    "section", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Check if a tag is a block-level element
pub fn is_block(tag: &str) -> bool {
    BLOCK_ELEMENTS.contains(&tag.to_lowercase().as_str())
}

/// Check if any descendant element of a node is block-level
pub fn has_block_descendant(node: &Node) -> bool {
    node.find_descendant(&|n: &Node| is_block(n.tag_name()))
        .is_some()
}

/// Clean an attribute value (trim and handle empty)
pub fn clean_attribute(value: Option<&str>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_default()
}

/// Collapse whitespace runs in text to single spaces.
///
/// NBSP counts as a space here so article padding does not survive.
pub fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_whitespace = false;

    for c in s.chars() {
        if c.is_whitespace() {
            if !prev_was_whitespace {
                result.push(' ');
                prev_was_whitespace = true;
            }
        } else {
            result.push(c);
            prev_was_whitespace = false;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_block() {
        assert!(is_block("div"));
        assert!(is_block("p"));
        assert!(is_block("DIV"));
        assert!(!is_block("span"));
        assert!(!is_block("a"));
    }

    #[test]
    fn test_has_block_descendant() {
        let mut span = Node::element("span");
        let mut inner = Node::element("em");
        inner.add_child(Node::element("p"));
        span.add_child(inner);
        assert!(has_block_descendant(&span));
        assert!(!has_block_descendant(&Node::element("span")));
    }

    #[test]
    fn test_clean_attribute() {
        assert_eq!(clean_attribute(Some("  x ")), "x");
        assert_eq!(clean_attribute(Some("   ")), "");
        assert_eq!(clean_attribute(None), "");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a \n\t b\u{a0}\u{a0}c"), "a b c");
        assert_eq!(collapse_whitespace("  "), " ");
    }
}
