//! Sanitizer: strips non-content elements and presentation attributes.

use crate::node::Node;

/// Elements removed together with their content
pub const REMOVED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "head", "title", "meta", "link", "base", "svg",
];

/// Presentation attributes dropped from every element
pub const PRESENTATION_ATTRIBUTES: &[&str] = &[
    "style",
    "class",
    "id",
    "width",
    "height",
    "align",
    "valign",
    "bgcolor",
    "border",
    "cellpadding",
    "cellspacing",
    "color",
    "face",
];

/// Editor wrappers rewritten to `div`
const WRAPPER_ELEMENTS: &[&str] = &["section", "article"];

/// Return a cleaned copy of the tree
pub fn sanitize(node: &Node) -> Node {
    let mut clean = node.shallow_clone();

    if clean.is_element() {
        if WRAPPER_ELEMENTS.contains(&clean.name.as_str()) {
            clean.name = "div".to_string();
        }
        if matches!(clean.name.as_str(), "pre" | "code") {
            if let Some(language) = node.attr("class").and_then(language_from_class) {
                clean.set_attr("lang", &language);
            }
        }
        clean
            .attributes
            .retain(|name, _| !is_presentation_attribute(name));
    }

    for child in node.children() {
        if child.is_comment() || REMOVED_ELEMENTS.contains(&child.tag_name()) {
            continue;
        }
        clean.add_child(sanitize(child));
    }

    clean
}

fn is_presentation_attribute(name: &str) -> bool {
    PRESENTATION_ATTRIBUTES.contains(&name) || name.starts_with("on")
}

/// Language named by a `language-xxx` or `lang-xxx` class
fn language_from_class(class: &str) -> Option<String> {
    class
        .split_whitespace()
        .find_map(|c| c.strip_prefix("language-").or_else(|| c.strip_prefix("lang-")))
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}
