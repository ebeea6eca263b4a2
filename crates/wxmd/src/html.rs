//! HTML parsing support.
//!
//! Parses an HTML string with `scraper` and converts the result into the
//! owned [`Node`] tree the rest of the pipeline works on.

use scraper::{ElementRef, Html, Node as ScraperNode};
use wxmd_core::strip_sentinels;

use crate::node::Node;
use crate::{Result, TranscodeError};

/// Default element nesting limit
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Parse an HTML fragment into a Node tree.
///
/// The returned node is a document fragment holding the parsed content.
/// Element nesting deeper than `max_depth` is refused.
///
/// # Example
///
/// ```rust
/// use wxmd::parse_html;
///
/// let node = parse_html("<h1>Hello <em>World</em></h1>", 512).unwrap();
/// assert_eq!(node.children[0].tag_name(), "h1");
/// ```
pub fn parse_html(html: &str, max_depth: usize) -> Result<Node> {
    let document = Html::parse_fragment(html);

    let mut fragment = Node::document_fragment();
    convert_children(document.root_element(), &mut fragment, 1, max_depth)?;

    tracing::debug!(
        input = html.len(),
        nodes = fragment.children.len(),
        "parsed html fragment"
    );
    Ok(fragment)
}

/// Convert a scraper ElementRef to our Node structure
fn scraper_to_node(element: ElementRef, depth: usize, max_depth: usize) -> Result<Node> {
    if depth > max_depth {
        return Err(TranscodeError::NestingTooDeep { limit: max_depth });
    }

    let value = element.value();
    let mut node = Node::element(value.name());
    for (name, attr) in value.attrs() {
        node.set_attr(name, &strip_sentinels(attr));
    }

    convert_children(element, &mut node, depth + 1, max_depth)?;
    Ok(node)
}

fn convert_children(
    element: ElementRef,
    parent: &mut Node,
    depth: usize,
    max_depth: usize,
) -> Result<()> {
    for child in element.children() {
        match child.value() {
            ScraperNode::Text(text) => {
                parent.add_child(Node::text(&strip_sentinels(&text.text)));
            }
            ScraperNode::Comment(comment) => {
                parent.add_child(Node::comment(&comment.comment));
            }
            ScraperNode::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    parent.add_child(scraper_to_node(child_element, depth, max_depth)?);
                }
            }
            _ => {}
        }
    }
    Ok(())
}
