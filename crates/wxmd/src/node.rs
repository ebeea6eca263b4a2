//! Owned DOM node tree.
//!
//! The HTML parser produces this tree once; every later pass (sanitizer,
//! multimedia extractor, converter) reads it and, where it rewrites, builds a
//! new tree instead of mutating the one it was given.

use indexmap::IndexMap;

/// Node types matching DOM nodeType values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// Element node (nodeType = 1)
    Element = 1,
    /// Text node (nodeType = 3)
    Text = 3,
    /// Comment node (nodeType = 8)
    Comment = 8,
    /// Document fragment node (nodeType = 11)
    DocumentFragment = 11,
}

/// A DOM node.
///
/// Element names are lower-case; attribute names are lower-case and keep
/// their source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub node_type: NodeType,

    /// Tag name for elements, `#text`, `#comment` or `#document-fragment`
    pub name: String,

    /// Text content for text and comment nodes
    pub value: Option<String>,

    pub attributes: IndexMap<String, String>,

    pub children: Vec<Node>,
}

impl Node {
    /// Create a new element node
    pub fn element(tag_name: &str) -> Self {
        Self {
            node_type: NodeType::Element,
            name: tag_name.to_lowercase(),
            value: None,
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Create a new element node with attributes
    pub fn element_with_attrs(tag_name: &str, attrs: Vec<(&str, &str)>) -> Self {
        let mut node = Self::element(tag_name);
        for (name, value) in attrs {
            node.set_attr(name, value);
        }
        node
    }

    /// Create a new text node
    pub fn text(content: &str) -> Self {
        Self {
            node_type: NodeType::Text,
            name: "#text".to_string(),
            value: Some(content.to_string()),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Create a new comment node
    pub fn comment(content: &str) -> Self {
        Self {
            node_type: NodeType::Comment,
            name: "#comment".to_string(),
            value: Some(content.to_string()),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Create a document fragment node
    pub fn document_fragment() -> Self {
        Self {
            node_type: NodeType::DocumentFragment,
            name: "#document-fragment".to_string(),
            value: None,
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Copy of this node without its children
    pub fn shallow_clone(&self) -> Self {
        Self {
            node_type: self.node_type,
            name: self.name.clone(),
            value: self.value.clone(),
            attributes: self.attributes.clone(),
            children: Vec::new(),
        }
    }

    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    pub fn is_comment(&self) -> bool {
        self.node_type == NodeType::Comment
    }

    /// Tag name for elements, empty for every other node type
    pub fn tag_name(&self) -> &str {
        if self.is_element() {
            &self.name
        } else {
            ""
        }
    }

    /// Get an attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Get a trimmed, non-empty attribute value
    pub fn attr_non_empty(&self, name: &str) -> Option<&str> {
        self.attr(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(&name.to_lowercase())
    }

    /// Get all child nodes
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.children.iter()
    }

    /// Get only element children
    pub fn element_children(&self) -> impl Iterator<Item = &Node> {
        self.children().filter(|n| n.is_element())
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set_attr(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_lowercase(), value.to_string());
    }

    /// Get all text content from this node and descendants
    pub fn text_content(&self) -> String {
        match self.node_type {
            NodeType::Text => self.value.clone().unwrap_or_default(),
            NodeType::Comment => String::new(),
            _ => self.children().map(Node::text_content).collect(),
        }
    }

    /// Depth-first search for the first descendant element matching a predicate
    pub fn find_descendant<F>(&self, predicate: &F) -> Option<&Node>
    where
        F: Fn(&Node) -> bool,
    {
        for child in self.element_children() {
            if predicate(child) {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(predicate) {
                return Some(found);
            }
        }
        None
    }
}
