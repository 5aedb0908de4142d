//! Template Node representation
//!
//! Uses NodeId (u32) for compact node references into the document arena.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Type of template node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Element node
    Element,
    /// Text content
    Text,
    /// CDATA section
    CData,
    /// Comment
    Comment,
}

/// A node in the document arena
#[derive(Debug, Clone)]
pub struct TemplateNode {
    /// Type of this node
    pub kind: NodeKind,
    /// Parent node (None for the root and for detached nodes)
    pub parent: Option<NodeId>,
    /// First child node
    pub first_child: Option<NodeId>,
    /// Last child node
    pub last_child: Option<NodeId>,
    /// Previous sibling
    pub prev_sibling: Option<NodeId>,
    /// Next sibling
    pub next_sibling: Option<NodeId>,
    /// Qualified element name; empty for character data
    pub(crate) name: String,
    /// Character data for text, CDATA and comment nodes
    pub(crate) content: String,
    /// Namespace resolved while unmarshaling; None means inherited
    pub(crate) namespace: Option<String>,
    /// Attributes in document order, namespace declarations included
    pub(crate) attributes: Vec<TemplateAttribute>,
}

impl TemplateNode {
    fn new(kind: NodeKind) -> Self {
        TemplateNode {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name: String::new(),
            content: String::new(),
            namespace: None,
            attributes: Vec::new(),
        }
    }

    /// Create a new element node
    pub fn element(name: impl Into<String>) -> Self {
        let mut node = Self::new(NodeKind::Element);
        node.name = name.into();
        node
    }

    /// Create a new text node
    pub fn text(content: impl Into<String>) -> Self {
        let mut node = Self::new(NodeKind::Text);
        node.content = content.into();
        node
    }

    /// Create a new CDATA node
    pub fn cdata(content: impl Into<String>) -> Self {
        let mut node = Self::new(NodeKind::CData);
        node.content = content.into();
        node
    }

    /// Create a new comment node
    pub fn comment(content: impl Into<String>) -> Self {
        let mut node = Self::new(NodeKind::Comment);
        node.content = content.into();
        node
    }

    /// Check if this is an element node
    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Check if this node has children
    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }

    /// Element name with any prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element name without prefix
    pub fn local_name(&self) -> &str {
        match self.name.find(':') {
            Some(pos) => &self.name[pos + 1..],
            None => &self.name,
        }
    }

    /// Namespace prefix of the element name, if any
    pub fn prefix(&self) -> Option<&str> {
        self.name.find(':').map(|pos| &self.name[..pos])
    }
}

/// Stored attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateAttribute {
    pub name: String,
    pub value: String,
}

impl TemplateAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        TemplateAttribute {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Check whether this attribute declares a namespace
    pub fn is_namespace_declaration(&self) -> bool {
        self.name == "xmlns" || self.name.starts_with("xmlns:")
    }
}
