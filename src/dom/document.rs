//! Template Document - arena-based mutable tree
//!
//! Nodes live in a Vec and reference each other by NodeId. Detached nodes
//! stay in the arena; they are simply unreachable from the root. Cloning a
//! document is a deep copy of the arena.

use super::node::{NodeId, NodeKind, TemplateAttribute, TemplateNode};
use super::RemoveEmptyCssClass;

const CLASS: &str = "class";

/// A parsed template, rooted at a single element
#[derive(Debug, Clone)]
pub struct TemplateDocument {
    /// Arena of nodes
    nodes: Vec<TemplateNode>,
    /// Root element node ID
    root: NodeId,
}

impl TemplateDocument {
    /// Create a document holding only a root element
    pub fn new(root_name: impl Into<String>) -> Self {
        TemplateDocument {
            nodes: vec![TemplateNode::element(root_name)],
            root: 0,
        }
    }

    /// Get root element ID
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Check whether the node is the document root
    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&TemplateNode> {
        self.nodes.get(id as usize)
    }

    fn get_node_mut(&mut self, id: NodeId) -> Option<&mut TemplateNode> {
        self.nodes.get_mut(id as usize)
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut TemplateNode> {
        self.get_node_mut(id).filter(|node| node.is_element())
    }

    /// Get node count (including detached nodes)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get element name
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        self.get_node(id)
            .filter(|node| node.is_element())
            .map(|node| node.name())
    }

    /// Get element name without prefix
    pub fn node_local_name(&self, id: NodeId) -> Option<&str> {
        self.get_node(id)
            .filter(|node| node.is_element())
            .map(|node| node.local_name())
    }

    /// Get character data of a text, CDATA or comment node
    pub fn text_content(&self, id: NodeId) -> Option<&str> {
        self.get_node(id)
            .filter(|node| !node.is_element())
            .map(|node| node.content.as_str())
    }

    /// Replace the character data of a text, CDATA or comment node
    pub fn set_text_content(&mut self, id: NodeId, content: impl Into<String>) -> bool {
        match self.get_node_mut(id).filter(|node| !node.is_element()) {
            Some(node) => {
                node.content = content.into();
                true
            }
            None => false,
        }
    }

    /// Concatenated text of all text and CDATA descendants
    pub fn text(&self, id: NodeId) -> String {
        let mut result = String::new();
        for node_id in std::iter::once(id).chain(self.descendants(id)) {
            if let Some(node) = self.get_node(node_id) {
                if matches!(node.kind, NodeKind::Text | NodeKind::CData) {
                    result.push_str(&node.content);
                }
            }
        }
        result
    }

    /// Namespace of an element, inherited from the nearest ancestor that has one
    pub fn namespace_uri(&self, id: NodeId) -> Option<&str> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.get_node(node_id)?;
            if let Some(ns) = node.namespace.as_deref() {
                return if ns.is_empty() { None } else { Some(ns) };
            }
            current = node.parent;
        }
        None
    }

    /// Namespace bound to `prefix` by the nearest `xmlns:prefix` on the node
    /// or its ancestors
    pub fn lookup_namespace_prefix(&self, id: NodeId, prefix: &str) -> Option<&str> {
        let declaration = format!("xmlns:{}", prefix);
        let mut current = Some(id);
        while let Some(node_id) = current {
            if let Some(uri) = self.get_attribute(node_id, &declaration) {
                return Some(uri);
            }
            current = self.get_node(node_id)?.parent;
        }
        None
    }

    pub(crate) fn set_namespace(&mut self, id: NodeId, namespace: Option<String>) {
        if let Some(node) = self.element_mut(id) {
            node.namespace = namespace;
        }
    }

    /// Get attributes for an element
    pub fn attributes(&self, id: NodeId) -> &[TemplateAttribute] {
        self.get_node(id)
            .map(|node| node.attributes.as_slice())
            .unwrap_or(&[])
    }

    /// Get attribute value by name
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Set an attribute, replacing any existing value in place
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> bool {
        let Some(node) = self.element_mut(id) else {
            return false;
        };
        let value = value.into();
        match node.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(attr) => attr.value = value,
            None => node.attributes.push(TemplateAttribute::new(name, value)),
        }
        true
    }

    /// Remove an attribute, returning its value
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let node = self.element_mut(id)?;
        let index = node.attributes.iter().position(|attr| attr.name == name)?;
        Some(node.attributes.remove(index).value)
    }

    /// CSS classes of an element, empty entries skipped
    pub fn css_classes(&self, id: NodeId) -> Vec<&str> {
        self.get_attribute(id, CLASS)
            .map(|value| value.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Replace the CSS class collection
    ///
    /// Entries are joined as given, so empty entries survive into the
    /// attribute until the tree is saved.
    pub fn set_css_classes<I, S>(&mut self, id: NodeId, classes: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = classes
            .into_iter()
            .map(|class| class.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(id, CLASS, joined)
    }

    /// Add a CSS class unless already present
    pub fn add_css_class(&mut self, id: NodeId, class: &str) -> bool {
        if self.css_classes(id).contains(&class) {
            return self.get_node(id).is_some_and(|node| node.is_element());
        }
        let value = match self.get_attribute(id, CLASS) {
            Some(existing) => format!("{} {}", existing, class),
            None => class.to_string(),
        };
        self.set_attribute(id, CLASS, value)
    }

    /// Remove every occurrence of a CSS class
    ///
    /// Removing the last class leaves an empty `class` attribute behind.
    pub fn remove_css_class(&mut self, id: NodeId, class: &str) -> bool {
        let Some(existing) = self.get_attribute(id, CLASS) else {
            return false;
        };
        if !existing.split(' ').any(|entry| entry == class) {
            return false;
        }
        let remaining = existing
            .split(' ')
            .map(|entry| if entry == class { "" } else { entry })
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(id, CLASS, remaining)
    }

    /// Add a detached node to the arena
    fn push_node(&mut self, node: TemplateNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.push_node(TemplateNode::element(name))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.push_node(TemplateNode::text(content))
    }

    /// Create a detached CDATA node
    pub fn create_cdata(&mut self, content: impl Into<String>) -> NodeId {
        self.push_node(TemplateNode::cdata(content))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, content: impl Into<String>) -> NodeId {
        self.push_node(TemplateNode::comment(content))
    }

    /// Append a node as the last child of an element
    ///
    /// # Errors
    ///
    /// Returns an error if either node is missing, the parent is not an
    /// element, the child is the root, or the child is an ancestor of
    /// the parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), &'static str> {
        if self.get_node(child).is_none() {
            return Err("no_such_node");
        }
        if !self.get_node(parent).is_some_and(|node| node.is_element()) {
            return Err("parent_not_element");
        }
        if child == self.root {
            return Err("cannot_move_root");
        }
        let mut ancestor = Some(parent);
        while let Some(id) = ancestor {
            if id == child {
                return Err("would_create_cycle");
            }
            ancestor = self.get_node(id).and_then(|node| node.parent);
        }

        self.detach(child);
        self.link_child(parent, child);
        Ok(())
    }

    /// Link a child node to its parent
    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        let last_child_opt = self.nodes[parent_id as usize].last_child;

        if let Some(last_child_id) = last_child_opt {
            self.nodes[child_id as usize].prev_sibling = Some(last_child_id);
            self.nodes[last_child_id as usize].next_sibling = Some(child_id);
        } else {
            self.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.nodes[parent_id as usize].last_child = Some(child_id);
        self.nodes[child_id as usize].parent = Some(parent_id);
    }

    /// Unlink a node (and its subtree) from its parent
    pub fn detach(&mut self, id: NodeId) {
        let Some(node) = self.get_node(id) else {
            return;
        };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);
        let Some(parent) = parent else {
            return;
        };

        match prev {
            Some(prev) => self.nodes[prev as usize].next_sibling = next,
            None => self.nodes[parent as usize].first_child = next,
        }
        match next {
            Some(next) => self.nodes[next as usize].prev_sibling = prev,
            None => self.nodes[parent as usize].last_child = prev,
        }

        let node = &mut self.nodes[id as usize];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    /// Iterate over children of a node
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        let first = self.get_node(id).and_then(|n| n.first_child);
        ChildIter { doc: self, next: first }
    }

    /// Iterate over all descendants of a node in document order
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut stack = Vec::new();
        if let Some(node) = self.get_node(id) {
            let mut child_id = node.last_child;
            while let Some(cid) = child_id {
                stack.push(cid);
                child_id = self.get_node(cid).and_then(|n| n.prev_sibling);
            }
        }
        DescendantIter { doc: self, stack }
    }

    /// First descendant element with the given name
    pub fn first_element_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(id)
            .find(|&node_id| self.node_name(node_id) == Some(name))
    }
}

impl RemoveEmptyCssClass for TemplateDocument {
    fn remove_empty_css_class(&mut self, id: NodeId) -> usize {
        let ids: Vec<NodeId> = std::iter::once(id).chain(self.descendants(id)).collect();
        let mut removed = 0;

        for node_id in ids {
            let Some(value) = self.get_attribute(node_id, CLASS) else {
                continue;
            };
            let compact = value.split_whitespace().collect::<Vec<_>>().join(" ");
            if compact.is_empty() {
                self.remove_attribute(node_id, CLASS);
                removed += 1;
            } else if compact != value {
                self.set_attribute(node_id, CLASS, compact);
            }
        }

        removed
    }
}

/// Iterator over child nodes
pub struct ChildIter<'a> {
    doc: &'a TemplateDocument,
    next: Option<NodeId>,
}

impl<'a> Iterator for ChildIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.get_node(current).and_then(|n| n.next_sibling);
        Some(current)
    }
}

/// Iterator over descendant nodes
pub struct DescendantIter<'a> {
    doc: &'a TemplateDocument,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for DescendantIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        if let Some(node) = self.doc.get_node(current) {
            let mut child_id = node.last_child;
            while let Some(id) = child_id {
                self.stack.push(id);
                child_id = self.doc.get_node(id).and_then(|n| n.prev_sibling);
            }
        }
        Some(current)
    }
}
