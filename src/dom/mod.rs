//! DOM Module - Arena-based template tree
//!
//! The in-memory form of a loaded template:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for traversal
//! - Owned strings so the tree can be mutated and cloned freely

pub mod document;
pub mod node;

pub use document::{ChildIter, DescendantIter, TemplateDocument};
pub use node::{NodeId, NodeKind, TemplateAttribute, TemplateNode};

/// Capability invoked on a tree right before it is marshaled
///
/// Tree mutation tends to leave `class` attributes that are empty or hold
/// only separators. They carry no meaning in the output markup.
pub trait RemoveEmptyCssClass {
    /// Scrub the `class` attribute of `node` and every element below it.
    /// Returns the number of attributes removed outright.
    fn remove_empty_css_class(&mut self, node: NodeId) -> usize;
}
