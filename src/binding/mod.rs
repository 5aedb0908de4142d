//! Structural Binding
//!
//! The bridge between normalized template text and `TemplateDocument`:
//! - HtmlBinding: per-engine context built once from `EngineConfig`
//! - unmarshal: text -> tree, strict well-formedness
//! - marshal: tree -> raw text through `TagCustomizeWriter`

pub mod marshal;
pub mod unmarshal;

pub use marshal::{marshal, TagCustomizeWriter};
pub use unmarshal::unmarshal;

use crate::config::EngineConfig;
use std::collections::HashSet;

/// Validated element rules shared by unmarshal and marshal
#[derive(Debug, Clone)]
pub struct HtmlBinding {
    root_element: String,
    namespace: Option<String>,
    void_elements: HashSet<Vec<u8>>,
    indent: usize,
    strip_fragment_namespace: bool,
}

impl HtmlBinding {
    /// Build the binding context from configuration
    ///
    /// # Errors
    ///
    /// Returns a message naming the first element name that is not a
    /// valid XML name.
    pub fn new(config: &EngineConfig) -> Result<Self, String> {
        if !is_xml_name(&config.root_element) {
            return Err(format!("invalid root element name: {:?}", config.root_element));
        }

        let mut void_elements = HashSet::with_capacity(config.void_elements.len());
        for name in &config.void_elements {
            if !is_xml_name(name) {
                return Err(format!("invalid void element name: {:?}", name));
            }
            void_elements.insert(name.as_bytes().to_vec());
        }

        Ok(HtmlBinding {
            root_element: config.root_element.clone(),
            namespace: config.namespace.clone(),
            void_elements,
            indent: config.indent,
            strip_fragment_namespace: config.strip_fragment_namespace,
        })
    }

    /// Required local name of the root element
    pub fn root_element(&self) -> &str {
        &self.root_element
    }

    /// Namespace the root element must be bound to, if any
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Check whether an element local name may be self-closed
    #[inline]
    pub fn is_void(&self, local_name: &[u8]) -> bool {
        self.void_elements.contains(local_name)
    }

    /// Spaces per nesting level for the pretty printer
    pub fn indent(&self) -> usize {
        self.indent
    }

    pub fn strip_fragment_namespace(&self) -> bool {
        self.strip_fragment_namespace
    }
}

/// XML Name production, ASCII start characters plus anything non-ASCII
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let start_ok = first.is_ascii_alphabetic() || first == '_' || first == ':' || !first.is_ascii();
    start_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-' | '.') || !c.is_ascii())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_binding() {
        let binding = HtmlBinding::new(&EngineConfig::default()).unwrap();
        assert_eq!(binding.root_element(), "html");
        assert!(binding.is_void(b"img"));
        assert!(!binding.is_void(b"script"));
        assert_eq!(binding.indent(), 2);
    }

    #[test]
    fn test_invalid_root_rejected() {
        let err = HtmlBinding::new(&EngineConfig::default().root_element("1html")).unwrap_err();
        assert!(err.contains("invalid root element name"));
        assert!(HtmlBinding::new(&EngineConfig::default().root_element("")).is_err());
    }

    #[test]
    fn test_invalid_void_rejected() {
        let config = EngineConfig::default().void_elements(["br", "bad name"]);
        let err = HtmlBinding::new(&config).unwrap_err();
        assert!(err.contains("bad name"));
    }

    #[test]
    fn test_xml_names() {
        assert!(is_xml_name("svg:rect"));
        assert!(is_xml_name("_x-1.y"));
        assert!(is_xml_name("été"));
        assert!(!is_xml_name("-x"));
        assert!(!is_xml_name("a>b"));
    }
}
