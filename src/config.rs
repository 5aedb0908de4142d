//! Engine Configuration
//!
//! Plain options struct with builder methods. Validation happens when the
//! engine builds its binding context, not here.

/// HTML elements that never have content and serialize as `<br/>`
pub const DEFAULT_VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Options controlling how templates are bound and serialized
///
/// # Examples
///
/// ```
/// use rustytemplate::{Engine, EngineConfig};
///
/// let engine = Engine::with_config(EngineConfig::default().indent(4)).unwrap();
/// assert_eq!(engine.config().indent, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Spaces per nesting level in saved output. Defaults to 2.
    pub indent: usize,
    /// Local name every loaded template's root element must have.
    /// Defaults to `html`.
    pub root_element: String,
    /// Namespace the root element must be bound to. `None` accepts any.
    pub namespace: Option<String>,
    /// Elements written in self-closing form when they have no content.
    /// Every other empty element gets an explicit end tag.
    pub void_elements: Vec<String>,
    /// Drop the `xmlns` declaration from the top element when saving
    /// anything other than the document root. Defaults to `true`.
    pub strip_fragment_namespace: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            indent: 2,
            root_element: "html".to_string(),
            namespace: None,
            void_elements: DEFAULT_VOID_ELEMENTS.iter().map(|s| s.to_string()).collect(),
            strip_fragment_namespace: true,
        }
    }
}

impl EngineConfig {
    /// Sets the number of spaces per nesting level.
    #[must_use]
    pub fn indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the required root element name.
    #[must_use]
    pub fn root_element(mut self, name: &str) -> Self {
        self.root_element = name.to_string();
        self
    }

    /// Requires loaded templates to declare the given root namespace.
    #[must_use]
    pub fn namespace(mut self, uri: &str) -> Self {
        self.namespace = Some(uri.to_string());
        self
    }

    /// Replaces the set of void elements.
    #[must_use]
    pub fn void_elements<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.void_elements = names.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables namespace stripping on saved fragments.
    #[must_use]
    pub fn strip_fragment_namespace(mut self, strip: bool) -> Self {
        self.strip_fragment_namespace = strip;
        self
    }
}
