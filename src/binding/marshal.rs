//! Marshal - TemplateDocument to raw markup
//!
//! Iterative serialization of a subtree into quick-xml events. Events pass
//! through `TagCustomizeWriter`, which applies the HTML presentation rules
//! the plain XML writer knows nothing about.

use super::HtmlBinding;
use crate::core::entities::{escape_attribute, escape_text};
use crate::dom::{NodeId, NodeKind, RemoveEmptyCssClass, TemplateDocument};
use crate::error::{EngineError, Result};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::Write;

const XMLNS: &str = "xmlns";

/// Event writer applying HTML output rules
///
/// - Self-closing events for non-void elements become an explicit
///   start/end pair (`<script></script>`)
/// - With `strip_namespace`, the `xmlns` declaration is dropped from the
///   first top-level element
pub struct TagCustomizeWriter<'b, W: Write> {
    inner: Writer<W>,
    binding: &'b HtmlBinding,
    strip_namespace: bool,
    depth: usize,
}

impl<'b, W: Write> TagCustomizeWriter<'b, W> {
    pub fn new(inner: W, binding: &'b HtmlBinding, strip_namespace: bool) -> Self {
        TagCustomizeWriter {
            inner: Writer::new(inner),
            binding,
            strip_namespace,
            depth: 0,
        }
    }

    /// Write one event, applying the output rules
    pub fn write_event(&mut self, event: Event<'_>) -> Result<()> {
        match event {
            Event::Start(start) => {
                let start = self.customize(start)?;
                self.depth += 1;
                self.write(Event::Start(start))
            }
            Event::Empty(start) => {
                let start = self.customize(start)?;
                if self.binding.is_void(start.local_name().as_ref()) {
                    self.write(Event::Empty(start))
                } else {
                    let end = BytesEnd::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
                    self.write(Event::Start(start))?;
                    self.write(Event::End(end))
                }
            }
            Event::End(end) => {
                self.depth = self.depth.saturating_sub(1);
                self.write(Event::End(end))
            }
            other => self.write(other),
        }
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }

    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.inner
            .write_event(event)
            .map_err(|e| EngineError::Format(e.to_string()))
    }

    /// Drop the default namespace declaration from a top-level start tag
    fn customize<'a>(&self, start: BytesStart<'a>) -> Result<BytesStart<'a>> {
        if self.depth > 0 || !self.strip_namespace {
            return Ok(start);
        }

        let mut stripped = BytesStart::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
        for attr in start.attributes() {
            let attr = attr.map_err(|e| EngineError::Format(e.to_string()))?;
            if attr.key.as_ref() != XMLNS.as_bytes() {
                stripped.push_attribute(attr);
            }
        }
        Ok(stripped)
    }
}

/// Attribute with an already escaped value
fn escaped_attribute<'a>(name: &'a str, value: &'a str) -> Attribute<'a> {
    let value = match escape_attribute(value) {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    };
    Attribute {
        key: QName(name.as_bytes()),
        value,
    }
}

/// `xmlns:prefix` declarations the subtree at `top` needs from its ancestors
///
/// Covers prefixes of element and attribute names that are not declared
/// between the using element and `top`. Empty for the document root.
fn inherited_prefix_declarations(doc: &TemplateDocument, top: NodeId) -> Vec<(String, String)> {
    let mut declarations: Vec<(String, String)> = Vec::new();
    let Some(outside) = doc.get_node(top).and_then(|n| n.parent) else {
        return declarations;
    };

    for id in std::iter::once(top).chain(doc.descendants(top)) {
        let Some(element) = doc.get_node(id).filter(|n| n.is_element()) else {
            continue;
        };
        let attribute_prefixes = doc
            .attributes(id)
            .iter()
            .filter(|attr| !attr.is_namespace_declaration())
            .filter_map(|attr| attr.name.split_once(':').map(|(prefix, _)| prefix));

        for prefix in element.prefix().into_iter().chain(attribute_prefixes) {
            let declaration = format!("{}:{}", XMLNS, prefix);
            if prefix == "xml"
                || declarations.iter().any(|(name, _)| *name == declaration)
                || declared_within(doc, id, top, &declaration)
            {
                continue;
            }
            if let Some(uri) = doc.lookup_namespace_prefix(outside, prefix) {
                declarations.push((declaration, uri.to_string()));
            }
        }
    }

    declarations
}

/// Check whether `declaration` appears on `from` or an ancestor up to `top`
fn declared_within(doc: &TemplateDocument, from: NodeId, top: NodeId, declaration: &str) -> bool {
    let mut current = Some(from);
    while let Some(id) = current {
        if doc.get_attribute(id, declaration).is_some() {
            return true;
        }
        if id == top {
            return false;
        }
        current = doc.get_node(id).and_then(|n| n.parent);
    }
    false
}

/// Marshal an element and its subtree to unformatted markup
///
/// Empty `class` attributes in the subtree are scrubbed first. When `node`
/// is not the document root and the binding strips fragment namespaces,
/// the top element's `xmlns` declaration is left out. Prefixes the subtree
/// borrows from its ancestors are declared on the top element.
///
/// # Errors
///
/// Returns `EngineError::Format` if `node` is not an element, a comment
/// cannot be written as XML, or the writer fails.
pub fn marshal(binding: &HtmlBinding, doc: &mut TemplateDocument, node: NodeId) -> Result<String> {
    if !doc.get_node(node).is_some_and(|n| n.is_element()) {
        return Err(EngineError::Format(format!("node {} is not an element", node)));
    }

    doc.remove_empty_css_class(node);
    let doc: &TemplateDocument = doc;

    let strip_namespace = binding.strip_fragment_namespace() && !doc.is_root(node);
    let inherited = inherited_prefix_declarations(doc, node);
    let mut writer = TagCustomizeWriter::new(Vec::new(), binding, strip_namespace);

    // Stack entries: Either entering a node or need to write closing tag
    enum Step {
        Enter(NodeId),
        Close(NodeId),
    }

    let mut stack: Vec<Step> = Vec::with_capacity(64);
    stack.push(Step::Enter(node));

    while let Some(step) = stack.pop() {
        match step {
            Step::Close(id) => {
                let name = doc.node_name(id).unwrap_or("");
                writer.write_event(Event::End(BytesEnd::new(name)))?;
            }
            Step::Enter(current_id) => {
                let Some(current) = doc.get_node(current_id) else {
                    continue;
                };

                match current.kind {
                    NodeKind::Element => {
                        let mut start = BytesStart::new(current.name());

                        // The top element declares the namespace it inherits
                        if current_id == node
                            && current.prefix().is_none()
                            && doc.get_attribute(current_id, XMLNS).is_none()
                        {
                            if let Some(ns) = doc.namespace_uri(current_id) {
                                start.push_attribute(escaped_attribute(XMLNS, ns));
                            }
                        }
                        if current_id == node {
                            for (prefix, uri) in &inherited {
                                start.push_attribute(escaped_attribute(prefix, uri));
                            }
                        }
                        for attr in doc.attributes(current_id) {
                            start.push_attribute(escaped_attribute(&attr.name, &attr.value));
                        }

                        if current.first_child.is_none() {
                            writer.write_event(Event::Empty(start))?;
                        } else {
                            writer.write_event(Event::Start(start))?;
                            stack.push(Step::Close(current_id));

                            let mut child_id = current.last_child;
                            while let Some(cid) = child_id {
                                stack.push(Step::Enter(cid));
                                child_id = doc.get_node(cid).and_then(|n| n.prev_sibling);
                            }
                        }
                    }
                    NodeKind::Text => {
                        let text = BytesText::from_escaped(escape_text(&current.content));
                        writer.write_event(Event::Text(text))?;
                    }
                    NodeKind::CData => {
                        // `]]>` cannot appear inside a section; split around it
                        let mut rest = current.content.as_str();
                        while let Some(end) = rest.find("]]>") {
                            writer.write_event(Event::CData(BytesCData::new(&rest[..end + 2])))?;
                            rest = &rest[end + 2..];
                        }
                        writer.write_event(Event::CData(BytesCData::new(rest)))?;
                    }
                    NodeKind::Comment => {
                        if current.content.contains("--") || current.content.ends_with('-') {
                            return Err(EngineError::Format(format!(
                                "comment {:?} cannot be written: contains \"--\" or ends with \"-\"",
                                current.content
                            )));
                        }
                        let comment = BytesText::from_escaped(current.content.as_str());
                        writer.write_event(Event::Comment(comment))?;
                    }
                }
            }
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| EngineError::Format(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::unmarshal;
    use crate::config::EngineConfig;

    const PAGE: &str = "<html xmlns=\"http://www.w3.org/1999/xhtml\"><body class=\"\"><div id=\"x\"/><br/></body></html>";

    fn binding() -> HtmlBinding {
        HtmlBinding::new(&EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_root_keeps_namespace() {
        let binding = binding();
        let mut doc = unmarshal(&binding, PAGE).unwrap();
        let root = doc.root();
        let raw = marshal(&binding, &mut doc, root).unwrap();
        assert_eq!(
            raw,
            "<html xmlns=\"http://www.w3.org/1999/xhtml\"><body><div id=\"x\"></div><br/></body></html>"
        );
    }

    #[test]
    fn test_fragment_namespace_stripped() {
        let binding = binding();
        let mut doc = unmarshal(&binding, PAGE).unwrap();
        let body = doc.first_element_by_name(doc.root(), "body").unwrap();
        let raw = marshal(&binding, &mut doc, body).unwrap();
        assert_eq!(raw, "<body><div id=\"x\"></div><br/></body>");
    }

    #[test]
    fn test_fragment_namespace_kept_when_disabled() {
        let binding = HtmlBinding::new(&EngineConfig::default().strip_fragment_namespace(false)).unwrap();
        let mut doc = unmarshal(&binding, PAGE).unwrap();
        let div = doc.first_element_by_name(doc.root(), "div").unwrap();
        let raw = marshal(&binding, &mut doc, div).unwrap();
        assert_eq!(raw, "<div xmlns=\"http://www.w3.org/1999/xhtml\" id=\"x\"></div>");
    }

    #[test]
    fn test_own_namespace_declaration_stripped_on_fragment() {
        let binding = binding();
        let mut doc = unmarshal(&binding, "<html><p xmlns=\"urn:x\">a</p></html>").unwrap();
        let p = doc.first_element_by_name(doc.root(), "p").unwrap();
        assert_eq!(marshal(&binding, &mut doc, p).unwrap(), "<p>a</p>");
    }

    #[test]
    fn test_prefixed_top_element_not_injected() {
        let binding = HtmlBinding::new(&EngineConfig::default().strip_fragment_namespace(false)).unwrap();
        let mut doc = unmarshal(
            &binding,
            "<html xmlns:svg=\"http://www.w3.org/2000/svg\"><svg:svg><svg:rect/></svg:svg></html>",
        )
        .unwrap();
        let svg = doc.first_element_by_name(doc.root(), "svg:svg").unwrap();
        assert_eq!(marshal(&binding, &mut doc, svg).unwrap(), "<svg:svg><svg:rect></svg:rect></svg:svg>");
    }

    #[test]
    fn test_escaping() {
        let binding = binding();
        let mut doc = TemplateDocument::new("html");
        let root = doc.root();
        doc.set_attribute(root, "title", "say \"hi\" & <go>");
        let text = doc.create_text("a < b & c > d");
        doc.append_child(root, text).unwrap();
        let cdata = doc.create_cdata("if (a < b) {}");
        doc.append_child(root, cdata).unwrap();
        let comment = doc.create_comment(" keep ");
        doc.append_child(root, comment).unwrap();

        let raw = marshal(&binding, &mut doc, root).unwrap();
        assert_eq!(
            raw,
            "<html title=\"say &quot;hi&quot; &amp; &lt;go&gt;\">a &lt; b &amp; c &gt; d<![CDATA[if (a < b) {}]]><!-- keep --></html>"
        );
    }

    #[test]
    fn test_empty_class_scrubbed_in_subtree() {
        let binding = binding();
        let mut doc = unmarshal(&binding, "<html><div class=\" \"><p class=\"a  b\"/></div></html>").unwrap();
        let div = doc.first_element_by_name(doc.root(), "div").unwrap();
        let raw = marshal(&binding, &mut doc, div).unwrap();
        assert_eq!(raw, "<div><p class=\"a b\"></p></div>");
        assert_eq!(doc.get_attribute(div, "class"), None);
    }

    #[test]
    fn test_fragment_declares_inherited_prefixes() {
        let binding = binding();
        let mut doc = unmarshal(
            &binding,
            "<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:svg=\"http://www.w3.org/2000/svg\" \
             xmlns:xlink=\"http://www.w3.org/1999/xlink\" xmlns:unused=\"urn:unused\">\
             <body><svg:svg><svg:use xlink:href=\"#a\"/></svg:svg></body></html>",
        )
        .unwrap();
        let body = doc.first_element_by_name(doc.root(), "body").unwrap();
        let raw = marshal(&binding, &mut doc, body).unwrap();
        assert_eq!(
            raw,
            "<body xmlns:svg=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">\
             <svg:svg><svg:use xlink:href=\"#a\"></svg:use></svg:svg></body>"
        );

        // The saved fragment loads again on its own
        let fragment_binding = HtmlBinding::new(&EngineConfig::default().root_element("body")).unwrap();
        let reloaded = unmarshal(&fragment_binding, &raw).unwrap();
        let used = reloaded.first_element_by_name(reloaded.root(), "svg:use").unwrap();
        assert_eq!(reloaded.namespace_uri(used), Some("http://www.w3.org/2000/svg"));
    }

    #[test]
    fn test_prefix_declared_inside_fragment_not_repeated() {
        let binding = binding();
        let mut doc = unmarshal(
            &binding,
            "<html xmlns:svg=\"urn:outer\"><body><svg:svg xmlns:svg=\"urn:inner\"/></body></html>",
        )
        .unwrap();
        let body = doc.first_element_by_name(doc.root(), "body").unwrap();
        assert_eq!(
            marshal(&binding, &mut doc, body).unwrap(),
            "<body><svg:svg xmlns:svg=\"urn:inner\"></svg:svg></body>"
        );
    }

    #[test]
    fn test_cdata_end_marker_split() {
        let binding = binding();
        let mut doc = TemplateDocument::new("html");
        let root = doc.root();
        let cdata = doc.create_cdata("a]]>b");
        doc.append_child(root, cdata).unwrap();

        let raw = marshal(&binding, &mut doc, root).unwrap();
        assert_eq!(raw, "<html><![CDATA[a]]]]><![CDATA[>b]]></html>");
        let reloaded = unmarshal(&binding, &raw).unwrap();
        assert_eq!(reloaded.text(reloaded.root()), "a]]>b");
    }

    #[test]
    fn test_unwritable_comment_rejected() {
        let binding = binding();
        for content in ["a -- b", "trailing-"] {
            let mut doc = TemplateDocument::new("html");
            let root = doc.root();
            let comment = doc.create_comment(content);
            doc.append_child(root, comment).unwrap();
            assert!(matches!(marshal(&binding, &mut doc, root), Err(EngineError::Format(_))));
        }
    }

    #[test]
    fn test_text_node_rejected() {
        let binding = binding();
        let mut doc = TemplateDocument::new("html");
        let text = doc.create_text("x");
        assert!(matches!(marshal(&binding, &mut doc, text), Err(EngineError::Format(_))));
    }

    #[test]
    fn test_customize_writer_expands_non_void() {
        let binding = binding();
        let mut writer = TagCustomizeWriter::new(Vec::new(), &binding, true);
        let mut top = BytesStart::new("section");
        top.push_attribute(("xmlns", "urn:x"));
        top.push_attribute(("id", "s"));
        writer.write_event(Event::Start(top)).unwrap();
        let mut inner = BytesStart::new("p");
        inner.push_attribute(("xmlns", "urn:y"));
        writer.write_event(Event::Empty(inner)).unwrap();
        writer.write_event(Event::Empty(BytesStart::new("img"))).unwrap();
        writer.write_event(Event::End(BytesEnd::new("section"))).unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(out, "<section id=\"s\"><p xmlns=\"urn:y\"></p><img/></section>");
    }
}
