//! Unmarshal - normalized text to TemplateDocument
//!
//! Drives the quick-xml pull reader and builds the arena tree. The reader
//! checks tag matching, attribute syntax and duplicates; document structure
//! (single root, no stray text, expected root name, bound prefixes) is
//! checked here.

use super::HtmlBinding;
use crate::dom::{NodeId, TemplateDocument};
use crate::error::{EngineError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Namespace declarations made on one element
#[derive(Debug, Default)]
struct NamespaceScope {
    default: Option<String>,
    prefixes: Vec<(String, String)>,
}

/// Tree under construction plus the open element stack
#[derive(Default)]
struct TreeBuilder {
    doc: Option<TemplateDocument>,
    stack: Vec<NodeId>,
    scopes: Vec<NamespaceScope>,
}

impl TreeBuilder {
    fn start(&mut self, binding: &HtmlBinding, elem: &BytesStart<'_>, is_empty: bool) -> std::result::Result<(), String> {
        let name = String::from_utf8_lossy(elem.name().as_ref()).into_owned();

        let mut scope = NamespaceScope::default();
        let mut attributes = Vec::new();
        for attr in elem.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();

            if key == "xmlns" {
                scope.default = Some(value.clone());
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                scope.prefixes.push((prefix.to_string(), value.clone()));
            }
            attributes.push((key, value));
        }

        let namespace = self.resolve_namespace(&name, &scope)?;

        let id = match (self.doc.is_some(), self.stack.last().copied()) {
            (false, _) => {
                let local = name.rsplit(':').next().unwrap_or(&name);
                if local != binding.root_element() {
                    return Err(format!(
                        "Unexpected root element <{}>, expected <{}>",
                        name,
                        binding.root_element()
                    ));
                }
                if let Some(expected) = binding.namespace() {
                    if namespace != expected {
                        return Err(format!(
                            "Root element <{}> is in namespace {:?}, expected {:?}",
                            name, namespace, expected
                        ));
                    }
                }
                self.doc.insert(TemplateDocument::new(name)).root()
            }
            (true, None) => {
                return Err("Document has multiple root elements".to_string());
            }
            (true, Some(parent)) => {
                let doc = self.doc.as_mut().ok_or("no_document")?;
                let id = doc.create_element(name);
                doc.append_child(parent, id).map_err(str::to_string)?;
                id
            }
        };

        let doc = self.doc.as_mut().ok_or("no_document")?;
        doc.set_namespace(id, Some(namespace));
        for (key, value) in attributes {
            doc.set_attribute(id, &key, value);
        }

        if !is_empty {
            self.stack.push(id);
            self.scopes.push(scope);
        }
        Ok(())
    }

    /// Resolve the namespace of an element name against the open scopes
    fn resolve_namespace(&self, name: &str, own: &NamespaceScope) -> std::result::Result<String, String> {
        let scopes = std::iter::once(own).chain(self.scopes.iter().rev());

        match name.split_once(':') {
            Some(("xml", _)) => Ok("http://www.w3.org/XML/1998/namespace".to_string()),
            Some((prefix, _)) => {
                for scope in scopes {
                    if let Some((_, uri)) = scope.prefixes.iter().find(|(p, _)| p == prefix) {
                        return Ok(uri.clone());
                    }
                }
                Err(format!("Unbound namespace prefix: {}", prefix))
            }
            None => Ok(scopes
                .filter_map(|scope| scope.default.clone())
                .next()
                .unwrap_or_default()),
        }
    }

    fn end(&mut self) -> std::result::Result<(), String> {
        self.stack.pop().ok_or("Unexpected end tag at document level")?;
        self.scopes.pop();
        Ok(())
    }

    fn character_data(&mut self, content: String, kind: CharacterData) -> std::result::Result<(), String> {
        let Some(&parent) = self.stack.last() else {
            return match kind {
                CharacterData::Text if content.trim().is_empty() => Ok(()),
                CharacterData::Comment => Ok(()),
                CharacterData::Text => Err("Text content not allowed at document level".to_string()),
                CharacterData::CData => Err("CDATA section not allowed at document level".to_string()),
            };
        };
        let doc = self.doc.as_mut().ok_or("no_document")?;

        let id = match kind {
            CharacterData::Text => doc.create_text(content),
            CharacterData::CData => doc.create_cdata(content),
            CharacterData::Comment => doc.create_comment(content),
        };
        doc.append_child(parent, id).map_err(str::to_string)
    }

    fn finish(self) -> std::result::Result<TemplateDocument, String> {
        if let Some(&open) = self.stack.first() {
            let name = self
                .doc
                .as_ref()
                .and_then(|doc| doc.node_name(open))
                .unwrap_or("?")
                .to_string();
            return Err(format!("Unclosed tag: <{}>", name));
        }
        self.doc.ok_or_else(|| "Document has no root element".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharacterData {
    Text,
    CData,
    Comment,
}

/// Parse normalized template text into a document
///
/// # Errors
///
/// Returns `EngineError::Parse` with the reader position for any
/// well-formedness or structure violation.
pub fn unmarshal(binding: &HtmlBinding, text: &str) -> Result<TemplateDocument> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);
    let mut builder = TreeBuilder::default();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| EngineError::parse(e.to_string(), Some(reader.error_position() as u64)))?;
        let position = reader.buffer_position() as u64;
        let fail = |message: String| EngineError::parse(message, Some(position));

        match event {
            Event::Start(e) => builder.start(binding, &e, false).map_err(fail)?,
            Event::Empty(e) => builder.start(binding, &e, true).map_err(fail)?,
            Event::End(_) => builder.end().map_err(fail)?,
            Event::Text(e) => {
                let content = e.unescape().map_err(|e| fail(e.to_string()))?.into_owned();
                builder.character_data(content, CharacterData::Text).map_err(fail)?;
            }
            Event::CData(e) => {
                let content = String::from_utf8_lossy(&e).into_owned();
                builder.character_data(content, CharacterData::CData).map_err(fail)?;
            }
            Event::Comment(e) => {
                let content = String::from_utf8_lossy(&e).into_owned();
                builder.character_data(content, CharacterData::Comment).map_err(fail)?;
            }
            // Declarations and processing instructions carry nothing the tree keeps
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    builder
        .finish()
        .map_err(|message| EngineError::parse(message, Some(reader.buffer_position() as u64)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::dom::NodeKind;

    const XHTML: &str = "http://www.w3.org/1999/xhtml";

    fn binding() -> HtmlBinding {
        HtmlBinding::new(&EngineConfig::default()).unwrap()
    }

    fn parse(text: &str) -> Result<TemplateDocument> {
        unmarshal(&binding(), text)
    }

    #[test]
    fn test_simple_document() {
        let doc = parse("<html xmlns=\"http://www.w3.org/1999/xhtml\"><body><p id=\"a\">Hi</p></body></html>").unwrap();
        let root = doc.root();
        assert_eq!(doc.node_name(root), Some("html"));
        assert_eq!(doc.get_attribute(root, "xmlns"), Some(XHTML));

        let p = doc.first_element_by_name(root, "p").unwrap();
        assert_eq!(doc.get_attribute(p, "id"), Some("a"));
        assert_eq!(doc.text(p), "Hi");
        assert_eq!(doc.namespace_uri(p), Some(XHTML));
    }

    #[test]
    fn test_character_references_decoded() {
        let doc = parse("<html><p title=\"a &amp; b\">&#169; 2020 &lt;x&gt;</p></html>").unwrap();
        let p = doc.first_element_by_name(doc.root(), "p").unwrap();
        assert_eq!(doc.get_attribute(p, "title"), Some("a & b"));
        assert_eq!(doc.text(p), "\u{a9} 2020 <x>");
        assert_eq!(doc.children(p).count(), 1);
    }

    #[test]
    fn test_whitespace_kept_inside_root() {
        let doc = parse("<html>\n  <body/>\n</html>").unwrap();
        let kinds: Vec<_> = doc
            .children(doc.root())
            .map(|id| doc.get_node(id).unwrap().kind)
            .collect();
        assert_eq!(kinds, vec![NodeKind::Text, NodeKind::Element, NodeKind::Text]);
    }

    #[test]
    fn test_cdata_and_comments() {
        let doc = parse("<!-- header --><html><script><![CDATA[a < b]]></script><!-- note --></html>").unwrap();
        let script = doc.first_element_by_name(doc.root(), "script").unwrap();
        let cdata = doc.children(script).next().unwrap();
        assert_eq!(doc.get_node(cdata).unwrap().kind, NodeKind::CData);
        assert_eq!(doc.text_content(cdata), Some("a < b"));
        let comment = doc.children(doc.root()).last().unwrap();
        assert_eq!(doc.text_content(comment), Some(" note "));
    }

    #[test]
    fn test_prefixed_namespace() {
        let doc = parse("<html xmlns:svg=\"http://www.w3.org/2000/svg\"><svg:svg><svg:rect/></svg:svg></html>").unwrap();
        let rect = doc.first_element_by_name(doc.root(), "svg:rect").unwrap();
        assert_eq!(doc.namespace_uri(rect), Some("http://www.w3.org/2000/svg"));
        assert_eq!(doc.node_local_name(rect), Some("rect"));
    }

    #[test]
    fn test_unbound_prefix_rejected() {
        let err = parse("<html><svg:rect/></html>").unwrap_err();
        assert!(err.to_string().contains("Unbound namespace prefix: svg"));
    }

    #[test]
    fn test_unclosed_tag() {
        let err = parse("<html><body><p>text</body></html>").unwrap_err();
        assert!(err.is_parse());

        let err = parse("<html><body>").unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_unknown_named_entity_rejected() {
        assert!(parse("<html><p>&copy;</p></html>").unwrap_err().is_parse());
    }

    #[test]
    fn test_duplicate_attribute_rejected() {
        assert!(parse("<html><p a=\"1\" a=\"2\"/></html>").unwrap_err().is_parse());
    }

    #[test]
    fn test_structure_errors() {
        assert!(parse("").unwrap_err().to_string().contains("no root element"));
        assert!(parse("<html/><html/>").unwrap_err().to_string().contains("multiple root elements"));
        assert!(parse("text<html/>").unwrap_err().to_string().contains("Text content not allowed"));
        assert!(parse("<div/>").unwrap_err().to_string().contains("Unexpected root element <div>"));
    }

    #[test]
    fn test_required_namespace() {
        let binding = HtmlBinding::new(&EngineConfig::default().namespace(XHTML)).unwrap();
        assert!(unmarshal(&binding, "<html xmlns=\"http://www.w3.org/1999/xhtml\"/>").is_ok());
        let err = unmarshal(&binding, "<html/>").unwrap_err();
        assert!(err.to_string().contains("expected \"http://www.w3.org/1999/xhtml\""));
    }

    #[test]
    fn test_custom_root() {
        let binding = HtmlBinding::new(&EngineConfig::default().root_element("page")).unwrap();
        let doc = unmarshal(&binding, "<page><title>t</title></page>").unwrap();
        assert_eq!(doc.node_name(doc.root()), Some("page"));
    }
}
