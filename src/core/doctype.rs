//! DOCTYPE Removal
//!
//! Templates are parsed without DTD processing, so a leading
//! `<!DOCTYPE ...>` is dropped before the text reaches the reader.
//! An XML declaration in front of it is kept.

use memchr::memchr;
use std::borrow::Cow;

const DOCTYPE_OPEN: &str = "<!DOCTYPE";

/// Remove a leading DOCTYPE declaration
///
/// The declaration may be preceded by whitespace and an XML declaration.
/// Content after the declaration is trimmed on both sides. Text without a
/// leading DOCTYPE, or with one that has no closing `>`, is returned as is.
pub fn remove_doctype_declaration(input: &str) -> Cow<'_, str> {
    let (decl, rest) = split_xml_declaration(input.trim_start());
    let rest = rest.trim_start();

    let Some(after_open) = rest.strip_prefix(DOCTYPE_OPEN) else {
        return Cow::Borrowed(input);
    };
    if !after_open.starts_with(|c: char| c.is_ascii_whitespace()) {
        return Cow::Borrowed(input);
    }
    let Some(gt) = memchr(b'>', after_open.as_bytes()) else {
        return Cow::Borrowed(input);
    };

    let content = after_open[gt + 1..].trim();
    match decl {
        Some(decl) => Cow::Owned(format!("{}\n{}", decl, content)),
        None => Cow::Borrowed(content),
    }
}

/// Split `<?xml ...?>` off the front of the text, if present
fn split_xml_declaration(input: &str) -> (Option<&str>, &str) {
    let Some(after) = input.strip_prefix("<?xml") else {
        return (None, input);
    };
    if !after.starts_with(|c: char| c.is_ascii_whitespace() || c == '?') {
        return (None, input);
    }
    match after.find("?>") {
        Some(end) => {
            let split = "<?xml".len() + end + 2;
            (Some(&input[..split]), &input[split..])
        }
        None => (None, input),
    }
}
