//! Pretty Printer
//!
//! Re-reads marshaled markup and re-emits it indented through the quick-xml
//! indenting writer. Elements whose content holds character data are kept
//! inline so that text is never re-flowed.

use crate::error::{EngineError, Result};
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::error;

/// Indent raw markup, dropping any XML declaration
///
/// # Errors
///
/// Returns `EngineError::PrettyPrint` when the markup cannot be re-read.
pub fn pretty_print(raw: &str, indent: usize) -> Result<String> {
    reformat(raw, indent).map_err(|message| {
        error!(%message, "pretty print failed on marshaled output");
        EngineError::PrettyPrint(message)
    })
}

fn reformat(raw: &str, indent: usize) -> std::result::Result<String, String> {
    let events = read_events(raw)?;
    let inline = mark_inline(&events);
    let mut writer = Writer::new_with_indent(Vec::with_capacity(raw.len() * 2), b' ', indent);

    // One flag per open element: true when its content is written inline
    let mut open: Vec<bool> = Vec::with_capacity(32);
    let mut previous_was_start = false;

    for (index, event) in events.into_iter().enumerate() {
        let in_inline = open.last().copied().unwrap_or(false);
        let is_start = matches!(event, Event::Start(_));

        match &event {
            Event::Text(text) => {
                if !in_inline && is_layout(text) {
                    continue;
                }
            }
            Event::End(_) => {
                open.pop();
                // `<script></script>` stays on one line
                if in_inline || previous_was_start {
                    keep_on_line(&mut writer)?;
                }
            }
            _ => {
                if in_inline {
                    keep_on_line(&mut writer)?;
                }
                if is_start {
                    open.push(in_inline || inline[index]);
                }
            }
        }

        previous_was_start = is_start;
        writer.write_event(event).map_err(|e| e.to_string())?;
    }

    String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())
}

fn read_events(raw: &str) -> std::result::Result<Vec<Event<'_>>, String> {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(false);

    let mut events = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => return Ok(events),
            Ok(Event::Decl(_)) => {}
            Ok(event) => events.push(event),
            Err(e) => return Err(format!("{} at byte {}", e, reader.error_position())),
        }
    }
}

/// Elements whose whitespace is content
const PRESERVE_WHITESPACE: &[&[u8]] = &[b"pre", b"textarea", b"listing", b"plaintext"];

/// For each start event, whether the element directly holds character data
/// or preserves whitespace
fn mark_inline(events: &[Event<'_>]) -> Vec<bool> {
    let mut inline = vec![false; events.len()];
    let mut open: Vec<usize> = Vec::new();

    for (index, event) in events.iter().enumerate() {
        match event {
            Event::Start(start) => {
                if PRESERVE_WHITESPACE.contains(&start.local_name().as_ref()) {
                    inline[index] = true;
                }
                open.push(index);
            }
            Event::End(_) => {
                open.pop();
            }
            Event::Text(text) if is_layout(text) => {}
            Event::Text(_) | Event::CData(_) => {
                if let Some(&start) = open.last() {
                    inline[start] = true;
                }
            }
            _ => {}
        }
    }

    inline
}

/// Whitespace-only text spanning a line break
fn is_layout(text: &[u8]) -> bool {
    text.iter().all(u8::is_ascii_whitespace) && text.iter().any(|&b| b == b'\n' || b == b'\r')
}

/// An empty text event suppresses the writer's next line break
fn keep_on_line(writer: &mut Writer<Vec<u8>>) -> std::result::Result<(), String> {
    writer
        .write_event(Event::Text(BytesText::new("")))
        .map_err(|e| e.to_string())
}
