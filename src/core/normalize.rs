//! Template Text Normalization
//!
//! Makes author-supplied markup acceptable to the strict structural reader:
//! DOCTYPE removal first, then named reference rewriting. Both steps are
//! pure and never fail.

use super::doctype::remove_doctype_declaration;
use super::entities::replace_named_entities;
use std::borrow::Cow;

/// Normalize template text before unmarshaling
pub fn normalize(input: &str) -> Cow<'_, str> {
    match remove_doctype_declaration(input) {
        Cow::Borrowed(stripped) => replace_named_entities(stripped),
        Cow::Owned(stripped) => {
            if let Cow::Owned(rewritten) = replace_named_entities(&stripped) {
                return Cow::Owned(rewritten);
            }
            Cow::Owned(stripped)
        }
    }
}
