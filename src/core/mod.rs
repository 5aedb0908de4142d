//! Text-level primitives
//!
//! Everything that happens to template text before the structural reader
//! sees it:
//! - Entities: named reference table, rewriting, output escaping
//! - Doctype: leading DOCTYPE removal
//! - Normalize: the combined pre-parse pipeline
//! - Encoding: UTF-8/UTF-16 detection for template files

pub mod doctype;
pub mod encoding;
pub mod entities;
pub mod normalize;

pub use normalize::normalize;
