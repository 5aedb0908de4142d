//! RustyTemplate - XHTML template loading and saving
//!
//! Pipelines:
//! Load: raw text -> content-addressed cache -> normalize -> unmarshal -> tree
//! Save: tree -> marshal (HTML output rules) -> pretty print -> text
//!
//! ```
//! use rustytemplate::Engine;
//!
//! let engine = Engine::new().unwrap();
//! let mut doc = engine.load_template("<html><body><p>&copy; 2020</p></body></html>").unwrap();
//! let body = doc.first_element_by_name(doc.root(), "body").unwrap();
//! assert_eq!(
//!     engine.save_node_to_string(&mut doc, body).unwrap(),
//!     "<body>\n  <p>\u{a9} 2020</p>\n</body>"
//! );
//! ```

pub mod binding;
pub mod cache;
pub mod config;
pub mod core;
pub mod dom;
pub mod engine;
pub mod error;
pub mod format;

#[cfg(feature = "nif")]
mod nif;
#[cfg(feature = "nif")]
mod resource;

pub use cache::{ContentKey, LruTemplateCache, MemoryCache, TemplateCache};
pub use config::EngineConfig;
pub use dom::{NodeId, RemoveEmptyCssClass, TemplateDocument};
pub use engine::Engine;
pub use error::{EngineError, Result};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;
