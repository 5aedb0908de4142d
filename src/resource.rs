//! ResourceArc Wrappers
//!
//! Loaded templates handed to the BEAM. Each resource owns its tree, so
//! saving (which scrubs empty classes) never touches the cache.

use crate::dom::TemplateDocument;
use rustler::ResourceArc;
use std::sync::Mutex;

/// Wrapper for TemplateDocument that can be stored in a ResourceArc
pub struct TemplateResource {
    pub doc: Mutex<TemplateDocument>,
}

impl TemplateResource {
    pub fn new(doc: TemplateDocument) -> Self {
        TemplateResource {
            doc: Mutex::new(doc),
        }
    }

    /// Run `f` with exclusive access to the tree
    ///
    /// # Errors
    ///
    /// Returns `"mutex_poisoned"` if the document mutex is poisoned.
    pub fn with_document<F, R>(&self, f: F) -> Result<R, &'static str>
    where
        F: FnOnce(&mut TemplateDocument) -> R,
    {
        let mut guard = self.doc.lock().map_err(|_| "mutex_poisoned")?;
        Ok(f(&mut guard))
    }
}

#[rustler::resource_impl]
impl rustler::Resource for TemplateResource {}

/// Type alias for the ResourceArc
pub type TemplateRef = ResourceArc<TemplateResource>;
