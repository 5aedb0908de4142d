//! Bounded cache with least-recently-used eviction

use super::{ContentKey, TemplateCache};
use crate::dom::TemplateDocument;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

/// Cache holding at most `capacity` templates
///
/// A hit refreshes the entry, so every access takes the lock exclusively.
pub struct LruTemplateCache {
    entries: Mutex<LruCache<ContentKey, Arc<TemplateDocument>>>,
}

impl LruTemplateCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        LruTemplateCache {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// `None` when `capacity` is zero
    pub fn with_capacity(capacity: usize) -> Option<Self> {
        NonZeroUsize::new(capacity).map(Self::new)
    }

    pub fn capacity(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cap()
            .get()
    }
}

impl TemplateCache for LruTemplateCache {
    fn get(&self, key: &ContentKey) -> Option<Arc<TemplateDocument>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn insert_if_absent(&self, key: ContentKey, doc: Arc<TemplateDocument>) -> Arc<TemplateDocument> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(resident) = entries.get(&key) {
            return Arc::clone(resident);
        }
        entries.put(key, Arc::clone(&doc));
        doc
    }

    fn remove_all(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
