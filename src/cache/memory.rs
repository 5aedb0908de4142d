//! Unbounded in-memory cache

use super::{ContentKey, TemplateCache};
use crate::dom::TemplateDocument;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Unbounded cache; hits take a shared lock and never block each other
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<ContentKey, Arc<TemplateDocument>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemplateCache for MemoryCache {
    fn get(&self, key: &ContentKey) -> Option<Arc<TemplateDocument>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn insert_if_absent(&self, key: ContentKey, doc: Arc<TemplateDocument>) -> Arc<TemplateDocument> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(key).or_insert(doc))
    }

    fn remove_all(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_insert_wins() {
        let cache = MemoryCache::new();
        let key = ContentKey::of("<html/>");
        let first = Arc::new(TemplateDocument::new("html"));
        let second = Arc::new(TemplateDocument::new("html"));

        let resident = cache.insert_if_absent(key, Arc::clone(&first));
        assert!(Arc::ptr_eq(&resident, &first));
        let resident = cache.insert_if_absent(key, second);
        assert!(Arc::ptr_eq(&resident, &first));
        assert!(Arc::ptr_eq(&cache.get(&key).unwrap(), &first));
    }
}
