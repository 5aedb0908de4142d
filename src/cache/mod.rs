//! Template Cache - content-addressed storage of parsed templates
//!
//! Keys are the SHA-1 digest of the raw template text, so two loads of the
//! same text share one parse and any byte difference (whitespace included)
//! yields a distinct entry. Entries are immutable `Arc`s; the engine hands
//! out deep clones.

mod bounded;
mod memory;

pub use bounded::LruTemplateCache;
pub use memory::MemoryCache;

use crate::dom::TemplateDocument;
use crate::error::Result;
use sha1::{Digest, Sha1};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// SHA-1 digest of raw template text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentKey([u8; 20]);

impl ContentKey {
    /// Key for the given template text, exactly as supplied
    pub fn of(text: &str) -> Self {
        let digest: [u8; 20] = Sha1::digest(text.as_bytes()).into();
        ContentKey(digest)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Storage plug-in for parsed templates
///
/// Implementations must be safe to share between threads. Once a key is
/// resident, `insert_if_absent` never replaces it.
pub trait TemplateCache: Send + Sync {
    fn get(&self, key: &ContentKey) -> Option<Arc<TemplateDocument>>;

    /// Insert unless the key is already present; returns the resident value
    fn insert_if_absent(&self, key: ContentKey, doc: Arc<TemplateDocument>) -> Arc<TemplateDocument>;

    /// Drop every entry
    fn remove_all(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Look up `raw` in the cache, running `loader` on a miss
///
/// With no cache every call runs the loader. A loader error is returned
/// as-is and nothing is stored.
pub fn get_or_load<F>(cache: Option<&dyn TemplateCache>, raw: &str, loader: F) -> Result<Arc<TemplateDocument>>
where
    F: FnOnce(&str) -> Result<TemplateDocument>,
{
    let Some(cache) = cache else {
        return loader(raw).map(Arc::new);
    };

    let key = ContentKey::of(raw);
    if let Some(doc) = cache.get(&key) {
        debug!(%key, "template cache hit");
        return Ok(doc);
    }

    debug!(%key, "template cache miss");
    let doc = Arc::new(loader(raw)?);
    let resident = cache.insert_if_absent(key, doc);
    debug!(%key, entries = cache.len(), "template cached");
    Ok(resident)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    fn loader(calls: &AtomicUsize) -> impl Fn(&str) -> Result<TemplateDocument> + '_ {
        move |_raw| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(TemplateDocument::new("html"))
        }
    }

    fn caches() -> Vec<Box<dyn TemplateCache>> {
        vec![
            Box::new(MemoryCache::new()),
            Box::new(LruTemplateCache::new(NonZeroUsize::new(8).unwrap())),
        ]
    }

    #[test]
    fn test_key_is_sha1_hex() {
        assert_eq!(ContentKey::of("").to_string(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(ContentKey::of("abc").to_string(), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(ContentKey::of("abc"), ContentKey::of("abc"));
    }

    #[test]
    fn test_whitespace_makes_distinct_keys() {
        assert_ne!(ContentKey::of("<html/>"), ContentKey::of("<html/> "));
    }

    #[test]
    fn test_hit_returns_same_arc() {
        for cache in caches() {
            let calls = AtomicUsize::new(0);
            let first = get_or_load(Some(cache.as_ref()), "<html/>", loader(&calls)).unwrap();
            let second = get_or_load(Some(cache.as_ref()), "<html/>", loader(&calls)).unwrap();
            assert!(Arc::ptr_eq(&first, &second));
            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert_eq!(cache.len(), 1);
        }
    }

    #[test]
    fn test_distinct_text_distinct_entries() {
        for cache in caches() {
            let calls = AtomicUsize::new(0);
            let a = get_or_load(Some(cache.as_ref()), "<html/>", loader(&calls)).unwrap();
            let b = get_or_load(Some(cache.as_ref()), "<html/>\n", loader(&calls)).unwrap();
            assert!(!Arc::ptr_eq(&a, &b));
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }
    }

    #[test]
    fn test_remove_all_forces_reload() {
        for cache in caches() {
            let calls = AtomicUsize::new(0);
            let first = get_or_load(Some(cache.as_ref()), "<html/>", loader(&calls)).unwrap();
            cache.remove_all();
            assert!(cache.is_empty());
            let second = get_or_load(Some(cache.as_ref()), "<html/>", loader(&calls)).unwrap();
            assert!(!Arc::ptr_eq(&first, &second));
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }
    }

    #[test]
    fn test_loader_error_not_cached() {
        for cache in caches() {
            let err = get_or_load(Some(cache.as_ref()), "<html>", |_| {
                Err(EngineError::parse("Unclosed tag: <html>", None))
            })
            .unwrap_err();
            assert!(err.is_parse());
            assert!(cache.is_empty());
        }
    }

    #[test]
    fn test_no_cache_always_loads() {
        let calls = AtomicUsize::new(0);
        let first = get_or_load(None, "<html/>", loader(&calls)).unwrap();
        let second = get_or_load(None, "<html/>", loader(&calls)).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_loads_share_resident_value() {
        const THREADS: usize = 8;
        let cache = MemoryCache::new();
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(THREADS);

        let results: Vec<Arc<TemplateDocument>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        get_or_load(Some(&cache), "<html><body/></html>", loader(&calls)).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(cache.len(), 1);
        assert!(calls.load(Ordering::SeqCst) >= 1);
        assert!(results.iter().all(|doc| Arc::ptr_eq(doc, &results[0])));
    }
}
