//! Template Engine
//!
//! Composes the two pipelines:
//! - load: raw text -> cache lookup -> normalize -> unmarshal -> tree
//! - save: tree -> marshal -> pretty print -> text
//!
//! The binding context is built once per engine. Cached trees are shared
//! behind an `Arc`; `load_template` hands every caller its own deep copy.

use crate::binding::{marshal, unmarshal, HtmlBinding};
use crate::cache::{get_or_load, ContentKey, MemoryCache, TemplateCache};
use crate::config::EngineConfig;
use crate::core::encoding::decode_template;
use crate::core::normalize;
use crate::dom::{NodeId, TemplateDocument};
use crate::error::{EngineError, Result};
use crate::format::pretty_print;
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Loads templates into trees and saves trees back to markup
pub struct Engine {
    config: EngineConfig,
    binding: OnceCell<HtmlBinding>,
    cache: Option<Arc<dyn TemplateCache>>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("initialized", &self.binding.get().is_some())
            .field("cached_templates", &self.cached_templates())
            .finish()
    }
}

impl Engine {
    /// Engine with default configuration and an unbounded memory cache
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Initialization` if the binding context cannot
    /// be built.
    pub fn new() -> Result<Self> {
        Self::with_config(EngineConfig::default())
    }

    /// Engine with the given configuration and an unbounded memory cache
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Initialization` if the configuration is
    /// rejected by the binding.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        let engine = Engine {
            config,
            binding: OnceCell::new(),
            cache: Some(Arc::new(MemoryCache::new())),
        };
        engine.init()?;
        Ok(engine)
    }

    /// Replace the cache
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn TemplateCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Disable caching; every load parses
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn set_cache(&mut self, cache: Option<Arc<dyn TemplateCache>>) {
        self.cache = cache;
    }

    pub fn cache(&self) -> Option<&Arc<dyn TemplateCache>> {
        self.cache.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build the binding context, at most once
    ///
    /// Safe to call from many threads; later calls return the same context.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Initialization` when the configuration is
    /// invalid.
    pub fn init(&self) -> Result<&HtmlBinding> {
        self.binding.get_or_try_init(|| {
            HtmlBinding::new(&self.config)
                .inspect(|binding| {
                    info!(
                        root = binding.root_element(),
                        indent = binding.indent(),
                        "template engine initialized"
                    )
                })
                .map_err(|message| {
                    error!(%message, "template engine initialization failed");
                    EngineError::Initialization(message)
                })
        })
    }

    /// Cache key of raw template text
    pub fn cache_key(&self, text: &str) -> ContentKey {
        ContentKey::of(text)
    }

    /// Drop every cached template
    pub fn remove_all_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.remove_all();
            debug!("template cache cleared");
        }
    }

    /// Number of resident cache entries (0 without a cache)
    pub fn cached_templates(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.len())
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Load template text into a tree the caller owns
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Parse` if the normalized text is not a
    /// well-formed template.
    pub fn load_template(&self, text: &str) -> Result<TemplateDocument> {
        self.load_shared(text).map(|doc| TemplateDocument::clone(&doc))
    }

    /// Load template text, returning the cached tree itself
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Parse` if the normalized text is not a
    /// well-formed template.
    pub fn load_shared(&self, text: &str) -> Result<Arc<TemplateDocument>> {
        let binding = self.init()?;
        get_or_load(self.cache.as_deref(), text, |raw| parse_template(binding, raw))
    }

    /// Load template text without touching the cache
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Parse` if the normalized text is not a
    /// well-formed template.
    pub fn load_template_uncached(&self, text: &str) -> Result<TemplateDocument> {
        parse_template(self.init()?, text)
    }

    /// Read and load a template file
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Io` or `EngineError::Encoding` if the file
    /// cannot be read as text, otherwise as `load_template`.
    pub fn load_template_file(&self, path: impl AsRef<Path>) -> Result<TemplateDocument> {
        let text = read_template_file(path.as_ref())?;
        self.load_template(&text)
    }

    /// Read and load a template file without touching the cache
    ///
    /// # Errors
    ///
    /// As `load_template_file`.
    pub fn load_template_file_uncached(&self, path: impl AsRef<Path>) -> Result<TemplateDocument> {
        let text = read_template_file(path.as_ref())?;
        self.load_template_uncached(&text)
    }

    /// Load many template files through the cache in parallel
    ///
    /// Returns one result per path, in input order.
    pub fn preload<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> Vec<Result<ContentKey>> {
        paths
            .par_iter()
            .map(|path| {
                let text = read_template_file(path.as_ref())?;
                self.load_shared(&text)?;
                Ok(ContentKey::of(&text))
            })
            .collect()
    }

    // ========================================================================
    // Save
    // ========================================================================

    /// Save a whole document as indented markup
    ///
    /// Empty `class` attributes are removed from the tree as a side effect.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Format` or `EngineError::PrettyPrint`.
    pub fn save_to_string(&self, doc: &mut TemplateDocument) -> Result<String> {
        let root = doc.root();
        self.save_node_to_string(doc, root)
    }

    /// Save one element and its subtree as indented markup
    ///
    /// Unless it is the root, the element's default namespace declaration
    /// is left out (see `EngineConfig::strip_fragment_namespace`).
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Format` or `EngineError::PrettyPrint`.
    pub fn save_node_to_string(&self, doc: &mut TemplateDocument, node: NodeId) -> Result<String> {
        let binding = self.init()?;
        let raw = marshal(binding, doc, node).inspect_err(|err| {
            warn!(node, error = %err, "template marshal failed");
        })?;
        pretty_print(&raw, binding.indent())
    }

    /// Save a whole document into a text sink
    ///
    /// # Errors
    ///
    /// As `save_to_string`; a failing sink is reported as `EngineError::Format`.
    pub fn save_to_writer<W: fmt::Write>(&self, doc: &mut TemplateDocument, out: &mut W) -> Result<()> {
        let root = doc.root();
        self.save_node_to_writer(doc, root, out)
    }

    /// Save one element and its subtree into a text sink
    ///
    /// # Errors
    ///
    /// As `save_node_to_string`; a failing sink is reported as
    /// `EngineError::Format`.
    pub fn save_node_to_writer<W: fmt::Write>(
        &self,
        doc: &mut TemplateDocument,
        node: NodeId,
        out: &mut W,
    ) -> Result<()> {
        let text = self.save_node_to_string(doc, node)?;
        out.write_str(&text)
            .map_err(|e| EngineError::Format(e.to_string()))
    }
}

fn parse_template(binding: &HtmlBinding, raw: &str) -> Result<TemplateDocument> {
    let normalized = normalize(raw);
    unmarshal(binding, &normalized).inspect_err(|err| {
        warn!(error = %err, "template parse failed");
    })
}

fn read_template_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| {
        warn!(path = %path.display(), error = %source, "cannot read template file");
        EngineError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;

    decode_template(bytes).map_err(|message| {
        warn!(path = %path.display(), %message, "cannot decode template file");
        EngineError::Encoding {
            path: path.to_path_buf(),
            message,
        }
    })
}
