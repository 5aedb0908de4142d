//! NIF Surface
//!
//! One engine per loaded library, built in the `load` callback. Loaded
//! templates are returned as resources; every other call takes plain
//! terms.

use crate::cache::ContentKey;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::resource::{TemplateRef, TemplateResource};
use once_cell::sync::OnceCell;
use rustler::{Atom, Env, NifResult, ResourceArc, Term};

mod atoms {
    rustler::atoms! {
        ok,
    }
}

static ENGINE: OnceCell<Engine> = OnceCell::new();

fn engine() -> NifResult<&'static Engine> {
    ENGINE
        .get()
        .ok_or_else(|| rustler::Error::Term(Box::new("engine_not_initialized")))
}

fn to_term_error(err: EngineError) -> rustler::Error {
    rustler::Error::Term(Box::new(err.to_string()))
}

// ============================================================================
// Load
// ============================================================================

/// Load template text (returns {:ok, template} or {:error, reason})
#[rustler::nif]
fn load_template(text: &str) -> NifResult<(Atom, TemplateRef)> {
    let doc = engine()?.load_template(text).map_err(to_term_error)?;
    Ok((atoms::ok(), ResourceArc::new(TemplateResource::new(doc))))
}

/// Read and load a template file
#[rustler::nif(schedule = "DirtyIo")]
fn load_template_file(path: &str) -> NifResult<(Atom, TemplateRef)> {
    let doc = engine()?.load_template_file(path).map_err(to_term_error)?;
    Ok((atoms::ok(), ResourceArc::new(TemplateResource::new(doc))))
}

// ============================================================================
// Save
// ============================================================================

/// Save a template as indented markup (returns {:ok, text} or {:error, reason})
#[rustler::nif]
fn save_template(template: TemplateRef) -> NifResult<(Atom, String)> {
    let engine = engine()?;
    let saved = template
        .with_document(|doc| engine.save_to_string(doc))
        .map_err(|e| rustler::Error::Term(Box::new(e)))?;
    saved.map(|text| (atoms::ok(), text)).map_err(to_term_error)
}

// ============================================================================
// Cache
// ============================================================================

/// Hex SHA-1 cache key of template text
#[rustler::nif]
fn cache_key(text: &str) -> String {
    ContentKey::of(text).to_string()
}

#[rustler::nif]
fn remove_all_cache() -> Atom {
    if let Some(engine) = ENGINE.get() {
        engine.remove_all_cache();
    }
    atoms::ok()
}

#[rustler::nif]
fn cached_templates() -> usize {
    ENGINE.get().map_or(0, Engine::cached_templates)
}

// ============================================================================
// NIF Initialization
// ============================================================================

fn load(_env: Env, _info: Term) -> bool {
    match Engine::new() {
        Ok(engine) => {
            // A reload keeps the engine built by the first load
            let _ = ENGINE.set(engine);
            true
        }
        Err(_) => false,
    }
}

rustler::init!("Elixir.RustyTemplate.Native", load = load);
