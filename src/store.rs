//! Template stores: where the compiler resolves template names.
//!
//! The compiler itself performs no I/O; it looks templates up through a
//! [`TemplateStore`], a synchronous name -> source mapping. Three stores
//! cover the common cases: the compiled-in builtins, an in-memory overlay
//! for callers and tests, and a directory of `.prog` files loaded eagerly.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::prog_templates;

/// Synchronous template lookup. Implementations must be pure: repeated
/// fetches of the same name return the same text.
pub trait TemplateStore {
    fn fetch(&self, name: &str) -> Option<&str>;
}

/// Serves only the compiled-in templates from [`prog_templates`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinStore;

impl TemplateStore for BuiltinStore {
    fn fetch(&self, name: &str) -> Option<&str> {
        prog_templates::builtin(name)
    }
}

/// In-memory store. Entries shadow the builtins when `with_builtins` is
/// used, so a caller can override a single subroutine without copying the
/// rest.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    templates: BTreeMap<String, String>,
    fall_back_to_builtins: bool,
}

impl MemStore {
    /// An empty store with no builtin fallback.
    pub fn empty() -> Self {
        Self::default()
    }

    /// An empty overlay that falls back to the compiled-in templates.
    pub fn with_builtins() -> Self {
        Self {
            templates: BTreeMap::new(),
            fall_back_to_builtins: true,
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.templates.insert(name.into(), text.into());
        self
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.templates.insert(name.into(), text.into());
        self
    }
}

impl TemplateStore for MemStore {
    fn fetch(&self, name: &str) -> Option<&str> {
        match self.templates.get(name) {
            Some(text) => Some(text.as_str()),
            None if self.fall_back_to_builtins => prog_templates::builtin(name),
            None => None,
        }
    }
}

/// Loads every `*.prog` file directly under `dir` at construction time, so
/// that later lookups stay synchronous and infallible. Names not present on
/// disk fall back to the builtins.
#[derive(Debug, Clone)]
pub struct DirStore {
    templates: BTreeMap<String, String>,
}

impl DirStore {
    pub fn load(dir: &Path) -> Result<Self> {
        let mut templates = BTreeMap::new();
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("failed to read template directory {}", dir.display()))?;
        for entry in entries {
            let path = entry
                .with_context(|| format!("failed to list {}", dir.display()))?
                .path();
            let is_prog = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("prog"));
            if !is_prog || !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read template {}", path.display()))?;
            templates.insert(name.to_string(), text);
        }
        Ok(Self { templates })
    }
}

impl TemplateStore for DirStore {
    fn fetch(&self, name: &str) -> Option<&str> {
        self.templates
            .get(name)
            .map(String::as_str)
            .or_else(|| prog_templates::builtin(name))
    }
}
