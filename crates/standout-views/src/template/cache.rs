//! Compiled template cache keyed by ordered file lists.
//!
//! [`TemplateCache`] maps a [`TemplateKey`] to the template compiled from that
//! exact list of files. Entries are created lazily on the first request and
//! are never invalidated: there is no file watching and no expiry. Edits to a
//! template on disk are only picked up by a new process.
//!
//! # Keys
//!
//! The key is built from the relative names as the caller passed them, in the
//! caller's order, joined with a newline. `["a.html", "b.html"]` and
//! `["b.html", "a.html"]` are two separate entries.
//!
//! # Concurrency
//!
//! Lookups take a read lock on the slot map. Each key owns a slot wrapping a
//! [`OnceCell`]; concurrent first requests for one key all block on the same
//! cell, so the engine runs once and every caller gets the same handle.
//! Compilation happens outside the map lock, so a slow compile only holds up
//! requests for its own key. A failed compile leaves no entry behind and the
//! next request retries.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::OnceCell;

use super::engine::{CompiledTemplate, TemplateEngine, TemplateSource};
use crate::error::RenderError;
use crate::path::BasePath;

const KEY_DELIMITER: char = '\n';

/// The order-sensitive identity of a template file list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateKey(String);

impl TemplateKey {
    /// Builds a key from relative names.
    ///
    /// # Errors
    ///
    /// [`RenderError::NoFilesSpecified`] for an empty list and
    /// [`RenderError::InvalidTemplateName`] if a name contains the delimiter.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Result<Self, RenderError> {
        if names.is_empty() {
            return Err(RenderError::NoFilesSpecified);
        }
        let mut key = String::new();
        for (index, name) in names.iter().enumerate() {
            let name = name.as_ref();
            if name.contains(KEY_DELIMITER) {
                return Err(RenderError::InvalidTemplateName(name.to_string()));
            }
            if index > 0 {
                key.push(KEY_DELIMITER);
            }
            key.push_str(name);
        }
        Ok(Self(key))
    }

    /// The relative names making up this key, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.split(KEY_DELIMITER)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.names().collect();
        write!(f, "[{}]", names.join(", "))
    }
}

type Slot = Arc<OnceCell<Arc<dyn CompiledTemplate>>>;

/// Cache of compiled template sets.
pub struct TemplateCache {
    base: BasePath,
    engine: Box<dyn TemplateEngine>,
    slots: RwLock<HashMap<TemplateKey, Slot>>,
    compiles: AtomicUsize,
}

impl TemplateCache {
    pub fn new(base: BasePath, engine: Box<dyn TemplateEngine>) -> Self {
        Self {
            base,
            engine,
            slots: RwLock::new(HashMap::new()),
            compiles: AtomicUsize::new(0),
        }
    }

    pub fn base_path(&self) -> &BasePath {
        &self.base
    }

    /// Returns the compiled template for `names`, compiling it on first use.
    ///
    /// On a hit no file is touched. On a miss every name is resolved against
    /// the base path, read, and handed to the engine as one ordered set.
    ///
    /// # Errors
    ///
    /// - [`RenderError::NoFilesSpecified`] if `names` is empty
    /// - [`RenderError::TemplateNotFound`] if a file does not exist
    /// - [`RenderError::Parse`] if the engine rejects the set
    pub fn get_or_compile<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<Arc<dyn CompiledTemplate>, RenderError> {
        let key = TemplateKey::new(names)?;

        let slot = self.slot(&key);
        if let Some(compiled) = slot.get() {
            tracing::trace!(key = %key, "template cache hit");
            return Ok(Arc::clone(compiled));
        }

        let result = slot.get_or_try_init(|| self.compile(&key));
        match result {
            Ok(compiled) => {
                self.keep(&key, &slot);
                Ok(Arc::clone(compiled))
            }
            Err(err) => {
                self.discard_failed(&key, &slot);
                Err(err)
            }
        }
    }

    /// Whether a compiled entry exists for `names`.
    pub fn contains<S: AsRef<str>>(&self, names: &[S]) -> bool {
        let Ok(key) = TemplateKey::new(names) else {
            return false;
        };
        self.read_slots()
            .get(&key)
            .is_some_and(|slot| slot.get().is_some())
    }

    /// Number of compiled entries.
    pub fn len(&self) -> usize {
        self.read_slots()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful engine compiles since the cache was created.
    pub fn compile_count(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }

    fn slot(&self, key: &TemplateKey) -> Slot {
        if let Some(slot) = self.read_slots().get(key) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    // A waiter can finish the compile after the failed first attempt dropped
    // the slot from the map; put it back.
    fn keep(&self, key: &TemplateKey, slot: &Slot) {
        if self.read_slots().contains_key(key) {
            return;
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.entry(key.clone()).or_insert_with(|| Arc::clone(slot));
    }

    // Only drop the slot we failed on; another request may already have
    // replaced it with a fresh one.
    fn discard_failed(&self, key: &TemplateKey, slot: &Slot) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let stale = slots
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && current.get().is_none());
        if stale {
            slots.remove(key);
        }
    }

    fn read_slots(&self) -> std::sync::RwLockReadGuard<'_, HashMap<TemplateKey, Slot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn compile(&self, key: &TemplateKey) -> Result<Arc<dyn CompiledTemplate>, RenderError> {
        tracing::debug!(key = %key, base = %self.base, "compiling template set");

        let sources = key
            .names()
            .map(|name| self.read_source(name))
            .collect::<Result<Vec<_>, _>>()?;

        let compiled = self.engine.compile(&sources)?;
        self.compiles.fetch_add(1, Ordering::SeqCst);
        Ok(compiled)
    }

    fn read_source(&self, name: &str) -> Result<TemplateSource, RenderError> {
        let path = self.base.resolve(name);
        match fs::read_to_string(&path) {
            Ok(source) => Ok(TemplateSource::new(name, source)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(RenderError::TemplateNotFound {
                name: name.to_string(),
                path,
            }),
            Err(err) => Err(RenderError::Io(err)),
        }
    }
}

impl fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateCache")
            .field("base", &self.base)
            .field("entries", &self.len())
            .field("compiles", &self.compile_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::MiniJinjaEngine;
    use std::path::Path;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn cache_for(dir: &Path) -> TemplateCache {
        let base = BasePath::new(dir.to_str().unwrap()).unwrap();
        TemplateCache::new(base, Box::new(MiniJinjaEngine::new()))
    }

    #[test]
    fn test_key_preserves_order() {
        let ab = TemplateKey::new(&["a.html", "b.html"]).unwrap();
        let ba = TemplateKey::new(&["b.html", "a.html"]).unwrap();
        assert_ne!(ab, ba);
        assert_eq!(ab.as_str(), "a.html\nb.html");
        assert_eq!(ab.names().collect::<Vec<_>>(), vec!["a.html", "b.html"]);
        assert_eq!(ab.to_string(), "[a.html, b.html]");
    }

    #[test]
    fn test_key_rejects_empty_and_newlines() {
        let empty: [&str; 0] = [];
        assert!(matches!(TemplateKey::new(&empty), Err(RenderError::NoFilesSpecified)));
        assert!(matches!(
            TemplateKey::new(&["a\nb.html"]),
            Err(RenderError::InvalidTemplateName(_))
        ));
    }

    #[test]
    fn test_hit_does_not_recompile() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "page.txt", "hi");
        let cache = cache_for(dir.path());

        let first = cache.get_or_compile(&["page.txt"]).unwrap();
        let second = cache.get_or_compile(&["page.txt"]).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.compile_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_hit_does_no_io() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "page.txt", "v1");
        let cache = cache_for(dir.path());
        cache.get_or_compile(&["page.txt"]).unwrap();

        fs::remove_file(dir.path().join("page.txt")).unwrap();
        let compiled = cache.get_or_compile(&["page.txt"]).unwrap();
        let mut out = Vec::new();
        compiled.execute(&serde_json::json!({}), &mut out).unwrap();
        assert_eq!(out, b"v1");
    }

    #[test]
    fn test_order_creates_distinct_entries() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "{% block b %}a{% endblock %}");
        write(dir.path(), "b.txt", "{% block b %}b{% endblock %}");
        let cache = cache_for(dir.path());

        cache.get_or_compile(&["a.txt", "b.txt"]).unwrap();
        cache.get_or_compile(&["b.txt", "a.txt"]).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.compile_count(), 2);
        assert!(cache.contains(&["a.txt", "b.txt"]));
        assert!(cache.contains(&["b.txt", "a.txt"]));
    }

    #[test]
    fn test_missing_file_is_not_found_and_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_for(dir.path());

        let err = cache.get_or_compile(&["missing.html"]).err().unwrap();
        match err {
            RenderError::TemplateNotFound { name, path } => {
                assert_eq!(name, "missing.html");
                assert_eq!(path, dir.path().join("missing.html"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(cache.is_empty());
        assert!(!cache.contains(&["missing.html"]));
    }

    #[test]
    fn test_parse_error_not_cached_and_retried() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "page.txt", "{{ unclosed");
        let cache = cache_for(dir.path());

        assert!(matches!(cache.get_or_compile(&["page.txt"]), Err(RenderError::Parse(_))));
        assert!(cache.is_empty());
        assert_eq!(cache.compile_count(), 0);

        write(dir.path(), "page.txt", "fixed");
        cache.get_or_compile(&["page.txt"]).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.compile_count(), 1);
    }

    #[test]
    fn test_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_for(dir.path());
        let empty: Vec<String> = Vec::new();
        assert!(matches!(
            cache.get_or_compile(&empty),
            Err(RenderError::NoFilesSpecified)
        ));
    }
}
