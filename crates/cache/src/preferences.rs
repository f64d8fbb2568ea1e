//! Persisted user preferences and the last-visited-page flag index.

use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use crate::error::{ErrorKind, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct Stored {
    cache_assets: bool,
    remember_last_page: bool,
    /// Archive identifier to the document path its cache slot currently holds.
    last_pages: BTreeMap<String, String>,
}

impl Default for Stored {
    fn default() -> Self {
        Self { cache_assets: true, remember_last_page: true, last_pages: BTreeMap::new() }
    }
}

/// Long-lived flags consulted before every cache read or write.
///
/// Reads are synchronous and never touch the disk after loading. Every change
/// is written back immediately; a failed write is logged and the in-memory
/// value is kept, so the preference still applies for this session.
#[derive(Debug)]
pub struct Preferences {
    path: Option<PathBuf>,
    state: RwLock<Stored>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Preferences {
    /// Preferences that are never persisted.
    pub fn in_memory() -> Self {
        Self { path: None, state: RwLock::new(Stored::default()) }
    }

    /// Load preferences from a JSON file.
    ///
    /// A missing file yields the defaults (and is created on the first
    /// change). A file that exists but cannot be parsed is an error rather
    /// than silently reset.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let stored = match std::fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data).or_raise(|| ErrorKind::InvalidPreferences(path.clone()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Stored::default(),
            Err(e) => return Err(e).or_raise(|| ErrorKind::Io(path)),
        };
        debug!(path = %path.display(), "loaded preferences");
        Ok(Self { path: Some(path), state: RwLock::new(stored) })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read(&self) -> RwLockReadGuard<'_, Stored> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Stored> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` and persist the result if anything changed.
    fn update<T>(&self, change: impl FnOnce(&mut Stored) -> T) -> T {
        let mut state = self.write();
        let before = state.clone();
        let result = change(&mut state);
        if *state != before {
            self.persist(&state);
        }
        result
    }

    fn persist(&self, state: &Stored) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = Self::save(path, state) {
            warn!(path = %path.display(), error = ?e, "could not persist preferences");
        }
    }

    fn save(path: &Path, state: &Stored) -> Result<()> {
        let data = serde_json::to_vec_pretty(state).or_raise(|| ErrorKind::InvalidPreferences(path.to_path_buf()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Io(parent.to_path_buf()))?;
        }
        std::fs::write(path, data).or_raise(|| ErrorKind::Io(path.to_path_buf()))
    }

    /// Whether non-document assets may be cached.
    pub fn cache_assets(&self) -> bool {
        self.read().cache_assets
    }

    pub fn set_cache_assets(&self, enabled: bool) {
        self.update(|state| state.cache_assets = enabled);
    }

    /// Whether the last visited document of each archive is remembered.
    pub fn remember_last_page(&self) -> bool {
        self.read().remember_last_page
    }

    /// Flip the flag only; use
    /// [`CacheService::set_remember_last_page`](crate::CacheService::set_remember_last_page)
    /// to also drop remembered pages.
    pub fn set_remember_last_page(&self, enabled: bool) {
        self.update(|state| state.remember_last_page = enabled);
    }

    /// The document path remembered for `archive`.
    pub fn last_page(&self, archive: &str) -> Option<String> {
        self.read().last_pages.get(archive).cloned()
    }

    /// All remembered `(archive, path)` pairs.
    pub fn last_pages(&self) -> Vec<(String, String)> {
        self.read().last_pages.iter().map(|(a, p)| (a.clone(), p.clone())).collect()
    }

    pub fn set_last_page(&self, archive: &str, path: &str) {
        self.update(|state| state.last_pages.insert(archive.to_string(), path.to_string()));
    }

    /// Forget the remembered page of `archive`. Returns whether one existed.
    pub fn remove_last_page(&self, archive: &str) -> bool {
        self.update(|state| state.last_pages.remove(archive).is_some())
    }

    /// Forget every remembered page. Returns how many were forgotten.
    pub fn clear_last_pages(&self) -> usize {
        self.update(|state| {
            let removed = state.last_pages.len();
            state.last_pages.clear();
            removed
        })
    }
}
