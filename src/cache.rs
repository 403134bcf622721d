// src/cache.rs

//! In-memory cache of compiled output keyed by file identity.
//!
//! Each entry remembers the content hash it was compiled from. A lookup
//! recomputes the hash of the current content and only an exact match is a
//! hit; anything else recompiles and replaces the entry wholesale. Failed
//! compiles leave the cache untouched, so the next attempt compiles again.
//!
//! Calls for the same file identity are single-flight: a per-file async lock
//! is held across hash check, compile and store, so two streams racing on
//! one path compile once and the second one is served from the cache.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::compiler::{CompileFailure, CompiledSource};
use crate::hash::{content_hash, ContentHash};

/// Last successful compile for one file identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub content_hash: ContentHash,
    pub compiled: String,
}

/// Whether `get_or_compile` served a stored entry or ran the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Compiled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOutput {
    pub compiled: String,
    pub status: CacheStatus,
}

#[derive(Debug, Default)]
pub struct CompilationCache {
    entries: Mutex<HashMap<PathBuf, CacheEntry>>,
    /// Per-file locks providing single-flight compiles.
    inflight: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl CompilationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the compiled output for `file` with `content`, invoking
    /// `compile` only when no entry exists or its hash differs.
    ///
    /// For a fixed `file` and unchanged content, `compile` runs at most once
    /// until the content changes or the cache is cleared.
    pub async fn get_or_compile<F, Fut>(
        &self,
        file: &Path,
        content: &str,
        compile: F,
    ) -> Result<CacheOutput, CompileFailure>
    where
        F: FnOnce(PathBuf, String) -> Fut,
        Fut: Future<Output = Result<CompiledSource, CompileFailure>>,
    {
        let key_lock = self.key_lock(file);
        let _guard = key_lock.lock().await;

        let hash = content_hash(content.as_bytes());

        if let Some(entry) = self.entries().get(file) {
            if entry.content_hash == hash {
                debug!(file = %file.display(), hash = %hash, "cache hit");
                return Ok(CacheOutput {
                    compiled: entry.compiled.clone(),
                    status: CacheStatus::Hit,
                });
            }
            debug!(
                file = %file.display(),
                old = %entry.content_hash,
                new = %hash,
                "cache entry stale"
            );
        } else {
            debug!(file = %file.display(), hash = %hash, "cache miss");
        }

        let compiled = compile(file.to_path_buf(), content.to_string()).await?;

        self.entries().insert(
            file.to_path_buf(),
            CacheEntry {
                content_hash: hash,
                compiled: compiled.code.clone(),
            },
        );

        Ok(CacheOutput {
            compiled: compiled.code,
            status: CacheStatus::Compiled,
        })
    }

    /// Snapshot of the entry stored for `file`, if any.
    pub fn get(&self, file: &Path) -> Option<CacheEntry> {
        self.entries().get(file).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Drop every stored entry, along with the per-file locks no call is
    /// currently holding.
    pub fn clear(&self) {
        let removed = {
            let mut entries = self.entries();
            let removed = entries.len();
            entries.clear();
            removed
        };
        let mut inflight = self.inflight_locks();
        inflight.retain(|_, lock| Arc::strong_count(lock) > 1);
        debug!(removed, locks_kept = inflight.len(), "cleared compilation cache");
    }

    /// Number of per-file locks currently tracked.
    pub fn lock_count(&self) -> usize {
        self.inflight_locks().len()
    }

    fn key_lock(&self, file: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut inflight = self.inflight_locks();
        Arc::clone(inflight.entry(file.to_path_buf()).or_default())
    }

    fn inflight_locks(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>> {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PathBuf, CacheEntry>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
