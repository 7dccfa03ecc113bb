//! CacheStore: key → value and key → metadata behind one reentrant lock

use super::state::StoreState;
use crate::config::CacheConfig;
use crate::errors::{CacheError, CacheResult};
use crate::features::file_watcher::ports::{ChangeEvent, ChangeType};
use crate::features::integrity::{IntegrityChecker, SyncStatus};
use crate::features::sync::{SyncEngine, SyncSummary};
use crate::metrics::CacheMetrics;
use crate::shared::{resolve_path, CacheValue, EntryMetadata};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

pub(crate) type StateGuard<'a> = ReentrantMutexGuard<'a, RefCell<StoreState>>;

/// In-memory document store
///
/// Every public operation holds the lock for its whole duration, including
/// file I/O and hashing, so operations are linearizable across caller threads
/// and the watcher thread. The lock is reentrant: a thread already holding it
/// (inside a transaction, or a change callback) may call back into the store.
pub struct CacheStore {
    state: ReentrantMutex<RefCell<StoreState>>,
    checker: IntegrityChecker,
    metrics: CacheMetrics,
    auto_sync: bool,
    max_size_bytes: u64,
}

impl CacheStore {
    pub fn new(config: &CacheConfig, metrics: CacheMetrics) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(StoreState::default())),
            checker: IntegrityChecker::new(),
            metrics,
            auto_sync: config.auto_sync,
            max_size_bytes: config.max_size_bytes(),
        }
    }

    pub(crate) fn lock(&self) -> StateGuard<'_> {
        self.state.lock()
    }

    /// Run `f` with shared access to the maps
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        let guard = self.lock();
        let state = guard.borrow();
        f(&state)
    }

    /// Run `f` with exclusive access to the maps.
    ///
    /// `f` must not call back into the store.
    pub(crate) fn with_state_mut<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let guard = self.lock();
        let mut state = guard.borrow_mut();
        let result = f(&mut state);
        self.update_gauges(&state);
        result
    }

    pub(crate) fn checker(&self) -> &IntegrityChecker {
        &self.checker
    }

    pub(crate) fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    // ═══════════════════════════════════════════════════════════════════
    // Reads
    // ═══════════════════════════════════════════════════════════════════

    /// Get with the configured `auto_sync` default
    pub fn get(&self, key: &str) -> Option<CacheValue> {
        self.get_with_sync(key, self.auto_sync)
    }

    /// Get a clone of the cached value.
    ///
    /// With `auto_sync`, a stale entry is reconciled against disk first; if that
    /// re-read fails the last known-good value is returned.
    pub fn get_with_sync(&self, key: &str, auto_sync: bool) -> Option<CacheValue> {
        let _guard = self.lock();

        if !self.contains_key(key) {
            self.metrics.misses.inc();
            return None;
        }

        if auto_sync {
            let status = self.sync_status(key);
            if !status.is_synchronized() {
                tracing::debug!("get({}) found stale entry ({}), syncing", key, status);
                SyncEngine::new(self).sync(Some(key));
            }
        }

        // A sync pass may have evicted the entry
        match self.peek(key) {
            Some(value) => {
                self.metrics.hits.inc();
                Some(value)
            }
            None => {
                self.metrics.misses.inc();
                None
            }
        }
    }

    /// Read without syncing or touching hit/miss metrics
    pub(crate) fn peek(&self, key: &str) -> Option<CacheValue> {
        self.with_state(|s| s.value(key).cloned())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.with_state(|s| s.contains(key))
    }

    pub fn keys(&self) -> Vec<String> {
        self.with_state(|s| s.keys().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.with_state(|s| s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.with_state(|s| s.is_empty())
    }

    pub fn total_bytes(&self) -> usize {
        self.with_state(|s| s.total_bytes())
    }

    pub fn metadata(&self, key: &str) -> Option<EntryMetadata> {
        self.with_state(|s| s.metadata(key).cloned())
    }

    /// Evaluate one key against the filesystem
    pub fn sync_status(&self, key: &str) -> SyncStatus {
        self.with_state(|s| self.checker.evaluate(s.contains(key), s.metadata(key)))
    }

    pub fn is_synchronized(&self, key: &str) -> bool {
        self.sync_status(key).is_synchronized()
    }

    /// Backing file for a key: the recorded path, else the resolved key
    pub(crate) fn file_path_for(&self, key: &str) -> PathBuf {
        self.with_state(|s| s.metadata(key).map(|m| m.file_path.clone()))
            .unwrap_or_else(|| resolve_path(Path::new(key)))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Writes
    // ═══════════════════════════════════════════════════════════════════

    /// Unconditional write; metadata is refreshed from the current backing file
    pub fn set(&self, key: &str, value: impl Into<CacheValue>) -> CacheResult<()> {
        let value = value.into();
        let _guard = self.lock();

        let metadata = self
            .checker
            .capture(resolve_path(Path::new(key)), &value)?;
        if !metadata.synchronized {
            tracing::debug!("set({}) wrote content that differs from the backing file", key);
        }

        self.with_state_mut(|s| s.insert(key, value, metadata));
        self.check_capacity();
        Ok(())
    }

    /// Conditional write: refused when `key` is cached and no longer matches its file
    pub fn set_with_integrity_check(
        &self,
        key: &str,
        value: impl Into<CacheValue>,
    ) -> CacheResult<()> {
        let _guard = self.lock();

        let status = self.sync_status(key);
        if !status.is_synchronized() {
            self.metrics.integrity_violations.inc();
            tracing::warn!("Integrity violation on {}: {}", key, status);
            return Err(CacheError::integrity(key, status.to_string()));
        }

        self.set(key, value)
    }

    /// Drop one entry. Returns the removed value.
    pub fn remove(&self, key: &str) -> Option<CacheValue> {
        self.with_state_mut(|s| s.remove(key)).map(|snapshot| snapshot.value)
    }

    pub fn clear(&self) {
        self.with_state_mut(|s| s.clear());
    }

    /// Evict an orphaned entry (backing file gone)
    pub(crate) fn evict(&self, key: &str) -> bool {
        let removed = self.with_state_mut(|s| s.remove(key)).is_some();
        if removed {
            self.metrics.evictions.inc();
            tracing::info!("Evicted {}: backing file no longer exists", key);
        }
        removed
    }

    /// Store content freshly read from disk
    pub(crate) fn write_synced(&self, key: &str, value: CacheValue, metadata: EntryMetadata) {
        self.with_state_mut(|s| s.insert(key, value, metadata));
        self.check_capacity();
    }

    /// Record the outcome of an evaluation in the entry's metadata
    pub(crate) fn mark_synchronized(&self, key: &str, synchronized: bool) {
        self.with_state_mut(|s| {
            if let Some(meta) = s.metadata_mut(key) {
                meta.synchronized = synchronized;
            }
        });
    }

    // ═══════════════════════════════════════════════════════════════════
    // Filesystem events
    // ═══════════════════════════════════════════════════════════════════

    /// Apply a watcher event: deletes evict eagerly, creates/modifies only
    /// flag the entry stale. Returns the affected keys.
    pub fn apply_change(&self, event: &ChangeEvent) -> Vec<String> {
        let _guard = self.lock();
        self.metrics.watcher_events.inc();

        let resolved = resolve_path(&event.path);
        let affected: Vec<String> = self.with_state(|s| {
            s.entries()
                .filter(|(key, _, meta)| {
                    Path::new(key.as_str()) == event.path
                        || meta.map_or(false, |m| {
                            m.file_path == resolved || m.file_path == event.path
                        })
                })
                .map(|(key, _, _)| key.clone())
                .collect()
        });

        for key in &affected {
            match event.change_type {
                ChangeType::Deleted => {
                    self.evict(key);
                }
                ChangeType::Created | ChangeType::Modified => {
                    self.with_state_mut(|s| {
                        if let Some(meta) = s.metadata_mut(key) {
                            meta.synchronized = false;
                            meta.last_fs_change = Some(event.timestamp);
                        }
                    });
                    tracing::debug!("{} marked stale ({})", key, event.change_type);
                }
            }
        }

        affected
    }

    /// Reconcile one key or all keys with the filesystem
    pub fn sync_with_filesystem(&self, key: Option<&str>) -> SyncSummary {
        SyncEngine::new(self).sync(key)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Capacity
    // ═══════════════════════════════════════════════════════════════════

    fn update_gauges(&self, state: &StoreState) {
        self.metrics.entries.set(state.len() as i64);
        self.metrics.bytes.set(state.total_bytes() as i64);
    }

    /// The size limit is advisory: report, never evict
    pub(crate) fn check_capacity(&self) {
        let total = self.total_bytes() as u64;
        if total > self.max_size_bytes {
            self.metrics.over_capacity.inc();
            tracing::warn!(
                "Cache holds {} bytes, above the {} byte capacity hint",
                total,
                self.max_size_bytes
            );
        }
    }
}
