//! SyncEngine: re-read stale entries, evict orphaned ones
//!
//! Re-read failures (I/O, UTF-8, JSON) are logged and swallowed; the entry
//! keeps its last known-good value and stays flagged unsynchronized so the
//! next access retries.

use crate::errors::CacheResult;
use crate::features::integrity::FileState;
use crate::features::store::CacheStore;
use crate::shared::CacheValue;
use serde::Serialize;
use std::path::Path;

/// Outcome counts of one sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Entries examined
    pub checked: usize,
    /// Stale entries re-read from disk
    pub refreshed: usize,
    /// Entries evicted because the backing file is gone
    pub evicted: usize,
    /// Re-reads that failed
    pub failed: usize,
}

pub struct SyncEngine<'a> {
    store: &'a CacheStore,
}

impl<'a> SyncEngine<'a> {
    pub fn new(store: &'a CacheStore) -> Self {
        Self { store }
    }

    /// Reconcile `key`, or every cached key when `None`
    pub fn sync(&self, key: Option<&str>) -> SyncSummary {
        let _guard = self.store.lock();

        let keys = match key {
            Some(k) => vec![k.to_string()],
            None => self.store.keys(),
        };

        let mut summary = SyncSummary::default();
        for key in &keys {
            self.sync_key(key, &mut summary);
        }

        if key.is_none() {
            tracing::debug!(
                "Full sync: checked={} refreshed={} evicted={} failed={}",
                summary.checked,
                summary.refreshed,
                summary.evicted,
                summary.failed
            );
        }
        summary
    }

    fn sync_key(&self, key: &str, summary: &mut SyncSummary) {
        if !self.store.contains_key(key) {
            return;
        }
        summary.checked += 1;

        let file_path = self.store.file_path_for(key);
        let state = match FileState::probe(&file_path) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("Cannot stat {}: {}", file_path.display(), e);
                self.fail(key, summary);
                return;
            }
        };

        if !state.exists {
            self.store.evict(key);
            summary.evicted += 1;
            return;
        }

        if self.store.is_synchronized(key) {
            self.store.mark_synchronized(key, true);
            return;
        }

        match self.reread(key, &file_path, state) {
            Ok(()) => {
                summary.refreshed += 1;
                self.store.metrics().sync_refreshes.inc();
                tracing::debug!("Refreshed {} from {}", key, file_path.display());
            }
            Err(e) => {
                tracing::warn!("Failed to re-read {}: {}", file_path.display(), e);
                self.fail(key, summary);
            }
        }
    }

    fn reread(&self, key: &str, file_path: &Path, state: FileState) -> CacheResult<()> {
        let raw = std::fs::read(file_path)?;
        let value = CacheValue::from_file_bytes(file_path, &raw)?;
        let metadata = self
            .store
            .checker()
            .capture_read(file_path.to_path_buf(), &raw, state, &value);
        self.store.write_synced(key, value, metadata);
        Ok(())
    }

    fn fail(&self, key: &str, summary: &mut SyncSummary) {
        summary.failed += 1;
        self.store.metrics().sync_failures.inc();
        self.store.mark_synchronized(key, false);
    }
}
