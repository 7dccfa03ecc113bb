//! IntegrityCache - the public facade
//!
//! Owns the store, the file watcher and the change-callback registry, and
//! wires watcher events into the store. Construct one per owner and call
//! [`IntegrityCache::cleanup`] at shutdown (`Drop` does it too).
//!
//! # Example
//! ```ignore
//! let config = CacheConfig::default().with_watch(WatchConfig::for_roots(["/srv/docs"]));
//! let cache = IntegrityCache::new(config, &Registry::new())?;
//!
//! cache.set("/srv/docs/readme.md", std::fs::read_to_string("/srv/docs/readme.md")?)?;
//! cache.transaction(|tx| {
//!     tx.set("/srv/docs/a.md", "# A")?;
//!     tx.set("/srv/docs/b.md", "# B")
//! })?;
//! println!("{}", cache.get_integrity_report().to_json_pretty()?);
//! ```

use crate::config::{CacheConfig, Validatable};
use crate::errors::{CacheError, CacheResult};
use crate::features::file_watcher::{
    ChangeEvent, ChangeType, FileEventHandler, FileWatcher, WatchConfig,
};
use crate::features::integrity::SyncStatus;
use crate::features::report::{IntegrityReport, ReportGenerator};
use crate::features::store::CacheStore;
use crate::features::sync::SyncSummary;
use crate::features::transaction::{Transaction, TransactionManager};
use crate::metrics::CacheMetrics;
use crate::shared::{CacheValue, EntryMetadata};
use parking_lot::{Mutex, RwLock};
use prometheus::Registry;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

/// Observer of filesystem changes, called on the watcher thread
pub type ChangeCallback = Arc<dyn Fn(&Path, ChangeType) -> Result<(), String> + Send + Sync>;

#[derive(Default)]
struct CallbackRegistry {
    callbacks: RwLock<Vec<ChangeCallback>>,
}

impl CallbackRegistry {
    fn add(&self, callback: ChangeCallback) {
        self.callbacks.write().push(callback);
    }

    fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    fn clear(&self) {
        self.callbacks.write().clear();
    }

    /// Call every observer; failures and panics are logged, never propagated
    fn notify(&self, path: &Path, change_type: ChangeType) {
        // Snapshot so a callback may register another callback
        let callbacks: Vec<ChangeCallback> = self.callbacks.read().clone();

        for callback in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(path, change_type))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(
                        "Change callback failed for {} ({}): {}",
                        path.display(),
                        change_type,
                        e
                    );
                }
                Err(_) => {
                    tracing::error!(
                        "Change callback panicked for {} ({})",
                        path.display(),
                        change_type
                    );
                }
            }
        }
    }
}

/// Bridges watcher events into the store, then fans out to callbacks
struct CacheEventHandler {
    store: Arc<CacheStore>,
    callbacks: Arc<CallbackRegistry>,
}

impl CacheEventHandler {
    fn dispatch(&self, event: &ChangeEvent) -> Vec<String> {
        // The store lock is released before callbacks run
        let affected = self.store.apply_change(event);
        self.callbacks.notify(event.path(), event.change_type);
        affected
    }
}

impl FileEventHandler for CacheEventHandler {
    fn handle_event(&self, event: &ChangeEvent) -> Result<(), String> {
        let affected = self.dispatch(event);
        if !affected.is_empty() {
            tracing::debug!(
                "{} {} affected {} entr{}",
                event.change_type,
                event.path.display(),
                affected.len(),
                if affected.len() == 1 { "y" } else { "ies" }
            );
        }
        Ok(())
    }

    fn handle_error(&self, error: String) {
        tracing::warn!("File watcher: {}", error);
    }
}

/// Integrity-aware in-memory document cache
pub struct IntegrityCache {
    config: CacheConfig,
    store: Arc<CacheStore>,
    handler: Arc<CacheEventHandler>,
    watcher: Mutex<Option<FileWatcher>>,
}

impl IntegrityCache {
    /// Validate `config`, register metrics on `registry`, and start the watcher
    /// when `config.watch.enabled`
    pub fn new(config: CacheConfig, registry: &Registry) -> CacheResult<Self> {
        config.validate()?;

        let metrics = CacheMetrics::new(registry)?;
        let store = Arc::new(CacheStore::new(&config, metrics));
        let handler = Arc::new(CacheEventHandler {
            store: Arc::clone(&store),
            callbacks: Arc::new(CallbackRegistry::default()),
        });

        let cache = Self {
            config,
            store,
            handler,
            watcher: Mutex::new(None),
        };

        if cache.config.watch.enabled {
            cache.start_watching(cache.config.watch.clone())?;
        }

        tracing::debug!(
            "IntegrityCache ready (auto_sync={}, max_size_mb={})",
            cache.config.auto_sync,
            cache.config.max_size_mb
        );
        Ok(cache)
    }

    /// Default configuration on a private registry
    pub fn with_defaults() -> CacheResult<Self> {
        Self::new(CacheConfig::default(), &Registry::new())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn metrics(&self) -> &CacheMetrics {
        self.store.metrics()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Watcher
    // ═══════════════════════════════════════════════════════════════════

    /// Watch `watch.root_paths`, replacing any running watcher.
    ///
    /// Must not be called from a change callback.
    pub fn start_watching(&self, watch: WatchConfig) -> CacheResult<()> {
        let mut slot = self.watcher.lock();
        if let Some(mut previous) = slot.take() {
            previous.stop()?;
        }

        let handler: Arc<dyn FileEventHandler> = self.handler.clone();
        let mut watcher = FileWatcher::new(watch, handler)?;
        watcher.start()?;
        *slot = Some(watcher);
        Ok(())
    }

    /// Stop and join the watcher thread; no callback runs after this returns.
    ///
    /// From inside a change callback (including a `Drop` of the last `Arc`
    /// held by one) the watcher is stopped without joining; no event after the
    /// current one is delivered.
    pub fn stop_watching(&self) -> CacheResult<()> {
        match self.watcher.lock().take() {
            Some(mut watcher) => watcher.stop(),
            None => Ok(()),
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .as_ref()
            .map_or(false, FileWatcher::is_running)
    }

    /// Register an observer of filesystem changes.
    ///
    /// Callbacks run on the watcher thread after the store has been updated.
    pub fn add_change_callback<F>(&self, callback: F)
    where
        F: Fn(&Path, ChangeType) -> Result<(), String> + Send + Sync + 'static,
    {
        self.handler.callbacks.add(Arc::new(callback));
    }

    pub fn callback_count(&self) -> usize {
        self.handler.callbacks.len()
    }

    /// Feed one event through the same path the watcher uses. Returns the
    /// affected keys.
    pub fn apply_change_event(&self, event: &ChangeEvent) -> Vec<String> {
        self.handler.dispatch(event)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Cache operations
    // ═══════════════════════════════════════════════════════════════════

    pub fn get(&self, key: &str) -> Option<CacheValue> {
        self.store.get(key)
    }

    pub fn get_with_sync(&self, key: &str, auto_sync: bool) -> Option<CacheValue> {
        self.store.get_with_sync(key, auto_sync)
    }

    pub fn set(&self, key: &str, value: impl Into<CacheValue>) -> CacheResult<()> {
        self.store.set(key, value)
    }

    pub fn set_with_integrity_check(
        &self,
        key: &str,
        value: impl Into<CacheValue>,
    ) -> CacheResult<()> {
        self.store.set_with_integrity_check(key, value)
    }

    pub fn is_synchronized(&self, key: &str) -> bool {
        self.store.is_synchronized(key)
    }

    pub fn sync_status(&self, key: &str) -> SyncStatus {
        self.store.sync_status(key)
    }

    pub fn sync_with_filesystem(&self, key: Option<&str>) -> SyncSummary {
        self.store.sync_with_filesystem(key)
    }

    pub fn remove(&self, key: &str) -> Option<CacheValue> {
        self.store.remove(key)
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.store.keys()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn metadata(&self, key: &str) -> Option<EntryMetadata> {
        self.store.metadata(key)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Transactions & reporting
    // ═══════════════════════════════════════════════════════════════════

    /// Start a transaction. It holds the store lock until it finishes, so
    /// commit or drop it before calling [`IntegrityCache::cleanup`].
    pub fn begin_transaction(&self) -> Transaction<'_> {
        TransactionManager::new(&self.store).begin()
    }

    /// Run `f` atomically: `Ok` commits, `Err` rolls back and is returned as-is
    pub fn transaction<'a, T, E, F>(&'a self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'a>) -> Result<T, E>,
        E: From<CacheError>,
    {
        TransactionManager::new(&self.store).run(f)
    }

    pub fn get_integrity_report(&self) -> IntegrityReport {
        ReportGenerator::new(&self.store).generate()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Shutdown
    // ═══════════════════════════════════════════════════════════════════

    /// Stop the watcher, drop every callback and empty the store. Idempotent.
    pub fn cleanup(&self) {
        if let Err(e) = self.stop_watching() {
            tracing::error!("Failed to stop file watcher during cleanup: {}", e);
        }
        self.handler.callbacks.clear();
        self.store.clear();
        tracing::debug!("IntegrityCache cleaned up");
    }
}

impl Drop for IntegrityCache {
    fn drop(&mut self) {
        self.cleanup();
    }
}
