//! Transaction guard
//!
//! A transaction holds the store lock from `begin` until it commits, rolls back
//! or is dropped, so other threads never observe its uncommitted writes.
//! Writes are applied live (read-your-own-writes); metadata is only refreshed
//! at commit. Dropping an active transaction rolls it back, which also covers
//! unwinding out of a panic.

use crate::errors::{CacheError, CacheResult};
use crate::features::store::{CacheStore, StateGuard};
use crate::shared::{resolve_path, CacheValue, EntrySnapshot};
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub struct Transaction<'a> {
    store: &'a CacheStore,
    /// Pending `set` operations, in order
    log: Vec<String>,
    /// First-observed pre-transaction entry per key (`None` = absent)
    backup: HashMap<String, Option<EntrySnapshot>>,
    active: bool,
    _guard: StateGuard<'a>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn begin(store: &'a CacheStore) -> Self {
        let guard = store.lock();
        tracing::trace!("Transaction started");
        Self {
            store,
            log: Vec::new(),
            backup: HashMap::new(),
            active: true,
            _guard: guard,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Keys written so far, in write order (repeats included)
    pub fn pending(&self) -> &[String] {
        &self.log
    }

    fn ensure_active(&self) -> CacheResult<()> {
        if self.active {
            Ok(())
        } else {
            Err(CacheError::TransactionInactive)
        }
    }

    /// Write `value` live, backing up the key's prior entry on first touch
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<CacheValue>) -> CacheResult<()> {
        self.ensure_active()?;
        let key = key.into();

        if !self.backup.contains_key(&key) {
            let snapshot = self.store.with_state(|s| s.snapshot(&key));
            self.backup.insert(key.clone(), snapshot);
        }

        let value = value.into();
        self.store.with_state_mut(|s| {
            s.put_value(&key, value);
        });
        self.log.push(key);
        Ok(())
    }

    /// Live value, including this transaction's own writes
    pub fn get(&self, key: &str) -> CacheResult<Option<CacheValue>> {
        self.ensure_active()?;
        Ok(self.store.peek(key))
    }

    /// Publish metadata for every written key.
    ///
    /// If refreshing any key fails, every key is restored and
    /// `TransactionRollback` is returned.
    pub fn commit(&mut self) -> CacheResult<()> {
        self.ensure_active()?;

        if let Err(e) = self.refresh_metadata() {
            tracing::error!("Transaction commit failed, rolling back: {}", e);
            self.restore();
            return Err(CacheError::TransactionRollback(e.to_string()));
        }

        let written = self.backup.len();
        self.log.clear();
        self.backup.clear();
        self.active = false;
        self.store.metrics().commits.inc();
        self.store.check_capacity();
        tracing::debug!("Transaction committed ({} keys)", written);
        Ok(())
    }

    /// Restore every touched key to its pre-transaction state
    pub fn rollback(&mut self) -> CacheResult<()> {
        self.ensure_active()?;
        self.restore();
        Ok(())
    }

    fn refresh_metadata(&self) -> CacheResult<()> {
        let mut seen = HashSet::new();
        for key in &self.log {
            if !seen.insert(key.as_str()) {
                continue;
            }

            let Some(value) = self.store.peek(key) else {
                continue;
            };
            let metadata = self
                .store
                .checker()
                .capture(resolve_path(Path::new(key)), &value)?;
            self.store.with_state_mut(|s| s.put_metadata(key, metadata));
        }
        Ok(())
    }

    fn restore(&mut self) {
        let restored = self.backup.len();
        for (key, snapshot) in self.backup.drain() {
            self.store.with_state_mut(|s| match snapshot {
                Some(snapshot) => s.restore(&key, snapshot),
                None => {
                    s.remove(&key);
                }
            });
        }
        self.log.clear();
        self.active = false;
        self.store.metrics().rollbacks.inc();
        tracing::info!("Transaction rolled back ({} keys restored)", restored);
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.active {
            if std::thread::panicking() {
                tracing::warn!("Transaction unwound by panic, rolling back");
            } else {
                tracing::warn!("Transaction dropped without commit, rolling back");
            }
            self.restore();
        }
    }
}
