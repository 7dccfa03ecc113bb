//! ReportGenerator: read-only audit of the cache against the filesystem

use crate::features::store::CacheStore;
use crate::shared::resolve_path;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Per-key line of an integrity report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub synchronized: bool,
    pub file_exists: bool,
    pub file_path: PathBuf,
    pub size_bytes: usize,
}

/// Snapshot of cache integrity at one instant
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub total_items: usize,
    pub synchronized_items: usize,
    pub unsynchronized_items: usize,
    /// Entries whose backing file does not exist right now
    pub missing_files: usize,
    pub total_size_bytes: usize,
    pub generated_at: DateTime<Utc>,
    pub details: BTreeMap<String, EntryReport>,
}

impl IntegrityReport {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub struct ReportGenerator<'a> {
    store: &'a CacheStore,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(store: &'a CacheStore) -> Self {
        Self { store }
    }

    /// Evaluate every entry under one lock acquisition. Never mutates the store.
    pub fn generate(&self) -> IntegrityReport {
        let _guard = self.store.lock();

        let mut details = BTreeMap::new();
        for key in self.store.keys() {
            let metadata = self.store.metadata(&key);
            let file_path = metadata
                .as_ref()
                .map(|m| m.file_path.clone())
                .unwrap_or_else(|| resolve_path(Path::new(&key)));

            let entry = EntryReport {
                synchronized: self.store.is_synchronized(&key),
                file_exists: file_path.is_file(),
                size_bytes: metadata.map_or(0, |m| m.size_bytes),
                file_path,
            };
            details.insert(key, entry);
        }

        let synchronized_items = details.values().filter(|e| e.synchronized).count();
        let missing_files = details.values().filter(|e| !e.file_exists).count();

        IntegrityReport {
            total_items: details.len(),
            synchronized_items,
            unsynchronized_items: details.len() - synchronized_items,
            missing_files,
            total_size_bytes: self.store.total_bytes(),
            generated_at: Utc::now(),
            details,
        }
    }
}
