//! Per-entry bookkeeping

use super::{CacheValue, ContentHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata recorded alongside every cached value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Last write time
    pub cached_at: DateTime<Utc>,

    /// Resolved backing file
    pub file_path: PathBuf,

    /// Hash of the content at last write; `None` when the file was absent
    pub content_hash: Option<ContentHash>,

    /// Backing file mtime (nanoseconds since Unix epoch); `None` when absent
    pub file_mtime_ns: Option<u64>,

    /// Sync status at last evaluation
    pub synchronized: bool,

    pub size_bytes: usize,

    /// Last watcher event seen for this entry
    pub last_fs_change: Option<DateTime<Utc>>,
}

impl EntryMetadata {
    /// True when the cache already knows the backing file is gone
    pub fn records_absent_file(&self) -> bool {
        self.content_hash.is_none()
    }
}

/// Pre-transaction copy of one entry
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySnapshot {
    pub value: CacheValue,
    pub metadata: Option<EntryMetadata>,
}
