//! Synchronization decision logic
//!
//! Rules, in order:
//! 1. key not cached → synchronized
//! 2. cached without metadata → not synchronized
//! 3. backing file missing → synchronized only if the entry already recorded it as missing
//! 4. mtime differs → not synchronized
//! 5. mtime equal but SHA-256 differs → not synchronized
//! 6. otherwise → synchronized
//!
//! Hashing only happens once the mtime check passes.

use super::fingerprint::FileState;
use crate::errors::CacheResult;
use crate::shared::{CacheValue, ContentHash, EntryMetadata};
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Outcome of an integrity evaluation, naming the deciding rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncStatus {
    NotCached,
    Synchronized,
    MissingMetadata,
    FileMissing,
    MtimeChanged {
        recorded: Option<u64>,
        current: Option<u64>,
    },
    HashChanged,
    Unreadable { error: String },
}

impl SyncStatus {
    pub fn is_synchronized(&self) -> bool {
        matches!(self, SyncStatus::NotCached | SyncStatus::Synchronized)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::NotCached => write!(f, "not cached"),
            SyncStatus::Synchronized => write!(f, "synchronized"),
            SyncStatus::MissingMetadata => write!(f, "metadata record missing"),
            SyncStatus::FileMissing => write!(f, "backing file deleted"),
            SyncStatus::MtimeChanged { recorded, current } => {
                write!(f, "mtime changed ({:?} -> {:?})", recorded, current)
            }
            SyncStatus::HashChanged => write!(f, "content hash changed"),
            SyncStatus::Unreadable { error } => write!(f, "backing file unreadable: {}", error),
        }
    }
}

/// Decides whether cache entries still match their backing files
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityChecker;

impl IntegrityChecker {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate one entry against the filesystem
    pub fn evaluate(&self, present: bool, metadata: Option<&EntryMetadata>) -> SyncStatus {
        if !present {
            return SyncStatus::NotCached;
        }

        let Some(meta) = metadata else {
            return SyncStatus::MissingMetadata;
        };

        let state = match FileState::probe(&meta.file_path) {
            Ok(state) => state,
            Err(e) => return SyncStatus::Unreadable { error: e.to_string() },
        };

        if !state.exists {
            return if meta.records_absent_file() {
                SyncStatus::Synchronized
            } else {
                SyncStatus::FileMissing
            };
        }

        if state.mtime_ns != meta.file_mtime_ns {
            return SyncStatus::MtimeChanged {
                recorded: meta.file_mtime_ns,
                current: state.mtime_ns,
            };
        }

        let Some(recorded) = meta.content_hash else {
            return SyncStatus::HashChanged;
        };

        match ContentHash::from_file(&meta.file_path) {
            Ok(current) if current == recorded => SyncStatus::Synchronized,
            Ok(_) => SyncStatus::HashChanged,
            Err(e) => SyncStatus::Unreadable { error: e.to_string() },
        }
    }

    /// Metadata for `value` written now under `file_path`.
    ///
    /// File fields describe the backing file at write time; the hash is of
    /// `value` itself, so a value that differs from the file is born stale.
    pub fn capture(&self, file_path: PathBuf, value: &CacheValue) -> CacheResult<EntryMetadata> {
        let state = FileState::probe(&file_path)?;

        let (content_hash, synchronized) = if state.exists {
            let hash = ContentHash::compute(&value.content_bytes());
            let on_disk = ContentHash::from_file(&file_path).ok();
            (Some(hash), on_disk == Some(hash))
        } else {
            (None, true)
        };

        Ok(EntryMetadata {
            cached_at: Utc::now(),
            file_path,
            content_hash,
            file_mtime_ns: state.mtime_ns,
            synchronized,
            size_bytes: value.size_bytes(),
            last_fs_change: None,
        })
    }

    /// Metadata for content just read from disk
    pub fn capture_read(
        &self,
        file_path: PathBuf,
        raw: &[u8],
        state: FileState,
        value: &CacheValue,
    ) -> EntryMetadata {
        EntryMetadata {
            cached_at: Utc::now(),
            file_path,
            content_hash: Some(ContentHash::compute(raw)),
            file_mtime_ns: state.mtime_ns,
            synchronized: true,
            size_bytes: value.size_bytes(),
            last_fs_change: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_absent_key_is_synchronized() {
        let checker = IntegrityChecker::new();
        let status = checker.evaluate(false, None);
        assert_eq!(status, SyncStatus::NotCached);
        assert!(status.is_synchronized());
    }

    #[test]
    fn test_present_without_metadata_is_not_synchronized() {
        let status = IntegrityChecker::new().evaluate(true, None);
        assert_eq!(status, SyncStatus::MissingMetadata);
        assert!(!status.is_synchronized());
    }

    #[test]
    fn test_capture_matching_value_is_synchronized() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "a.md", "# A");
        let checker = IntegrityChecker::new();

        let meta = checker.capture(path, &CacheValue::from("# A")).unwrap();
        assert!(meta.synchronized);
        assert!(meta.content_hash.is_some());
        assert_eq!(checker.evaluate(true, Some(&meta)), SyncStatus::Synchronized);
    }

    #[test]
    fn test_capture_differing_value_is_born_stale() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "a.md", "# on disk");
        let checker = IntegrityChecker::new();

        let meta = checker.capture(path, &CacheValue::from("# in memory")).unwrap();
        assert!(!meta.synchronized);
        assert_eq!(checker.evaluate(true, Some(&meta)), SyncStatus::HashChanged);
    }

    #[test]
    fn test_missing_file_recorded_as_missing_is_synchronized() {
        let dir = TempDir::new().unwrap();
        let checker = IntegrityChecker::new();

        let meta = checker
            .capture(dir.path().join("virtual.md"), &CacheValue::from("x"))
            .unwrap();
        assert!(meta.content_hash.is_none());
        assert!(meta.file_mtime_ns.is_none());
        assert_eq!(checker.evaluate(true, Some(&meta)), SyncStatus::Synchronized);
    }

    #[test]
    fn test_deleted_file_is_not_synchronized() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "a.md", "# A");
        let checker = IntegrityChecker::new();
        let meta = checker.capture(path.clone(), &CacheValue::from("# A")).unwrap();

        fs::remove_file(&path).unwrap();
        assert_eq!(checker.evaluate(true, Some(&meta)), SyncStatus::FileMissing);
    }

    #[test]
    fn test_mtime_change_detected() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "a.md", "# A");
        let checker = IntegrityChecker::new();
        let mut meta = checker.capture(path, &CacheValue::from("# A")).unwrap();

        meta.file_mtime_ns = meta.file_mtime_ns.map(|m| m.saturating_sub(1_000_000_000));
        assert!(matches!(
            checker.evaluate(true, Some(&meta)),
            SyncStatus::MtimeChanged { .. }
        ));
    }

    #[test]
    fn test_same_mtime_rewrite_detected_by_hash() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "a.md", "# A");
        let checker = IntegrityChecker::new();
        let mut meta = checker.capture(path.clone(), &CacheValue::from("# A")).unwrap();

        // Rewrite, then pretend the recorded mtime was the new one
        fs::write(&path, "# B").unwrap();
        meta.file_mtime_ns = FileState::probe(&path).unwrap().mtime_ns;
        assert_eq!(checker.evaluate(true, Some(&meta)), SyncStatus::HashChanged);
    }

    #[test]
    fn test_capture_read_hashes_raw_bytes() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "cfg.json", "{ \"a\" : 1 }");
        let checker = IntegrityChecker::new();
        let raw = fs::read(&path).unwrap();
        let state = FileState::probe(&path).unwrap();
        let value = CacheValue::from_file_bytes(&path, &raw).unwrap();

        let meta = checker.capture_read(path, &raw, state, &value);
        assert!(meta.synchronized);
        assert_eq!(checker.evaluate(true, Some(&meta)), SyncStatus::Synchronized);
    }

    #[test]
    fn test_path_below_regular_file_follows_absent_rule() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.md", "# A");
        let nested = dir.path().join("a.md").join("section");
        let checker = IntegrityChecker::new();

        let meta = checker.capture(nested, &CacheValue::from("v")).unwrap();
        assert!(meta.content_hash.is_none());
        assert_eq!(checker.evaluate(true, Some(&meta)), SyncStatus::Synchronized);
    }

    #[test]
    fn test_stat_failure_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "a.md", "# A");
        let checker = IntegrityChecker::new();
        let mut meta = checker.capture(path, &CacheValue::from("# A")).unwrap();

        meta.file_path = dir.path().join("x".repeat(300));
        let status = checker.evaluate(true, Some(&meta));
        assert!(matches!(status, SyncStatus::Unreadable { .. }));
        assert!(!status.is_synchronized());
    }
}
