//! Ports - Interface definitions for the file watcher

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Kind of filesystem change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Created,
    Modified,
    Deleted,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Created => "created",
            ChangeType::Modified => "modified",
            ChangeType::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File change event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub change_type: ChangeType,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, change_type: ChangeType) -> Self {
        Self {
            path: path.into(),
            change_type,
            timestamp: Utc::now(),
        }
    }

    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeType::Created)
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeType::Modified)
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeType::Deleted)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Configuration for the file watcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Start the watcher when the cache is constructed
    pub enabled: bool,

    /// Root directories to watch
    pub root_paths: Vec<PathBuf>,

    /// File extensions to watch (e.g., ["md", "json"]). Empty watches all files.
    pub extensions: Vec<String>,

    /// Repeated events of the same kind for one path within this window are dropped
    pub debounce_ms: u64,

    /// Patterns to ignore (glob patterns)
    pub ignore_patterns: Vec<String>,

    /// Enable recursive watching of subdirectories
    pub recursive: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            root_paths: Vec::new(),
            extensions: Vec::new(),
            debounce_ms: 100,
            ignore_patterns: vec![
                "**/.git/**".to_string(),
                "**/node_modules/**".to_string(),
                "**/target/**".to_string(),
            ],
            recursive: true,
        }
    }
}

impl WatchConfig {
    /// Watch the given roots with default filtering
    pub fn for_roots<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            enabled: true,
            root_paths: roots.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn debounce_duration(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Trait for handling file change events
pub trait FileEventHandler: Send + Sync {
    /// Called when a file change is detected (after debouncing)
    fn handle_event(&self, event: &ChangeEvent) -> Result<(), String>;

    /// Called when an error occurs in the watcher
    fn handle_error(&self, error: String);
}
