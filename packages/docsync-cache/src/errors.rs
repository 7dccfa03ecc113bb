//! Error types for docsync-cache
//!
//! Integrity violations and transaction failures are always surfaced to the
//! caller. Sync re-read failures never reach this type; they are logged and the
//! entry stays stale.

use crate::config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    /// Conditional write targeted an entry whose backing file has drifted
    #[error("Integrity violation for '{key}': {reason}")]
    IntegrityViolation { key: String, reason: String },

    /// Commit failed; every key was restored to its pre-transaction state
    #[error("Transaction rolled back: {0}")]
    TransactionRollback(String),

    #[error("Transaction is no longer active")]
    TransactionInactive,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File watcher error: {0}")]
    Watcher(String),

    #[error("Metrics registration error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CacheError {
    pub fn integrity(key: impl Into<String>, reason: impl Into<String>) -> Self {
        CacheError::IntegrityViolation {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn watcher(msg: impl Into<String>) -> Self {
        CacheError::Watcher(msg.into())
    }

    /// True for errors the caller caused by racing an external writer
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, CacheError::IntegrityViolation { .. })
    }
}

impl From<notify::Error> for CacheError {
    fn from(err: notify::Error) -> Self {
        CacheError::Watcher(err.to_string())
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
