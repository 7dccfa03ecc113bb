//! Integrity checking - decides whether a cached entry still matches its file

mod checker;
mod fingerprint;

pub use checker::{IntegrityChecker, SyncStatus};
pub use fingerprint::FileState;
