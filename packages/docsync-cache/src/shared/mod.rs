//! Shared module - Common types and utilities
//!
//! Types shared by every feature: cached values, per-entry metadata and
//! content hashes, plus path resolution for cache keys.

pub mod models;
pub mod paths;

pub use models::*;
pub use paths::resolve_path;
