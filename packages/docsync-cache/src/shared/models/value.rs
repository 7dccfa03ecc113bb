//! Cached document content

use crate::errors::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Content held by a cache entry: raw text or decoded JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum CacheValue {
    Text(String),
    Json(serde_json::Value),
}

impl CacheValue {
    pub fn text(content: impl Into<String>) -> Self {
        CacheValue::Text(content.into())
    }

    pub fn json(value: serde_json::Value) -> Self {
        CacheValue::Json(value)
    }

    /// Decode raw file bytes the way the backing file's extension dictates
    pub fn from_file_bytes(path: &Path, bytes: &[u8]) -> CacheResult<Self> {
        if is_json_path(path) {
            return Ok(CacheValue::Json(serde_json::from_slice(bytes)?));
        }

        let text = std::str::from_utf8(bytes).map_err(|e| {
            CacheError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        Ok(CacheValue::Text(text.to_string()))
    }

    /// Bytes the content hash is computed over.
    ///
    /// JSON is hashed in its compact serialization.
    pub fn content_bytes(&self) -> Vec<u8> {
        match self {
            CacheValue::Text(text) => text.as_bytes().to_vec(),
            CacheValue::Json(value) => value.to_string().into_bytes(),
        }
    }

    /// Byte-length estimate used for capacity accounting
    pub fn size_bytes(&self) -> usize {
        match self {
            CacheValue::Text(text) => text.len(),
            CacheValue::Json(value) => value.to_string().len(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CacheValue::Text(text) => Some(text),
            CacheValue::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            CacheValue::Json(value) => Some(value),
            CacheValue::Text(_) => None,
        }
    }
}

impl From<&str> for CacheValue {
    fn from(text: &str) -> Self {
        CacheValue::Text(text.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(text: String) -> Self {
        CacheValue::Text(text)
    }
}

impl From<serde_json::Value> for CacheValue {
    fn from(value: serde_json::Value) -> Self {
        CacheValue::Json(value)
    }
}

/// JSON content is recognized by file extension
pub(crate) fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
