//! Configuration I/O (YAML loading)

use super::cache_config::CacheConfig;
use serde::{Deserialize, Serialize};

/// Current schema version
pub const CONFIG_VERSION: u32 = 1;

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigExportV1 {
    /// Schema version (always 1 for v1). Optional at parse time so a missing
    /// field produces a helpful error instead of a serde message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,

    #[serde(default)]
    pub cache: CacheConfig,
}
