//! Top-level cache configuration

use super::error::{ConfigError, ConfigResult};
use super::io::{ConfigExportV1, CONFIG_VERSION};
use super::validation::{check_range, Validatable};
use crate::features::file_watcher::ports::WatchConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MAX_SIZE_MB_RANGE: (u64, u64) = (1, 65_536);
pub const DEBOUNCE_MS_RANGE: (u64, u64) = (0, 60_000);

/// Construction parameters for [`crate::IntegrityCache`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Advisory capacity hint. Exceeding it is logged and counted; nothing is evicted.
    pub max_size_mb: u64,

    /// Default for `get`: re-sync a stale entry before returning it
    pub auto_sync: bool,

    /// File watcher settings
    pub watch: WatchConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_mb: 100,
            auto_sync: true,
            watch: WatchConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Capacity hint in bytes
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }

    /// Builder-style watch override
    pub fn with_watch(mut self, watch: WatchConfig) -> Self {
        self.watch = watch;
        self
    }

    /// Load and validate a YAML configuration file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate a YAML configuration document
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(content)?;

        match export.version {
            None => {
                return Err(ConfigError::MissingVersion {
                    expected: CONFIG_VERSION,
                })
            }
            Some(CONFIG_VERSION) => {}
            Some(found) => {
                return Err(ConfigError::UnsupportedVersion {
                    found,
                    expected: CONFIG_VERSION,
                })
            }
        }

        export.cache.validate()?;
        Ok(export.cache)
    }

    /// Serialize as a versioned YAML document
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let export = ConfigExportV1 {
            version: Some(CONFIG_VERSION),
            cache: self.clone(),
        };
        serde_yaml::to_string(&export).map_err(ConfigError::Yaml)
    }
}

impl Validatable for CacheConfig {
    fn validate(&self) -> ConfigResult<()> {
        check_range(
            "max_size_mb",
            self.max_size_mb,
            MAX_SIZE_MB_RANGE.0,
            MAX_SIZE_MB_RANGE.1,
            "The capacity hint is expressed in whole megabytes.",
        )?;
        self.watch.validate()
    }

    fn config_name(&self) -> &'static str {
        "CacheConfig"
    }
}

impl Validatable for WatchConfig {
    fn validate(&self) -> ConfigResult<()> {
        check_range(
            "watch.debounce_ms",
            self.debounce_ms,
            DEBOUNCE_MS_RANGE.0,
            DEBOUNCE_MS_RANGE.1,
            "Debounce windows above one minute hide real edits.",
        )?;

        if self.enabled && self.root_paths.is_empty() {
            return Err(ConfigError::inconsistent(
                "watch.enabled is true but watch.root_paths is empty",
                "add at least one root directory or disable the watcher",
            ));
        }

        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "WatchConfig"
    }
}
