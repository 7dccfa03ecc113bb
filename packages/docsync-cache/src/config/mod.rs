//! Cache configuration
//!
//! Configuration is plain data with defaults that work out of the box. A
//! versioned YAML document can override any field:
//!
//! ```yaml
//! version: 1
//! cache:
//!   max_size_mb: 256
//!   auto_sync: true
//!   watch:
//!     enabled: true
//!     root_paths: ["/srv/docs"]
//!     extensions: ["md", "json"]
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use docsync_cache::config::CacheConfig;
//!
//! let config = CacheConfig::default();
//! let config = CacheConfig::from_yaml("docsync.yaml")?;
//! ```

pub mod cache_config;
pub mod error;
pub mod io;
pub mod validation;

pub use cache_config::CacheConfig;
pub use error::{ConfigError, ConfigResult};
pub use io::ConfigExportV1;
pub use validation::Validatable;
