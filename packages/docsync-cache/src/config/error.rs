//! Errors raised while loading or validating a cache configuration

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric setting outside its accepted bounds
    #[error("{field} = {value} is out of range (expected {bounds}). {hint}")]
    Range {
        field: String,
        value: String,
        bounds: String,
        hint: String,
    },

    #[error("config document has no `version` key; start the file with `version: {expected}`")]
    MissingVersion { expected: u32 },

    #[error("config document declares version {found}, this build reads version {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// Settings that are individually valid but contradict each other
    #[error("{issue} ({fix})")]
    Inconsistent { issue: String, fix: String },

    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    pub fn out_of_range(
        field: impl Into<String>,
        value: impl ToString,
        min: impl ToString,
        max: impl ToString,
        hint: impl Into<String>,
    ) -> Self {
        Self::Range {
            field: field.into(),
            value: value.to_string(),
            bounds: format!("{}..={}", min.to_string(), max.to_string()),
            hint: hint.into(),
        }
    }

    pub fn inconsistent(issue: impl Into<String>, fix: impl Into<String>) -> Self {
        Self::Inconsistent {
            issue: issue.into(),
            fix: fix.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_message_names_field_and_bounds() {
        let err = ConfigError::out_of_range("max_size_mb", 0, 1, 65536, "Use at least 1 MB.");
        assert_eq!(
            err.to_string(),
            "max_size_mb = 0 is out of range (expected 1..=65536). Use at least 1 MB."
        );
    }

    #[test]
    fn test_version_messages() {
        let missing = ConfigError::MissingVersion { expected: 1 };
        assert!(missing.to_string().contains("version: 1"));

        let unsupported = ConfigError::UnsupportedVersion {
            found: 7,
            expected: 1,
        };
        assert_eq!(
            unsupported.to_string(),
            "config document declares version 7, this build reads version 1"
        );
    }
}
