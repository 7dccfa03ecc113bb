//! Configuration validation

use super::error::ConfigResult;

/// Trait for validatable configuration objects
///
/// Returns `Ok(())` if valid, `Err(ConfigError)` with a hint otherwise.
pub trait Validatable {
    fn validate(&self) -> ConfigResult<()>;

    /// Get the configuration name for error messages
    fn config_name(&self) -> &'static str {
        "Config"
    }
}

/// Check that `value` lies in `min..=max`
pub(crate) fn check_range<T>(
    field: &str,
    value: T,
    min: T,
    max: T,
    hint: &str,
) -> ConfigResult<()>
where
    T: PartialOrd + ToString + Copy,
{
    if value < min || value > max {
        return Err(super::ConfigError::out_of_range(field, value, min, max, hint));
    }
    Ok(())
}
