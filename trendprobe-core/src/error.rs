//! Configuration errors.
//!
//! Data conditions (unready indicators, degenerate risk, bankruptcy, empty
//! trade lists) are never errors; they surface as `None`, rejected-signal
//! records, or result flags. Only a configuration that cannot be run at all
//! is rejected here, before any computation starts.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be >= 1")]
    ZeroPeriod { field: &'static str },

    #[error("{field} must be > 0, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be >= 0, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must lie in ({min}, {max}), got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("fast EMA period {fast} must be shorter than slow period {slow}")]
    FastNotBelowSlow { fast: usize, slow: usize },

    #[error("multi-timeframe mode '{mode}' needs higher-timeframe bars")]
    MissingHigherTimeframe { mode: &'static str },
}

pub(crate) fn require_period(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ZeroPeriod { field });
    }
    Ok(())
}

pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(value > 0.0) || !value.is_finite() {
        return Err(ConfigError::NonPositive { field, value });
    }
    Ok(())
}

pub(crate) fn require_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(value >= 0.0) || !value.is_finite() {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}

pub(crate) fn require_open_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ConfigError> {
    if !(value > min && value < max) {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
