//! Error type for the sky systems.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkyError {
    /// A configuration value would produce degenerate or non-finite output.
    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
    /// The detailed cloud model could not be loaded; procedural puffs stay in use.
    #[error("cloud model unavailable: {0}")]
    Asset(String),
}

pub type Result<T> = std::result::Result<T, SkyError>;

/// Fail with `InvalidConfig` unless `ok` holds.
pub(crate) fn ensure(ok: bool, field: &'static str, reason: impl Into<String>) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(SkyError::InvalidConfig {
            field,
            reason: reason.into(),
        })
    }
}

/// Finite and strictly positive.
pub(crate) fn ensure_positive(value: f32, field: &'static str) -> Result<()> {
    ensure(value.is_finite() && value > 0.0, field, format!("must be finite and > 0 (got {})", value))
}

/// `min <= max`, both finite.
pub(crate) fn ensure_range(min: f32, max: f32, field: &'static str) -> Result<()> {
    ensure(
        min.is_finite() && max.is_finite() && min <= max,
        field,
        format!("expected finite min <= max (got {}..{})", min, max),
    )
}
