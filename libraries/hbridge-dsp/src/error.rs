//! Error types for DSP configuration

use thiserror::Error;

/// Result type for DSP operations
pub type Result<T> = std::result::Result<T, DspError>;

/// Errors raised while validating DSP settings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DspError {
    /// Short pulse fraction outside (0, 1]
    #[error("Invalid short pulse fraction: {numerator}/{denominator} (must be in (0, 1])")]
    InvalidShortPulse { numerator: i32, denominator: i32 },

    /// Dither offset would not fit the interpolation domain
    #[error("Invalid dither MSB: {0} (must be 0-30)")]
    InvalidDitherMsb(u32),
}
