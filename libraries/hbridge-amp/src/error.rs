//! Error types for the amplifier core

use hbridge_dsp::DspError;
use thiserror::Error;

/// Result type alias using `AmpError`
pub type Result<T> = std::result::Result<T, AmpError>;

/// Amplifier errors
///
/// Buffer backpressure and underruns are not errors; they surface as
/// partial counts and [`crate::StepOutcome`] values.
#[derive(Error, Debug)]
pub enum AmpError {
    /// Sample rate the renderer cannot latch
    #[error("Unsupported sample rate: {0} Hz (supported: 44100, 48000, 96000)")]
    UnsupportedSampleRate(u32),

    /// Invalid amplifier configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid modulator configuration
    #[error(transparent)]
    Dsp(#[from] DspError),

    /// Fatal hardware initialization failure
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// The render thread panicked instead of returning
    #[error("Renderer thread panicked")]
    RendererPanicked,

    /// Render thread could not be spawned
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures reported by hardware collaborators during initialization
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HardwareError {
    /// Bridge driver program could not be loaded into the output peripheral
    #[error("Bridge program load failed: {0}")]
    BridgeProgramLoad(String),

    /// Random bit source could not be set up
    #[error("Dither source unavailable: {0}")]
    DitherSource(String),
}
