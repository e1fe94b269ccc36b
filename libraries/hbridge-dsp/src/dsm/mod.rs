//! Delta-sigma modulation for H-bridge output
//!
//! Turns PCM into a stream of two-bit bridge drive symbols:
//! - 4th-order CIFF loop filter with fixed-point integrators
//! - Linear interpolation to 32x (one sample per call) or 16x (two samples
//!   per call) oversampling
//! - Dither injected into the interpolation start point
//! - Dead-time aware quantizer feedback
//!
//! # Example
//!
//! ```rust
//! use hbridge_dsp::dsm::{Modulator, ModulatorConfig};
//! use hbridge_dsp::scale;
//!
//! let mut modulator = Modulator::new(ModulatorConfig::default()).unwrap();
//!
//! // Half-scale 16-bit input, scaled into the modulator domain
//! let sample = scale::to_modulator_domain(scale::widen_16(16384));
//! let codeword = modulator.process_x32(sample, 0x5EED_1234);
//!
//! assert!(codeword.is_legal());
//! assert!(codeword.balance() > 0);
//! ```

mod codeword;
mod metrics;
mod modulator;

pub use codeword::{word_symbols, BridgeFrame, Codeword, Symbol, SYMBOLS_PER_WORD};
pub use metrics::IntegratorMetrics;
pub use modulator::{Decision, Modulator, ModulatorConfig, FULL_SCALE};
