//! H-Bridge Amplifier Core
//!
//! Real-time rendering of PCM into H-bridge drive words.
//!
//! This crate provides:
//! - [`Amplifier`]: control facade (start, stop, flush, rate changes) and
//!   PCM entry point
//! - [`Ingress`]: 16/24-bit PCM decoding with logarithmic volume and mute
//! - [`Renderer`]: the render loop state machine feeding a shallow hardware
//!   output queue
//! - [`hal`]: the traits hardware collaborators implement
//!
//! # Example
//!
//! ```rust
//! use hbridge_amp::test_utils::{SeededDither, SimOutputQueue, SimWatchdog};
//! use hbridge_amp::{AmpConfig, Amplifier, Peripherals, SampleFormat, StepOutcome};
//!
//! # fn main() -> hbridge_amp::Result<()> {
//! let amp = Amplifier::new(AmpConfig::default())?;
//! let queue = SimOutputQueue::stereo(8);
//! let mut renderer = amp.renderer(Peripherals::new(
//!     queue.clone(),
//!     SimWatchdog::new(),
//!     SeededDither::new(1),
//! ))?;
//!
//! amp.start(48_000)?;
//! let pcm: Vec<u8> = [1000i16, -1000].iter().flat_map(|s| s.to_le_bytes()).collect();
//! assert_eq!(amp.put_frames(&pcm, SampleFormat::Pcm16, [0; 3], [false; 3]), 1);
//!
//! assert_eq!(renderer.step(), StepOutcome::Produced);
//! assert_eq!(amp.pcm_occupancy(), 0);
//! # Ok(())
//! # }
//! ```
//!
//! The render loop itself is [`Renderer::run`]; hosted builds usually start it
//! with [`Amplifier::spawn_renderer`].

mod amplifier;
mod config;
mod error;
mod ingress;
mod renderer;
mod session;

pub mod hal;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use amplifier::{Amplifier, RenderThread};
pub use config::AmpConfig;
pub use error::{AmpError, HardwareError, Result};
pub use hal::{ChannelLayout, DitherSource, FaultIndicator, OutputQueue, Peripherals, Watchdog};
pub use ingress::{Channel, Ingress, SampleFormat, LEFT, MASTER, PUT_CHUNK_FRAMES, RIGHT};
pub use renderer::{RenderState, RenderStats, Renderer, StepOutcome};
pub use session::{Oversampling, PcmFrame, SUPPORTED_SAMPLE_RATES};

pub use hbridge_dsp::{BridgeFrame, ModulatorConfig};
