//! H-Bridge Amplifier DSP
//!
//! Allocation-free building blocks for turning PCM into H-bridge drive
//! words.
//!
//! This crate provides:
//! - Fixed-capacity ring buffer for cross-context hand-off
//! - 4th-order delta-sigma modulator with 16x/32x interpolating oversampling
//! - Bridge symbol and word encodings
//! - Logarithmic volume table with rational gains
//! - Sample widening and modulator input scaling
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌─────────────┐   ┌────────────┐
//! │ PCM      │──►│ scale +     │──►│ Modulator   │──►│ BridgeFrame│
//! │ 16/24bit │   │ VolumeTable │   │ (per chan.) │   │ words      │
//! └──────────┘   └─────────────┘   └─────────────┘   └────────────┘
//! ```
//!
//! Everything here is pure computation: no I/O, no locking, no allocation
//! after construction.

mod error;
mod ring_buffer;

pub mod dsm;
pub mod scale;
pub mod volume;

pub use dsm::{BridgeFrame, Codeword, IntegratorMetrics, Modulator, ModulatorConfig, Symbol};
pub use error::{DspError, Result};
pub use ring_buffer::RingBuffer;
pub use volume::{Gain, VolumeTable};
