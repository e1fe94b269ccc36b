//! Hardware collaborator traits
//!
//! The render loop talks to the outside world only through these seams:
//! the bridge output queue, the watchdog, the random-bit source and a fault
//! indicator. Platform crates implement them; `test_utils` provides
//! simulated versions.

use crate::error::{AmpError, HardwareError};
use std::time::Duration;

/// Bridge channels the output hardware drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    /// Left bridge only; right words are zero and the right modulator idles
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn is_stereo(self) -> bool {
        self == ChannelLayout::Stereo
    }
}

/// Shallow hardware FIFO feeding the bridge
///
/// Words are [`hbridge_dsp::BridgeFrame::pack`]ed: left channel in the low 32
/// bits, right channel in the high 32 bits.
pub trait OutputQueue: Send {
    /// Load the bridge driver. Failure is fatal for the renderer.
    fn init(&mut self) -> Result<(), HardwareError> {
        Ok(())
    }

    /// Begin clocking words out to the bridge
    fn start(&mut self);

    /// Stop clocking and leave the bridge undriven
    fn stop(&mut self);

    /// `true` if at least one more word fits
    fn has_room(&self) -> bool;

    /// Words currently queued
    fn depth(&self) -> usize;

    /// Queue one packed word. Only called when [`OutputQueue::has_room`].
    fn push(&mut self, word: u64);

    /// Capability flag: which bridges are wired
    fn layout(&self) -> ChannelLayout;
}

/// Hardware watchdog; a stalled renderer stops petting it and the board resets
pub trait Watchdog: Send {
    fn arm(&mut self, timeout: Duration);

    fn pet(&mut self);
}

/// Uniformly distributed random words for dither
pub trait DitherSource: Send {
    fn init(&mut self) -> Result<(), HardwareError> {
        Ok(())
    }

    /// Next 32 random bits. May block briefly until bits are available.
    fn next_random_word(&mut self) -> u32;
}

/// Persistent, user-visible fault signal (an LED on the reference board)
pub trait FaultIndicator: Send {
    fn raise(&mut self, error: &AmpError);
}

/// No fault indicator wired
impl FaultIndicator for () {
    fn raise(&mut self, _error: &AmpError) {}
}

/// The collaborators one renderer owns
#[derive(Debug)]
pub struct Peripherals<Q, W, D, F = ()> {
    pub queue: Q,
    pub watchdog: W,
    pub dither: D,
    pub fault: F,
}

impl<Q, W, D> Peripherals<Q, W, D> {
    /// Peripherals without a fault indicator
    pub fn new(queue: Q, watchdog: W, dither: D) -> Self {
        Self {
            queue,
            watchdog,
            dither,
            fault: (),
        }
    }
}

impl<Q, W, D, F> Peripherals<Q, W, D, F> {
    pub fn with_fault_indicator<G>(self, fault: G) -> Peripherals<Q, W, D, G> {
        Peripherals {
            queue: self.queue,
            watchdog: self.watchdog,
            dither: self.dither,
            fault,
        }
    }
}
