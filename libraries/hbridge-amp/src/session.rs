//! State shared between the feeding and rendering contexts
//!
//! - [`Session`]: independent atomic control flags written by the control
//!   side and polled once per render iteration.
//! - [`PcmQueue`]: the PCM ring buffer plus the last frame handed to the
//!   renderer, always accessed under one short-lived `Mutex`.
//!
//! Nothing else crosses the context boundary. The output ring buffer and the
//! modulators belong to the renderer alone.

use crate::error::{AmpError, Result};
use hbridge_dsp::RingBuffer;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Sample rates the renderer can latch
pub const SUPPORTED_SAMPLE_RATES: [u32; 3] = [44_100, 48_000, 96_000];

/// Modulator oversampling, latched per enable/flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oversampling {
    /// One PCM frame per modulator call, 32 symbols each
    X32,
    /// Two PCM frames per modulator call, 16 symbols each
    X16,
}

impl Oversampling {
    /// Keep the bridge symbol rate constant across input rates
    pub fn for_sample_rate(sample_rate: u32) -> Self {
        if sample_rate == 96_000 {
            Oversampling::X16
        } else {
            Oversampling::X32
        }
    }

    /// PCM frames consumed by one modulator call
    pub fn frames_per_call(self) -> usize {
        match self {
            Oversampling::X32 => 1,
            Oversampling::X16 => 2,
        }
    }
}

/// Reject rates the renderer cannot latch
pub fn check_sample_rate(sample_rate: u32) -> Result<()> {
    if SUPPORTED_SAMPLE_RATES.contains(&sample_rate) {
        Ok(())
    } else {
        Err(AmpError::UnsupportedSampleRate(sample_rate))
    }
}

/// One stereo frame in the modulator domain (volume applied)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PcmFrame {
    pub left: i32,
    pub right: i32,
}

/// Control flags
///
/// Each flag is atomic on its own; the renderer tolerates seeing changes to
/// different flags one iteration apart.
#[derive(Debug)]
pub struct Session {
    enabled: AtomicBool,
    flush_requested: AtomicBool,
    sample_rate: AtomicU32,
    /// Hosted builds only: ends the render loop so its thread can be joined
    shutdown: AtomicBool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            flush_requested: AtomicBool::new(false),
            sample_rate: AtomicU32::new(48_000),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Publish the rate, then enable. Returns whether it was already enabled.
    pub fn enable(&self, sample_rate: u32) -> bool {
        self.sample_rate.store(sample_rate, Ordering::Release);
        self.enabled.swap(true, Ordering::AcqRel)
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_sample_rate(&self, sample_rate: u32) {
        self.sample_rate.store(sample_rate, Ordering::Release);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Acquire)
    }

    pub fn request_flush(&self) {
        self.flush_requested.store(true, Ordering::Release);
    }

    /// Consume a pending flush request (renderer side)
    pub fn take_flush_request(&self) -> bool {
        self.flush_requested.swap(false, Ordering::AcqRel)
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// PCM ring buffer and its carry-over frame
#[derive(Debug)]
pub struct PcmQueue {
    ring: RingBuffer<PcmFrame>,
    /// Last frame handed to the renderer, replayed on underrun
    last: PcmFrame,
}

impl PcmQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: RingBuffer::new(capacity),
            last: PcmFrame::default(),
        }
    }

    /// Enqueue as many frames as fit
    pub fn push(&mut self, frames: &[PcmFrame]) -> usize {
        self.ring.put(frames)
    }

    /// Fill `out` completely or take nothing
    pub fn take_exact(&mut self, out: &mut [PcmFrame]) -> bool {
        if out.is_empty() || self.ring.filled_slots() < out.len() {
            return false;
        }

        let read = self.ring.get(out);
        debug_assert_eq!(read, out.len());
        self.last = out[read - 1];

        true
    }

    pub fn last(&self) -> PcmFrame {
        self.last
    }

    /// Drop buffered audio and forget the carry-over frame
    pub fn clear(&mut self) {
        self.ring.clear();
        self.last = PcmFrame::default();
    }

    pub fn occupancy(&self) -> usize {
        self.ring.filled_slots()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

/// Everything both contexts touch
#[derive(Debug)]
pub struct Shared {
    session: Session,
    pcm: Mutex<PcmQueue>,
}

impl Shared {
    pub fn new(pcm_capacity: usize) -> Self {
        Self {
            session: Session::new(),
            pcm: Mutex::new(PcmQueue::new(pcm_capacity)),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Lock the PCM queue for one buffer operation. Poisoning is ignored.
    pub fn lock_pcm(&self) -> MutexGuard<'_, PcmQueue> {
        self.pcm.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pcm_occupancy(&self) -> usize {
        self.lock_pcm().occupancy()
    }
}
