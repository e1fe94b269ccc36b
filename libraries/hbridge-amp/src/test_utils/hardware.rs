//! Simulated output queue, watchdog, dither source and fault indicator

use crate::error::{AmpError, HardwareError};
use crate::hal::{ChannelLayout, DitherSource, FaultIndicator, OutputQueue, Watchdog};
use hbridge_dsp::BridgeFrame;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct QueueState {
    capacity: usize,
    layout: ChannelLayout,
    started: bool,
    fifo: VecDeque<u64>,
    pushed: u64,
    starts: u64,
    stops: u64,
    init_failure: Option<String>,
}

/// Bounded FIFO standing in for the bridge output peripheral
///
/// Nothing leaves the FIFO on its own; call [`SimOutputQueue::clock_out`] to
/// model the bridge consuming words.
#[derive(Debug, Clone)]
pub struct SimOutputQueue {
    state: Arc<Mutex<QueueState>>,
}

impl SimOutputQueue {
    pub fn new(capacity: usize, layout: ChannelLayout) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                capacity,
                layout,
                started: false,
                fifo: VecDeque::with_capacity(capacity),
                pushed: 0,
                starts: 0,
                stops: 0,
                init_failure: None,
            })),
        }
    }

    pub fn stereo(capacity: usize) -> Self {
        Self::new(capacity, ChannelLayout::Stereo)
    }

    pub fn mono(capacity: usize) -> Self {
        Self::new(capacity, ChannelLayout::Mono)
    }

    /// A queue whose bridge program refuses to load
    pub fn failing(reason: &str) -> Self {
        let queue = Self::stereo(8);
        lock(&queue.state).init_failure = Some(reason.to_string());
        queue
    }

    /// Remove up to `count` words in FIFO order, as the bridge would
    pub fn clock_out(&self, count: usize) -> Vec<BridgeFrame> {
        let mut state = lock(&self.state);
        let count = count.min(state.fifo.len());
        state.fifo.drain(..count).map(BridgeFrame::unpack).collect()
    }

    pub fn is_started(&self) -> bool {
        lock(&self.state).started
    }

    /// Words ever accepted
    pub fn total_pushed(&self) -> u64 {
        lock(&self.state).pushed
    }

    pub fn queued(&self) -> usize {
        lock(&self.state).fifo.len()
    }

    pub fn start_count(&self) -> u64 {
        lock(&self.state).starts
    }

    pub fn stop_count(&self) -> u64 {
        lock(&self.state).stops
    }
}

impl OutputQueue for SimOutputQueue {
    fn init(&mut self) -> Result<(), HardwareError> {
        match &lock(&self.state).init_failure {
            Some(reason) => Err(HardwareError::BridgeProgramLoad(reason.clone())),
            None => Ok(()),
        }
    }

    fn start(&mut self) {
        let mut state = lock(&self.state);
        state.started = true;
        state.starts += 1;
    }

    fn stop(&mut self) {
        let mut state = lock(&self.state);
        state.started = false;
        state.stops += 1;
        state.fifo.clear();
    }

    fn has_room(&self) -> bool {
        let state = lock(&self.state);
        state.fifo.len() < state.capacity
    }

    fn depth(&self) -> usize {
        lock(&self.state).fifo.len()
    }

    fn push(&mut self, word: u64) {
        let mut state = lock(&self.state);
        assert!(state.fifo.len() < state.capacity, "push into a full output queue");
        state.fifo.push_back(word);
        state.pushed += 1;
    }

    fn layout(&self) -> ChannelLayout {
        lock(&self.state).layout
    }
}

/// Watchdog that counts pets
#[derive(Debug, Clone, Default)]
pub struct SimWatchdog {
    pets: Arc<AtomicU64>,
    armed: Arc<Mutex<Option<Duration>>>,
}

impl SimWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pets(&self) -> u64 {
        self.pets.load(Ordering::Relaxed)
    }

    /// Timeout passed to the last `arm`
    pub fn armed(&self) -> Option<Duration> {
        *lock(&self.armed)
    }
}

impl Watchdog for SimWatchdog {
    fn arm(&mut self, timeout: Duration) {
        *lock(&self.armed) = Some(timeout);
    }

    fn pet(&mut self) {
        self.pets.fetch_add(1, Ordering::Relaxed);
    }
}

/// Reproducible dither bits
#[derive(Debug, Clone)]
pub struct SeededDither {
    rng: StdRng,
    init_failure: Option<String>,
}

impl SeededDither {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            init_failure: None,
        }
    }

    /// A source whose hardware never comes up
    pub fn failing(reason: &str) -> Self {
        Self {
            init_failure: Some(reason.to_string()),
            ..Self::new(0)
        }
    }
}

impl DitherSource for SeededDither {
    fn init(&mut self) -> Result<(), HardwareError> {
        match &self.init_failure {
            Some(reason) => Err(HardwareError::DitherSource(reason.clone())),
            None => Ok(()),
        }
    }

    fn next_random_word(&mut self) -> u32 {
        self.rng.gen()
    }
}

/// Records the first fault raised
#[derive(Debug, Clone, Default)]
pub struct FaultLatch {
    fault: Arc<Mutex<Option<String>>>,
}

impl FaultLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Message of the latched fault, if any
    pub fn raised(&self) -> Option<String> {
        lock(&self.fault).clone()
    }
}

impl FaultIndicator for FaultLatch {
    fn raise(&mut self, error: &AmpError) {
        lock(&self.fault).get_or_insert_with(|| error.to_string());
    }
}
