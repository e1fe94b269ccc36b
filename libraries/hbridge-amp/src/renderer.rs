//! Render loop
//!
//! Owns both modulators and the output ring buffer. Each iteration polls the
//! session flags once, then drains, produces or backs off. The loop never
//! blocks on the feeding side beyond one short PCM queue lock.
//!
//! ```text
//!            enable                    output ring full
//! Disabled ─────────► Refilling ───────────────────────► Steady
//!    ▲                  ▲   │                              │
//!    │      disable     │   └───────── flush ◄─────────────┤
//!    └──────────────────┴──────────────────────────────────┘
//! ```

use crate::config::AmpConfig;
use crate::error::Result;
use crate::hal::{DitherSource, FaultIndicator, OutputQueue, Peripherals, Watchdog};
use crate::session::{Oversampling, PcmFrame, Shared};
use hbridge_dsp::{BridgeFrame, Codeword, IntegratorMetrics, Modulator, ModulatorConfig, RingBuffer};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Bridge frames produced by one modulator call
const FRAMES_PER_CALL: usize = 2;

/// Renderer state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// Output queue stopped, nothing consumed
    Disabled,
    /// Building a cushion in the output ring; nothing is released to hardware
    Refilling,
    /// Releasing words to hardware while keeping the ring topped up
    Steady,
}

/// What one iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Disabled; only the watchdog was serviced
    Idle,
    /// Output ring full, production deferred
    Backpressure,
    /// No PCM and nothing buffered to protect; production skipped
    Skipped,
    /// Fresh PCM modulated
    Produced,
    /// PCM ran dry; the last frame was modulated again
    Repeated,
}

/// Counters for health and debug indicators
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// PCM frames taken from the shared queue
    pub frames_consumed: u64,
    /// Modulator calls fed from fresh PCM
    pub produced: u64,
    /// Modulator calls fed from the repeated last frame
    pub repeats: u64,
    /// Iterations that skipped production for lack of PCM
    pub skipped: u64,
    /// Iterations that deferred production because the output ring was full
    pub backpressure: u64,
    /// Words pushed to the output queue
    pub words_delivered: u64,
}

/// The rendering context
pub struct Renderer<Q, W, D, F = ()> {
    shared: Arc<Shared>,
    config: AmpConfig,
    peripherals: Peripherals<Q, W, D, F>,
    left: Modulator,
    right: Modulator,
    output: RingBuffer<BridgeFrame>,
    state: RenderState,
    mode: Oversampling,
    stats: RenderStats,
}

impl<Q, W, D, F> Renderer<Q, W, D, F>
where
    Q: OutputQueue,
    W: Watchdog,
    D: DitherSource,
    F: FaultIndicator,
{
    /// Build a renderer over shared state
    pub fn new(shared: Arc<Shared>, config: AmpConfig, peripherals: Peripherals<Q, W, D, F>) -> Result<Self> {
        config.validate()?;

        let build: fn(ModulatorConfig) -> hbridge_dsp::Result<Modulator> = if config.integrator_metrics {
            Modulator::with_metrics
        } else {
            Modulator::new
        };

        Ok(Self {
            shared,
            left: build(config.modulator)?,
            right: build(config.modulator)?,
            output: RingBuffer::new(config.output_buffer_frames),
            peripherals,
            config,
            state: RenderState::Disabled,
            mode: Oversampling::X32,
            stats: RenderStats::default(),
        })
    }

    /// Initialize hardware, then loop until the host requests shutdown
    ///
    /// Initialization failure is fatal: the fault indicator is raised and the
    /// error returned without entering the loop.
    pub fn run(&mut self) -> Result<()> {
        if let Err(e) = self.init_hardware() {
            error!("Renderer hardware initialization failed: {}", e);
            self.peripherals.fault.raise(&e);
            return Err(e);
        }

        self.peripherals.watchdog.arm(self.config.watchdog_timeout());
        info!(
            timeout_ms = self.config.watchdog_timeout_ms,
            "Renderer running"
        );

        while !self.shared.session().is_shutdown() {
            self.step();
        }

        if self.state != RenderState::Disabled {
            self.peripherals.queue.stop();
            self.state = RenderState::Disabled;
        }
        info!(stats = ?self.stats, "Renderer stopped");

        Ok(())
    }

    fn init_hardware(&mut self) -> Result<()> {
        self.peripherals.queue.init()?;
        self.peripherals.dither.init()?;
        Ok(())
    }

    /// Run exactly one loop iteration
    pub fn step(&mut self) -> StepOutcome {
        self.apply_control();

        if self.state == RenderState::Disabled {
            self.peripherals.watchdog.pet();
            return StepOutcome::Idle;
        }

        if self.state == RenderState::Refilling && self.output.free_slots() < FRAMES_PER_CALL {
            debug!(frames = self.output.filled_slots(), "Output cushion full, releasing");
            self.state = RenderState::Steady;
        }

        if self.state == RenderState::Steady {
            self.drain();
        }

        if self.output.free_slots() < FRAMES_PER_CALL {
            self.stats.backpressure += 1;
            return StepOutcome::Backpressure;
        }

        let mut pcm = [PcmFrame::default(); 2];
        let pcm = &mut pcm[..self.mode.frames_per_call()];

        let outcome = {
            let mut queue = self.shared.lock_pcm();
            if queue.take_exact(pcm) {
                StepOutcome::Produced
            } else if self.output.is_empty() && self.state == RenderState::Steady {
                StepOutcome::Skipped
            } else {
                pcm.fill(queue.last());
                StepOutcome::Repeated
            }
        };

        match outcome {
            StepOutcome::Skipped => {
                self.stats.skipped += 1;
                return outcome;
            }
            StepOutcome::Produced => {
                self.stats.produced += 1;
                self.stats.frames_consumed += pcm.len() as u64;
            }
            _ => self.stats.repeats += 1,
        }

        let frames = self.modulate(pcm);
        let stored = self.output.put(&frames);
        debug_assert_eq!(stored, FRAMES_PER_CALL);

        if outcome == StepOutcome::Produced {
            self.peripherals.watchdog.pet();
        }

        outcome
    }

    /// Observe the session flags and perform at most one transition
    fn apply_control(&mut self) {
        let enabled = self.shared.session().is_enabled();

        match (self.state, enabled) {
            (RenderState::Disabled, false) => {}
            (RenderState::Disabled, true) => {
                self.shared.session().take_flush_request();
                self.restart();
                self.peripherals.queue.start();
                info!(sample_rate = self.shared.session().sample_rate(), mode = ?self.mode, "Renderer enabled");
            }
            (_, false) => {
                self.peripherals.queue.stop();
                self.state = RenderState::Disabled;
                info!("Renderer disabled");
            }
            (_, true) => {
                if self.shared.session().take_flush_request() {
                    self.restart();
                    info!(sample_rate = self.shared.session().sample_rate(), mode = ?self.mode, "Renderer flushed");
                }
            }
        }
    }

    /// Reset shared by enable and flush
    fn restart(&mut self) {
        self.left.reset();
        self.right.reset();
        self.output.clear();
        self.mode = Oversampling::for_sample_rate(self.shared.session().sample_rate());
        self.state = RenderState::Refilling;
    }

    /// Move buffered frames to hardware, leaving headroom in its FIFO
    fn drain(&mut self) {
        let queue = &mut self.peripherals.queue;
        while queue.has_room() && queue.depth() < self.config.queue_watermark {
            let Some(frame) = self.output.get_one() else {
                break;
            };
            queue.push(frame.pack());
            self.stats.words_delivered += 1;
        }
    }

    fn modulate(&mut self, pcm: &[PcmFrame]) -> [BridgeFrame; FRAMES_PER_CALL] {
        let mode = self.mode;
        let first = pcm[0];
        let second = pcm[pcm.len() - 1];

        let dither = self.peripherals.dither.next_random_word();
        let left = modulate_channel(&mut self.left, mode, first.left, second.left, dither);

        let right = if self.peripherals.queue.layout().is_stereo() {
            let dither = self.peripherals.dither.next_random_word();
            modulate_channel(&mut self.right, mode, first.right, second.right, dither)
        } else {
            Codeword::default()
        };

        BridgeFrame::from_codewords(left, right)
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Oversampling latched at the last enable or flush
    pub fn oversampling(&self) -> Oversampling {
        self.mode
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Left and right loop filter extremes, if enabled in [`AmpConfig`]
    ///
    /// Kept across enable and flush; the right channel stays at zero on
    /// mono hardware.
    pub fn integrator_metrics(&self) -> Option<[IntegratorMetrics; 2]> {
        Some([*self.left.metrics()?, *self.right.metrics()?])
    }

    /// Bridge frames waiting in the output ring
    pub fn buffered_frames(&self) -> usize {
        self.output.filled_slots()
    }

    pub fn peripherals(&self) -> &Peripherals<Q, W, D, F> {
        &self.peripherals
    }

    pub fn peripherals_mut(&mut self) -> &mut Peripherals<Q, W, D, F> {
        &mut self.peripherals
    }

    pub fn into_peripherals(self) -> Peripherals<Q, W, D, F> {
        self.peripherals
    }
}

fn modulate_channel(
    modulator: &mut Modulator,
    mode: Oversampling,
    first: i32,
    second: i32,
    dither: u32,
) -> Codeword {
    match mode {
        Oversampling::X32 => modulator.process_x32(first, dither),
        Oversampling::X16 => modulator.process_x16(first, second, dither),
    }
}
