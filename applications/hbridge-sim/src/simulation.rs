//! One simulated playback run
//!
//! Feeds the configured signal through [`Amplifier`], runs the renderer on its
//! own thread against simulated hardware, and plays the bridge by clocking
//! words out of the output queue as fast as they appear.

use crate::config::SimConfig;
use crate::signal;
use anyhow::{bail, Result};
use hbridge_amp::test_utils::{FaultLatch, SeededDither, SimOutputQueue, SimWatchdog};
use hbridge_amp::{
    Amplifier, BridgeFrame, ChannelLayout, Oversampling, Peripherals, RenderStats,
};
use hbridge_dsp::volume::VOLUME_PER_DB;
use hbridge_dsp::IntegratorMetrics;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Give up if the bridge sees no progress for this long
const STALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a run
#[derive(Debug, Clone)]
pub struct Report {
    pub sample_rate: u32,
    pub oversampling: Oversampling,
    pub frames_fed: usize,
    pub words_delivered: usize,
    /// RMS of the left input, modulator full scale = 1.0
    pub input_rms: f64,
    pub left_rms: f64,
    pub right_rms: f64,
    /// Input vs decoded left output
    pub correlation: f64,
    pub stats: RenderStats,
    /// Loop filter extremes over both channels
    pub headroom: IntegratorMetrics,
    pub elapsed: Duration,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sample rate:      {} Hz ({:?})", self.sample_rate, self.oversampling)?;
        writeln!(f, "Frames fed:       {}", self.frames_fed)?;
        writeln!(f, "Words delivered:  {}", self.words_delivered)?;
        writeln!(f, "Input RMS:        {:.4}", self.input_rms)?;
        writeln!(f, "Output RMS (L/R): {:.4} / {:.4}", self.left_rms, self.right_rms)?;
        writeln!(f, "Correlation:      {:.4}", self.correlation)?;
        writeln!(
            f,
            "Renderer:         {} consumed, {} repeats, {} skipped, {} backpressure",
            self.stats.frames_consumed, self.stats.repeats, self.stats.skipped, self.stats.backpressure
        )?;
        let peaks = self.headroom.integrator_peaks();
        writeln!(
            f,
            "Integrator peaks: {:.3} {:.3} {:.3} {:.3} (quantizer {:.3}) of i32 range",
            peaks[0],
            peaks[1],
            peaks[2],
            peaks[3],
            self.headroom.quantizer_peak()
        )?;
        write!(f, "Elapsed:          {:.1?}", self.elapsed)
    }
}

/// Master volume in 1/256 dB
fn volume_units(db: f64) -> i16 {
    (db * f64::from(VOLUME_PER_DB))
        .round()
        .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

pub fn run(config: &SimConfig) -> Result<Report> {
    let settings = &config.signal;
    let hardware = &config.hardware;

    let mut amp_config = config.amp.clone();
    amp_config.integrator_metrics = true;
    let amp = Amplifier::new(amp_config)?;
    let layout = if hardware.mono {
        ChannelLayout::Mono
    } else {
        ChannelLayout::Stereo
    };
    let queue = SimOutputQueue::new(hardware.fifo_depth, layout);
    let watchdog = SimWatchdog::new();
    let fault = FaultLatch::new();

    let frames = signal::generate(settings);
    let pcm = signal::encode(&frames, settings.format);
    let bytes_per_frame = settings.format.bytes_per_frame();
    let volume = [volume_units(settings.volume_db), 0, 0];
    let mute = [settings.mute, false, false];

    let oversampling = Oversampling::for_sample_rate(settings.sample_rate);
    let expected_words = frames.len() / oversampling.frames_per_call() * 2;
    info!(
        frames = frames.len(),
        sample_rate = settings.sample_rate,
        ?oversampling,
        "Starting simulation"
    );

    amp.start(settings.sample_rate)?;
    // prefill so the renderer never starts on an empty queue
    let mut offset = amp.put_frames(&pcm, settings.format, volume, mute) * bytes_per_frame;

    let render = amp.spawn_renderer(
        Peripherals::new(
            queue.clone(),
            watchdog.clone(),
            SeededDither::new(hardware.dither_seed),
        )
        .with_fault_indicator(fault.clone()),
    )?;

    let started = Instant::now();
    let mut last_progress = Instant::now();
    let mut delivered: Vec<BridgeFrame> = Vec::with_capacity(expected_words);
    let mut stalled = false;

    while delivered.len() < expected_words {
        if offset < pcm.len() {
            offset += amp.put_frames(&pcm[offset..], settings.format, volume, mute) * bytes_per_frame;
        }

        let words = queue.clock_out(expected_words - delivered.len());
        if words.is_empty() {
            if render.is_finished() {
                break;
            }
            if last_progress.elapsed() > STALL_TIMEOUT {
                stalled = true;
                break;
            }
            thread::yield_now();
        } else {
            delivered.extend(words);
            last_progress = Instant::now();
        }
    }

    amp.stop();
    let renderer = render.join()?;
    let elapsed = started.elapsed();

    if stalled {
        warn!(delivered = delivered.len(), expected_words, "Bridge output stalled");
        bail!("Renderer stalled after {} of {} words", delivered.len(), expected_words);
    }
    if let Some(fault) = fault.raised() {
        bail!("Renderer raised a fault: {}", fault);
    }

    let stats = renderer.stats();
    debug!(?stats, pets = watchdog.pets(), "Renderer finished");

    let mut headroom = IntegratorMetrics::default();
    if let Some([left, right]) = renderer.integrator_metrics() {
        headroom.merge(&left);
        headroom.merge(&right);
    }
    if headroom.integrator_peaks()[3] > 0.9 {
        warn!(peaks = ?headroom.integrator_peaks(), "Last integrator close to wrapping");
    }

    let reference = signal::reference_levels(&frames, oversampling.frames_per_call());
    let left = signal::decode(&delivered, |f| f.left);
    let right = signal::decode(&delivered, |f| f.right);

    Ok(Report {
        sample_rate: settings.sample_rate,
        oversampling,
        frames_fed: offset / bytes_per_frame,
        words_delivered: delivered.len(),
        input_rms: signal::rms(&reference),
        left_rms: signal::rms(&left),
        right_rms: signal::rms(&right),
        correlation: signal::correlation(&reference, &left),
        stats,
        headroom,
        elapsed,
    })
}
