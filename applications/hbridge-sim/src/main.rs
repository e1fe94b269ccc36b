//! H-Bridge Simulator - render a test signal through the amplifier core

mod config;
mod signal;
mod simulation;

use clap::{Parser, ValueEnum};
use crate::config::{SimConfig, Waveform};
use hbridge_amp::SampleFormat;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hbridge-sim")]
#[command(about = "Run PCM through the H-bridge amplifier core on simulated hardware", long_about = None)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, env = "HBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Input sample rate in Hz (44100, 48000 or 96000)
    #[arg(short = 'r', long)]
    sample_rate: Option<u32>,

    /// Test signal
    #[arg(short, long, value_enum)]
    waveform: Option<WaveformArg>,

    /// Sine frequency in Hz
    #[arg(short, long)]
    frequency: Option<f64>,

    /// Peak level, fraction of full scale
    #[arg(short, long)]
    level: Option<f64>,

    /// Signal duration in milliseconds
    #[arg(short, long)]
    duration_ms: Option<u64>,

    /// PCM sample layout fed to the amplifier
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Master volume in dB
    #[arg(long, allow_hyphen_values = true)]
    volume_db: Option<f64>,

    /// Master mute
    #[arg(long)]
    mute: bool,

    /// Simulate hardware with only the left bridge wired
    #[arg(long)]
    mono: bool,

    /// Disable dither
    #[arg(long)]
    no_dither: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum WaveformArg {
    Sine,
    Silence,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Pcm16,
    Pcm24,
}

impl Cli {
    /// Command-line flags take precedence over file and environment
    fn apply(&self, config: &mut SimConfig) {
        let signal = &mut config.signal;

        if let Some(rate) = self.sample_rate {
            signal.sample_rate = rate;
        }
        if let Some(waveform) = self.waveform {
            signal.waveform = match waveform {
                WaveformArg::Sine => Waveform::Sine,
                WaveformArg::Silence => Waveform::Silence,
            };
        }
        if let Some(frequency) = self.frequency {
            signal.frequency_hz = frequency;
        }
        if let Some(level) = self.level {
            signal.level = level;
        }
        if let Some(duration) = self.duration_ms {
            signal.duration_ms = duration;
        }
        if let Some(format) = self.format {
            signal.format = match format {
                FormatArg::Pcm16 => SampleFormat::Pcm16,
                FormatArg::Pcm24 => SampleFormat::Pcm24,
            };
        }
        if let Some(volume) = self.volume_db {
            signal.volume_db = volume;
        }
        signal.mute |= self.mute;

        config.hardware.mono |= self.mono;
        if self.no_dither {
            config.amp.modulator.dither = false;
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hbridge_sim=info,hbridge_amp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = SimConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    tracing::info!(
        waveform = ?config.signal.waveform,
        sample_rate = config.signal.sample_rate,
        duration_ms = config.signal.duration_ms,
        "Configuration loaded"
    );

    let report = simulation::run(&config)?;
    println!("{report}");

    Ok(())
}
