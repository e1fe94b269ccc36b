//! Simulator configuration

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::ConfigBuilder;
use hbridge_amp::{AmpConfig, SampleFormat, SUPPORTED_SAMPLE_RATES};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimConfig {
    #[serde(default)]
    pub amp: AmpConfig,

    #[serde(default = "default_signal")]
    pub signal: SignalSettings,

    #[serde(default = "default_hardware")]
    pub hardware: HardwareSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalSettings {
    #[serde(default = "default_waveform")]
    pub waveform: Waveform,

    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f64,

    /// Peak level as a fraction of 16-bit full scale
    #[serde(default = "default_level")]
    pub level: f64,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,

    #[serde(default = "default_format")]
    pub format: SampleFormat,

    /// Master volume in dB (0 = unity)
    #[serde(default)]
    pub volume_db: f64,

    #[serde(default)]
    pub mute: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HardwareSettings {
    /// Output FIFO depth in words
    #[serde(default = "default_fifo_depth")]
    pub fifo_depth: usize,

    /// Drive only the left bridge
    #[serde(default)]
    pub mono: bool,

    #[serde(default = "default_dither_seed")]
    pub dither_seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Silence,
}

impl SimConfig {
    /// Load configuration from an optional TOML file and the environment
    ///
    /// Environment variables are prefixed with `HBRIDGE_` and use `__` between
    /// sections, e.g. `HBRIDGE_SIGNAL__SAMPLE_RATE=96000`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            settings = settings.add_source(config::File::from(path));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("HBRIDGE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Self::from_builder(settings)
    }

    pub fn from_builder(settings: ConfigBuilder<DefaultState>) -> Result<Self> {
        settings
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.amp.validate()?;

        let signal = &self.signal;
        if !SUPPORTED_SAMPLE_RATES.contains(&signal.sample_rate) {
            anyhow::bail!(
                "Sample rate {} Hz not supported (expected one of {:?})",
                signal.sample_rate,
                SUPPORTED_SAMPLE_RATES
            );
        }

        if !(0.0..=1.0).contains(&signal.level) {
            anyhow::bail!("Signal level must be within 0.0..=1.0 (got {})", signal.level);
        }

        if signal.frequency_hz <= 0.0 || signal.frequency_hz >= f64::from(signal.sample_rate) / 2.0 {
            anyhow::bail!(
                "Frequency {} Hz must be between 0 and Nyquist ({} Hz)",
                signal.frequency_hz,
                signal.sample_rate / 2
            );
        }

        if signal.duration_ms == 0 {
            anyhow::bail!("Duration must be non-zero");
        }

        if self.hardware.fifo_depth == 0 {
            anyhow::bail!("Hardware FIFO depth must be at least 1");
        }

        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            amp: AmpConfig::default(),
            signal: default_signal(),
            hardware: default_hardware(),
        }
    }
}

// Default values
fn default_signal() -> SignalSettings {
    SignalSettings {
        waveform: default_waveform(),
        frequency_hz: default_frequency_hz(),
        level: default_level(),
        sample_rate: default_sample_rate(),
        duration_ms: default_duration_ms(),
        format: default_format(),
        volume_db: 0.0,
        mute: false,
    }
}

fn default_waveform() -> Waveform {
    Waveform::Sine
}

fn default_frequency_hz() -> f64 {
    1000.0
}

fn default_level() -> f64 {
    0.5
}

fn default_sample_rate() -> u32 {
    48_000
}

fn default_duration_ms() -> u64 {
    250
}

fn default_format() -> SampleFormat {
    SampleFormat::Pcm16
}

fn default_hardware() -> HardwareSettings {
    HardwareSettings {
        fifo_depth: default_fifo_depth(),
        mono: false,
        dither_seed: default_dither_seed(),
    }
}

fn default_fifo_depth() -> usize {
    8
}

fn default_dither_seed() -> u64 {
    0x5EED
}
