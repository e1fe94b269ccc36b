//! Amplifier configuration

use crate::error::{AmpError, Result};
use hbridge_dsp::ModulatorConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Buffer sizing, queue policy and modulator tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmpConfig {
    /// PCM ring buffer capacity in stereo frames
    #[serde(default = "default_pcm_buffer_frames")]
    pub pcm_buffer_frames: usize,

    /// Output ring buffer capacity in bridge frames
    ///
    /// Each modulator call produces two frames, so this must be even.
    #[serde(default = "default_output_buffer_frames")]
    pub output_buffer_frames: usize,

    /// Stop feeding the hardware queue once it holds this many words
    #[serde(default = "default_queue_watermark")]
    pub queue_watermark: usize,

    /// Watchdog timeout armed when the renderer starts
    #[serde(default = "default_watchdog_timeout_ms")]
    pub watchdog_timeout_ms: u64,

    #[serde(default)]
    pub modulator: ModulatorConfig,

    /// Record loop filter extremes in both modulators (diagnostics)
    #[serde(default)]
    pub integrator_metrics: bool,
}

impl AmpConfig {
    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pcm_buffer_frames < 2 {
            return Err(AmpError::InvalidConfig(format!(
                "pcm_buffer_frames must be at least 2 (got {})",
                self.pcm_buffer_frames
            )));
        }

        if self.output_buffer_frames < 2 || self.output_buffer_frames % 2 != 0 {
            return Err(AmpError::InvalidConfig(format!(
                "output_buffer_frames must be even and at least 2 (got {})",
                self.output_buffer_frames
            )));
        }

        if self.queue_watermark == 0 {
            return Err(AmpError::InvalidConfig(
                "queue_watermark must be at least 1".to_string(),
            ));
        }

        if self.watchdog_timeout_ms == 0 {
            return Err(AmpError::InvalidConfig(
                "watchdog_timeout_ms must be non-zero".to_string(),
            ));
        }

        self.modulator.validate()?;

        Ok(())
    }
}

impl Default for AmpConfig {
    fn default() -> Self {
        Self {
            pcm_buffer_frames: default_pcm_buffer_frames(),
            output_buffer_frames: default_output_buffer_frames(),
            queue_watermark: default_queue_watermark(),
            watchdog_timeout_ms: default_watchdog_timeout_ms(),
            modulator: ModulatorConfig::default(),
            integrator_metrics: false,
        }
    }
}

// Default values
fn default_pcm_buffer_frames() -> usize {
    8192
}

fn default_output_buffer_frames() -> usize {
    32
}

fn default_queue_watermark() -> usize {
    6
}

fn default_watchdog_timeout_ms() -> u64 {
    100
}
