//! 4th-order CIFF delta-sigma modulator
//!
//! Converts PCM samples (already scaled into the modulator domain, see
//! [`crate::scale`]) into two-level bridge symbols at 16x or 32x the input
//! rate, using linear interpolation between consecutive samples.
//!
//! Loop filter coefficients:
//!
//! ```text
//! a = [1, 1/4, 1/16, 1/256]   feed-forward to the quantizer
//! b = [1, 0, 0, 0, 1]         input to first integrator and quantizer
//! c = [1, 1, 1, 1]            integrator cascade
//! g = [1/1024, 1/128]         resonator feedback
//! ```
//!
//! The integrators are plain wrapping `i32`s. Overload protection is the
//! caller's job: inputs must stay within ~71% of the 24-bit range, otherwise
//! the last integrator wraps.

use super::codeword::{Codeword, Symbol, SYMBOLS_PER_WORD};
use super::metrics::IntegratorMetrics;
use crate::error::{DspError, Result};
use serde::{Deserialize, Serialize};

/// Quantizer feedback for a symbol that repeats the previous one
pub const FULL_SCALE: i32 = 0x7FFF << 8;

/// Quantizer decision threshold
const ZERO_THRESHOLD: i32 = 0;

/// Modulator tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulatorConfig {
    /// Short pulse feedback as a fraction of [`FULL_SCALE`]
    ///
    /// Every polarity change loses energy to bridge dead time, so the
    /// quantizer feeds back a reduced value on transitions. 21/25 was tuned
    /// empirically on the reference bridge.
    pub short_pulse_numerator: i32,
    pub short_pulse_denominator: i32,

    /// Perturb the interpolation start point with random bits
    pub dither: bool,

    /// Most significant bit of the dither offset (offset range is
    /// `-2^msb..2^msb`)
    pub dither_msb: u32,
}

impl Default for ModulatorConfig {
    fn default() -> Self {
        Self {
            short_pulse_numerator: 21,
            short_pulse_denominator: 25,
            dither: true,
            dither_msb: 6,
        }
    }
}

impl ModulatorConfig {
    /// Quantizer feedback magnitude used on a polarity transition
    pub fn short_pulse(&self) -> i32 {
        (i64::from(FULL_SCALE) * i64::from(self.short_pulse_numerator)
            / i64::from(self.short_pulse_denominator)) as i32
    }

    pub fn validate(&self) -> Result<()> {
        if self.short_pulse_denominator <= 0
            || self.short_pulse_numerator <= 0
            || self.short_pulse_numerator > self.short_pulse_denominator
        {
            return Err(DspError::InvalidShortPulse {
                numerator: self.short_pulse_numerator,
                denominator: self.short_pulse_denominator,
            });
        }

        if self.dither_msb > 30 {
            return Err(DspError::InvalidDitherMsb(self.dither_msb));
        }

        Ok(())
    }
}

/// Result of a single oversampled evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Loop filter output before quantization
    pub quantizer_input: i32,
    /// Emitted symbol
    pub symbol: Symbol,
    /// Value subtracted from the first integrator
    pub feedback: i32,
}

/// Delta-sigma modulator state for one channel
#[derive(Debug, Clone)]
pub struct Modulator {
    config: ModulatorConfig,
    short_pulse: i32,
    integrators: [i32; 4],
    /// Interpolation start point for the next call
    prev_sample: i32,
    /// `None` after reset, so the first decision is always a transition
    prev_symbol: Option<Symbol>,
    metrics: Option<IntegratorMetrics>,
}

impl Modulator {
    pub fn new(config: ModulatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, None))
    }

    /// Like [`Modulator::new`], additionally recording loop filter extremes
    pub fn with_metrics(config: ModulatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, Some(IntegratorMetrics::default())))
    }

    fn build(config: ModulatorConfig, metrics: Option<IntegratorMetrics>) -> Self {
        Self {
            short_pulse: config.short_pulse(),
            config,
            integrators: [0; 4],
            prev_sample: 0,
            prev_symbol: None,
            metrics,
        }
    }

    /// Zero all loop state. Recorded metrics are kept.
    pub fn reset(&mut self) {
        self.integrators = [0; 4];
        self.prev_sample = 0;
        self.prev_symbol = None;
    }

    pub fn config(&self) -> &ModulatorConfig {
        &self.config
    }

    pub fn integrators(&self) -> [i32; 4] {
        self.integrators
    }

    /// Sample the next call interpolates from
    pub fn carry_sample(&self) -> i32 {
        self.prev_sample
    }

    pub fn previous_symbol(&self) -> Option<Symbol> {
        self.prev_symbol
    }

    /// Extremes seen so far; `None` unless built [`Modulator::with_metrics`]
    pub fn metrics(&self) -> Option<&IntegratorMetrics> {
        self.metrics.as_ref()
    }

    pub fn clear_metrics(&mut self) {
        if let Some(metrics) = &mut self.metrics {
            *metrics = IntegratorMetrics::default();
        }
    }

    /// Run one oversampled step of the loop filter
    #[inline]
    pub fn step(&mut self, input: i32) -> Decision {
        let [i0, i1, i2, i3] = self.integrators;

        let quantizer_input = i0
            .wrapping_add(i1 >> 2)
            .wrapping_add(i2 >> 4)
            .wrapping_add(i3 >> 8)
            .wrapping_add(input);

        let symbol = if quantizer_input > ZERO_THRESHOLD {
            Symbol::Positive
        } else {
            Symbol::Negative
        };

        let magnitude = if self.prev_symbol == Some(symbol) {
            FULL_SCALE
        } else {
            self.short_pulse
        };
        let feedback = symbol.level() * magnitude;

        self.prev_symbol = Some(symbol);

        let i0 = i0
            .wrapping_add(input)
            .wrapping_sub(feedback)
            .wrapping_sub(i1 >> 10);
        let i1 = i1.wrapping_add(i0);
        let i2 = i2.wrapping_add(i1).wrapping_sub(i2 >> 7);
        let i3 = i3.wrapping_add(i2);
        self.integrators = [i0, i1, i2, i3];

        if let Some(metrics) = &mut self.metrics {
            metrics.record(quantizer_input, &self.integrators);
        }

        Decision {
            quantizer_input,
            symbol,
            feedback,
        }
    }

    /// Modulate one PCM sample at 32x
    ///
    /// Interpolates from the carried-over sample to `sample` in 32 steps.
    /// The top half of `dither` offsets the first 16 steps, the bottom half
    /// the last 16.
    pub fn process_x32(&mut self, sample: i32, dither: u32) -> Codeword {
        let (first_offset, second_offset) = self.dither_offsets(dither);

        let mut point = self.prev_sample.wrapping_add(first_offset);
        let increment = sample.wrapping_sub(point) >> 5;
        self.prev_sample = sample;

        let high = self.run_word(&mut point, increment);
        point = point.wrapping_add(second_offset.wrapping_sub(first_offset));
        let low = self.run_word(&mut point, increment);

        Codeword { high, low }
    }

    /// Modulate two consecutive PCM samples at 16x each
    ///
    /// Used at high input rates so the bridge symbol rate stays the same as
    /// with [`Modulator::process_x32`].
    pub fn process_x16(&mut self, first: i32, second: i32, dither: u32) -> Codeword {
        let (first_offset, second_offset) = self.dither_offsets(dither);

        let mut point = self.prev_sample.wrapping_add(first_offset);
        let increment = first.wrapping_sub(point) >> 4;
        self.prev_sample = second;

        let high = self.run_word(&mut point, increment);

        let mut point = first.wrapping_add(second_offset);
        let increment = second.wrapping_sub(point) >> 4;
        let low = self.run_word(&mut point, increment);

        Codeword { high, low }
    }

    /// Produce one 16-symbol bridge word, advancing the interpolation point
    #[inline]
    fn run_word(&mut self, point: &mut i32, increment: i32) -> u32 {
        let mut word = 0u32;
        for _ in 0..SYMBOLS_PER_WORD {
            word = (word << 2) | self.step(*point).symbol.bits();
            *point = point.wrapping_add(increment);
        }
        word
    }

    fn dither_offsets(&self, bits: u32) -> (i32, i32) {
        if !self.config.dither {
            return (0, 0);
        }

        let shift = 31 - self.config.dither_msb;
        ((bits as i32) >> shift, ((bits << 16) as i32) >> shift)
    }
}

impl Default for Modulator {
    fn default() -> Self {
        Self::build(ModulatorConfig::default(), None)
    }
}
