//! Test signal generation and bridge output analysis

use crate::config::{SignalSettings, Waveform};
use hbridge_amp::{BridgeFrame, SampleFormat};
use hbridge_dsp::dsm::{word_symbols, FULL_SCALE, SYMBOLS_PER_WORD};
use hbridge_dsp::scale;
use std::f64::consts::PI;

/// Generate stereo 16-bit frames for the configured signal
pub fn generate(settings: &SignalSettings) -> Vec<(i16, i16)> {
    let frames = (u64::from(settings.sample_rate) * settings.duration_ms / 1000) as usize;
    let amplitude = settings.level * f64::from(i16::MAX);

    (0..frames)
        .map(|n| match settings.waveform {
            Waveform::Silence => (0, 0),
            Waveform::Sine => {
                let t = n as f64 / f64::from(settings.sample_rate);
                let sample = ((2.0 * PI * settings.frequency_hz * t).sin() * amplitude).round() as i16;
                (sample, sample)
            }
        })
        .collect()
}

/// Serialize frames in the wire layout of `format`
pub fn encode(frames: &[(i16, i16)], format: SampleFormat) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(frames.len() * format.bytes_per_frame());

    for &(left, right) in frames {
        match format {
            SampleFormat::Pcm16 => {
                bytes.extend_from_slice(&left.to_le_bytes());
                bytes.extend_from_slice(&right.to_le_bytes());
            }
            SampleFormat::Pcm24 => {
                for sample in [left, right] {
                    let container = scale::widen_16(sample) as u32 & 0x00FF_FFFF;
                    bytes.extend_from_slice(&container.to_le_bytes());
                }
            }
        }
    }

    bytes
}

/// Mean symbol level of one bridge word (-1.0..=1.0)
///
/// Illegal symbols count as zero.
pub fn word_level(word: u32) -> f64 {
    let sum: i32 = word_symbols(word).map(|s| s.map_or(0, |s| s.level())).sum();
    f64::from(sum) / SYMBOLS_PER_WORD as f64
}

/// Decode delivered words into one level per modulator call
///
/// Calls emit two consecutive words per channel; a trailing odd word is
/// dropped.
pub fn decode(frames: &[BridgeFrame], channel: impl Fn(&BridgeFrame) -> u32) -> Vec<f64> {
    frames
        .chunks_exact(2)
        .map(|pair| (word_level(channel(&pair[0])) + word_level(channel(&pair[1]))) / 2.0)
        .collect()
}

/// Input frames expressed on the same scale as [`decode`] output
pub fn reference_levels(frames: &[(i16, i16)], frames_per_call: usize) -> Vec<f64> {
    frames
        .chunks_exact(frames_per_call)
        .map(|call| {
            let sum: f64 = call
                .iter()
                .map(|&(left, _)| f64::from(scale::to_modulator_domain(scale::widen_16(left))))
                .sum();
            sum / frames_per_call as f64 / f64::from(FULL_SCALE)
        })
        .collect()
}

/// Root mean square
pub fn rms(levels: &[f64]) -> f64 {
    if levels.is_empty() {
        return 0.0;
    }
    (levels.iter().map(|x| x * x).sum::<f64>() / levels.len() as f64).sqrt()
}

/// Pearson correlation; 0.0 when either side is constant
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    let (a, b) = (&a[..len], &b[..len]);

    let mean_a = a.iter().sum::<f64>() / len as f64;
    let mean_b = b.iter().sum::<f64>() / len as f64;

    let mut covariance = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        covariance += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }

    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    covariance / (var_a.sqrt() * var_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(waveform: Waveform) -> SignalSettings {
        SignalSettings {
            waveform,
            frequency_hz: 1000.0,
            level: 0.5,
            sample_rate: 48_000,
            duration_ms: 10,
            format: SampleFormat::Pcm16,
            volume_db: 0.0,
            mute: false,
        }
    }

    #[test]
    fn sine_has_expected_length_and_peak() {
        let frames = generate(&settings(Waveform::Sine));
        assert_eq!(frames.len(), 480);

        let peak = frames.iter().map(|&(l, _)| l.unsigned_abs()).max().unwrap();
        assert!((16_000..=16_384).contains(&peak), "peak {peak}");
        assert!(frames.iter().all(|&(l, r)| l == r));
    }

    #[test]
    fn silence_is_zero() {
        let frames = generate(&settings(Waveform::Silence));
        assert!(frames.iter().all(|&f| f == (0, 0)));
    }

    #[test]
    fn encode_layouts() {
        let frames = [(1i16, -1i16)];
        assert_eq!(encode(&frames, SampleFormat::Pcm16), vec![1, 0, 0xFF, 0xFF]);
        assert_eq!(
            encode(&frames, SampleFormat::Pcm24),
            vec![0x00, 0x01, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0x00]
        );
    }

    #[test]
    fn word_level_extremes() {
        // 01 = positive, 10 = negative, 11 = illegal
        assert_eq!(word_level(0x5555_5555), 1.0);
        assert_eq!(word_level(0xAAAA_AAAA), -1.0);
        assert_eq!(word_level(0x9999_9999), 0.0);
        assert_eq!(word_level(0xFFFF_FFFF), 0.0);
    }

    #[test]
    fn correlation_of_identical_series_is_one() {
        let a: Vec<f64> = (0..100).map(|n| f64::from(n).sin()).collect();
        assert!((correlation(&a, &a) - 1.0).abs() < 1e-12);
        assert_eq!(correlation(&a, &[0.0; 100]), 0.0);
    }
}
