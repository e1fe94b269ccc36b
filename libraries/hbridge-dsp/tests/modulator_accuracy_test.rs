//! Modulator Accuracy Tests
//!
//! Validates the noise-shaping loop end to end:
//! - Constant inputs average out to the input level (DC accuracy)
//! - Both oversampling modes track DC equally well
//! - A sine wave survives modulation and crude boxcar decoding
//! - Integrators stay well inside `i32` at the rated input level

use hbridge_dsp::dsm::{Codeword, IntegratorMetrics, Modulator, ModulatorConfig, FULL_SCALE};
use hbridge_dsp::scale;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Fraction of 16-bit full scale → modulator input
fn level_to_input(level: f64) -> i32 {
    scale::to_modulator_domain(scale::widen_16((level * f64::from(i16::MAX)) as i16))
}

/// Mean symbol level of a codeword (-1.0..=1.0)
fn decode(codeword: &Codeword) -> f64 {
    f64::from(codeword.balance()) / Codeword::SYMBOLS as f64
}

const LEVELS: [f64; 5] = [0.0, 0.5, -0.5, 0.71, -0.71];
const SETTLE_CALLS: usize = 1_000;
const MEASURE_CALLS: usize = 4_000;
const TOLERANCE: f64 = 0.01;

#[test]
fn dc_accuracy_x32() {
    let mut rng = StdRng::seed_from_u64(0x5EED);

    for level in LEVELS {
        let input = level_to_input(level);
        let expected = f64::from(input) / f64::from(FULL_SCALE);
        let mut modulator = Modulator::new(ModulatorConfig::default()).unwrap();

        for _ in 0..SETTLE_CALLS {
            modulator.process_x32(input, rng.gen());
        }

        let sum: f64 = (0..MEASURE_CALLS)
            .map(|_| decode(&modulator.process_x32(input, rng.gen())))
            .sum();
        let measured = sum / MEASURE_CALLS as f64;

        assert!(
            (measured - expected).abs() < TOLERANCE,
            "level {level}: measured {measured:.5}, expected {expected:.5}"
        );
    }
}

#[test]
fn dc_accuracy_x16() {
    let mut rng = StdRng::seed_from_u64(0xD1CE);

    for level in LEVELS {
        let input = level_to_input(level);
        let expected = f64::from(input) / f64::from(FULL_SCALE);
        let mut modulator = Modulator::new(ModulatorConfig::default()).unwrap();

        for _ in 0..SETTLE_CALLS {
            modulator.process_x16(input, input, rng.gen());
        }

        let sum: f64 = (0..MEASURE_CALLS)
            .map(|_| decode(&modulator.process_x16(input, input, rng.gen())))
            .sum();
        let measured = sum / MEASURE_CALLS as f64;

        assert!(
            (measured - expected).abs() < TOLERANCE,
            "level {level}: measured {measured:.5}, expected {expected:.5}"
        );
    }
}

#[test]
fn dc_accuracy_without_dither() {
    let config = ModulatorConfig {
        dither: false,
        ..Default::default()
    };

    for level in LEVELS {
        let input = level_to_input(level);
        let expected = f64::from(input) / f64::from(FULL_SCALE);
        let mut modulator = Modulator::new(config).unwrap();

        for _ in 0..SETTLE_CALLS {
            modulator.process_x32(input, 0);
        }

        let sum: f64 = (0..MEASURE_CALLS)
            .map(|_| decode(&modulator.process_x32(input, 0)))
            .sum();
        let measured = sum / MEASURE_CALLS as f64;

        assert!(
            (measured - expected).abs() < TOLERANCE,
            "level {level}: measured {measured:.5}, expected {expected:.5}"
        );
    }
}

#[test]
fn integrators_stay_in_range_at_rated_level() {
    let mut rng = StdRng::seed_from_u64(7);

    for level in [0.71, -0.71] {
        let input = level_to_input(level);
        let mut modulator = Modulator::with_metrics(ModulatorConfig::default()).unwrap();

        for _ in 0..MEASURE_CALLS {
            modulator.process_x32(input, rng.gen());
        }

        // wrap-around would show up as a peak near the full i32 range
        let metrics = modulator.metrics().unwrap();
        for (stage, peak) in metrics.integrator_peaks().iter().enumerate() {
            assert!(*peak < 0.5, "level {level}: integrator {stage} peaked at {peak:.3}");
        }
    }
}

/// Peak integrator usage for a 1 kHz sine at `level` of 16-bit full scale
fn sine_headroom(level: f64, seed: u64) -> IntegratorMetrics {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut modulator = Modulator::with_metrics(ModulatorConfig::default()).unwrap();

    for n in 0..4_800 {
        let phase = 2.0 * PI * 1_000.0 * f64::from(n) / 48_000.0;
        modulator.process_x32(level_to_input(level * phase.sin()), rng.gen());
    }

    *modulator.metrics().unwrap()
}

#[test]
fn full_scale_sine_keeps_integrator_headroom() {
    // 16-bit full scale lands at ~71% of the modulator range after scaling
    let full = sine_headroom(1.0, 3);
    let half = sine_headroom(0.5, 3);

    let full_peaks = full.integrator_peaks();
    assert!(full_peaks[3] < 0.95, "last integrator at {:.3}", full_peaks[3]);
    assert!(full_peaks[..3].iter().all(|p| *p < 0.25), "{full_peaks:?}");
    assert!(full.quantizer_peak() < 0.05);

    // the last integrator is where level shows up first
    assert!(half.integrator_peaks()[3] < full_peaks[3]);
}

#[test]
fn sine_survives_modulation() {
    let sample_rate = 48_000.0;
    let frequency = 1_000.0;
    let frames = 4_800;
    let skip = 480;

    let mut rng = StdRng::seed_from_u64(1);
    let mut modulator = Modulator::new(ModulatorConfig::default()).unwrap();

    let mut input = Vec::with_capacity(frames);
    let mut output = Vec::with_capacity(frames);
    for n in 0..frames {
        let level = 0.5 * (2.0 * PI * frequency * n as f64 / sample_rate).sin();
        let sample = level_to_input(level);
        input.push(f64::from(sample) / f64::from(FULL_SCALE));
        output.push(decode(&modulator.process_x32(sample, rng.gen())));
    }

    let correlation = pearson(&input[skip..], &output[skip..]);
    assert!(correlation > 0.95, "correlation {correlation:.4}");
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        covariance += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }

    covariance / (var_a.sqrt() * var_b.sqrt())
}
