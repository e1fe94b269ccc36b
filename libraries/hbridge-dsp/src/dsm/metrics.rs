//! Loop filter headroom tracking
//!
//! Input scaling keeps the integrators clear of `i32` wraparound; these
//! extremes show how much of that margin a signal actually used.

/// Extremes of the loop filter state since the metrics were last cleared
///
/// All bounds start at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegratorMetrics {
    pub integrator_min: [i32; 4],
    pub integrator_max: [i32; 4],
    pub quantizer_min: i32,
    pub quantizer_max: i32,
}

impl IntegratorMetrics {
    #[inline]
    pub(crate) fn record(&mut self, quantizer_input: i32, integrators: &[i32; 4]) {
        self.quantizer_min = self.quantizer_min.min(quantizer_input);
        self.quantizer_max = self.quantizer_max.max(quantizer_input);

        for (i, &value) in integrators.iter().enumerate() {
            self.integrator_min[i] = self.integrator_min[i].min(value);
            self.integrator_max[i] = self.integrator_max[i].max(value);
        }
    }

    /// Peak magnitude of each integrator as a fraction of the `i32` range
    pub fn integrator_peaks(&self) -> [f64; 4] {
        let mut peaks = [0.0; 4];
        for (i, peak) in peaks.iter_mut().enumerate() {
            *peak = peak_fraction(self.integrator_min[i], self.integrator_max[i]);
        }
        peaks
    }

    /// Peak magnitude of the quantizer input as a fraction of the `i32` range
    pub fn quantizer_peak(&self) -> f64 {
        peak_fraction(self.quantizer_min, self.quantizer_max)
    }

    /// Fold another channel's extremes into this one
    pub fn merge(&mut self, other: &IntegratorMetrics) {
        self.record(other.quantizer_min, &other.integrator_min);
        self.record(other.quantizer_max, &other.integrator_max);
    }
}

fn peak_fraction(min: i32, max: i32) -> f64 {
    f64::from(min).abs().max(f64::from(max)) / f64::from(i32::MAX)
}
