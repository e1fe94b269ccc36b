//! Logarithmic volume as rational gains
//!
//! Volumes arrive in USB Audio Class 2 units (1/256 dB, 0 = unity, negative
//! = attenuation). Attenuation is quantized to 0.5 dB steps and looked up in a
//! table of `numerator / denominator` gains precomputed at construction, so
//! the per-sample path is a single integer multiply and divide.
//!
//! - 0 dB    → 1/1 (unity)
//! - -6 dB   → ~0.501
//! - -50 dB  → ~0.00316 (quietest audible step)
//! - < -50 dB → hard mute

/// Volume units per dB
pub const VOLUME_PER_DB: i32 = 256;

/// Quietest attenuation that still passes signal
pub const MIN_VOLUME_DB: i32 = -50;

/// [`MIN_VOLUME_DB`] in volume units
pub const MIN_VOLUME: i32 = MIN_VOLUME_DB * VOLUME_PER_DB;

/// log2 of the table step in volume units (128 units = 0.5 dB)
pub const VOLUME_STEP_BITS: u32 = 7;

/// Table step in volume units
pub const VOLUME_STEP: i32 = 1 << VOLUME_STEP_BITS;

/// Number of table entries (0 dB down to [`MIN_VOLUME_DB`] inclusive)
pub const VOLUME_STEPS: usize = (-MIN_VOLUME / VOLUME_STEP) as usize + 1;

/// Largest denominator used when approximating a gain
const MAX_DENOMINATOR: i64 = 1 << 15;

/// Gain expressed as a ratio of integers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gain {
    pub numerator: i32,
    pub denominator: i32,
}

impl Gain {
    pub const UNITY: Gain = Gain {
        numerator: 1,
        denominator: 1,
    };

    pub const MUTE: Gain = Gain {
        numerator: 0,
        denominator: 1,
    };

    /// Best rational approximation of `linear` with a bounded denominator
    ///
    /// Walks the continued fraction expansion and keeps the last convergent
    /// whose denominator fits.
    pub fn approximate(linear: f64) -> Gain {
        if linear <= 0.0 {
            return Gain::MUTE;
        }

        // convergents h(n)/k(n), seeded with h(-2)/k(-2) = 0/1, h(-1)/k(-1) = 1/0
        let (mut h_prev, mut h) = (0i64, 1i64);
        let (mut k_prev, mut k) = (1i64, 0i64);
        let mut x = linear;

        loop {
            let term = x.floor();
            let a = term as i64;
            let h_next = a * h + h_prev;
            let k_next = a * k + k_prev;
            if k_next > MAX_DENOMINATOR {
                break;
            }

            (h_prev, h) = (h, h_next);
            (k_prev, k) = (k, k_next);

            let fraction = x - term;
            if fraction < 1e-12 {
                break;
            }
            x = 1.0 / fraction;
        }

        Gain {
            numerator: h as i32,
            denominator: k as i32,
        }
    }

    /// Scale a sample; rounds toward zero
    #[inline]
    pub fn apply(self, sample: i32) -> i32 {
        (i64::from(sample) * i64::from(self.numerator) / i64::from(self.denominator)) as i32
    }

    pub fn is_mute(self) -> bool {
        self.numerator == 0
    }

    pub fn linear(self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator)
    }
}

/// Precomputed 0.5 dB attenuation table
#[derive(Debug, Clone)]
pub struct VolumeTable {
    gains: [Gain; VOLUME_STEPS],
}

impl VolumeTable {
    pub fn new() -> Self {
        let mut gains = [Gain::UNITY; VOLUME_STEPS];
        for (step, gain) in gains.iter_mut().enumerate() {
            let db = -(step as f64) * f64::from(VOLUME_STEP) / f64::from(VOLUME_PER_DB);
            *gain = Gain::approximate(10.0_f64.powf(db / 20.0));
        }
        Self { gains }
    }

    /// Gain for a master and a channel volume, both in 1/256 dB
    ///
    /// Positive volumes are treated as unity. A combined attenuation beyond
    /// [`MIN_VOLUME`] mutes.
    pub fn gain(&self, master: i16, channel: i16) -> Gain {
        let combined = i32::from(master.min(0)) + i32::from(channel.min(0));
        if combined < MIN_VOLUME {
            return Gain::MUTE;
        }

        self.gains[((-combined) >> VOLUME_STEP_BITS) as usize]
    }

    /// Gain at a table step (0 = unity)
    pub fn step(&self, step: usize) -> Option<Gain> {
        self.gains.get(step).copied()
    }
}

impl Default for VolumeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db(volume_db: f64) -> i16 {
        (volume_db * f64::from(VOLUME_PER_DB)) as i16
    }

    #[test]
    fn table_has_one_entry_per_half_db() {
        assert_eq!(VOLUME_STEPS, 101);
        let table = VolumeTable::new();
        assert!(table.step(100).is_some());
        assert!(table.step(101).is_none());
    }

    #[test]
    fn zero_db_is_exact_unity() {
        let table = VolumeTable::new();
        assert_eq!(table.gain(0, 0), Gain::UNITY);
        assert_eq!(table.gain(0, 0).apply(-1_234_567), -1_234_567);
    }

    #[test]
    fn six_db_halves_amplitude() {
        let table = VolumeTable::new();
        let gain = table.gain(db(-6.0), 0);
        assert!((gain.linear() - 0.501_187).abs() < 1e-4, "{gain:?}");
        assert_eq!(table.gain(0, db(-6.0)), gain);
        assert_eq!(table.gain(db(-3.0), db(-3.0)), gain);
    }

    #[test]
    fn gains_decrease_monotonically() {
        let table = VolumeTable::new();
        let mut previous = f64::INFINITY;
        for step in 0..VOLUME_STEPS {
            let gain = table.step(step).unwrap();
            assert!(gain.denominator > 0);
            assert!(gain.linear() < previous, "step {step}");
            previous = gain.linear();
        }
    }

    #[test]
    fn approximations_are_close() {
        let table = VolumeTable::new();
        for step in 0..VOLUME_STEPS {
            let expected = 10.0_f64.powf(-(step as f64) * 0.5 / 20.0);
            let gain = table.step(step).unwrap();
            assert!(
                (gain.linear() - expected).abs() / expected < 1e-4,
                "step {step}: {gain:?} vs {expected}"
            );
        }
    }

    #[test]
    fn attenuation_below_floor_mutes() {
        let table = VolumeTable::new();
        assert!(!table.gain(db(-50.0), 0).is_mute());
        assert!(table.gain(db(-50.0), -1).is_mute());
        assert!(table.gain(db(-30.0), db(-30.0)).is_mute());
        assert!(table.gain(i16::MIN, i16::MIN).is_mute());
    }

    #[test]
    fn positive_volume_clamps_to_unity() {
        let table = VolumeTable::new();
        assert_eq!(table.gain(db(6.0), 0), Gain::UNITY);
        assert_eq!(table.gain(i16::MAX, i16::MAX), Gain::UNITY);
    }

    #[test]
    fn sub_step_attenuation_rounds_toward_unity() {
        let table = VolumeTable::new();
        assert_eq!(table.gain(-1, 0), Gain::UNITY);
        assert_eq!(table.gain(-(VOLUME_STEP as i16), 0), table.step(1).unwrap());
    }

    #[test]
    fn approximate_edge_values() {
        assert_eq!(Gain::approximate(1.0), Gain::UNITY);
        assert_eq!(Gain::approximate(0.0), Gain::MUTE);
        assert_eq!(
            Gain::approximate(0.5),
            Gain {
                numerator: 1,
                denominator: 2
            }
        );
    }
}
