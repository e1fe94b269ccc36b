//! Sample widening and modulator input scaling
//!
//! All PCM is brought to a common signed 24-bit scale first, then scaled to
//! 45/64 (~71%) of that range before it reaches the modulator. The 71% limit
//! keeps the last integrator inside `i32` for realistic program material.

/// Largest magnitude of a sample on the common 24-bit scale
pub const SAMPLE_24_MAX: i32 = (1 << 23) - 1;

/// Largest magnitude the modulator is fed with
pub const MODULATOR_INPUT_MAX: i32 = to_modulator_domain(SAMPLE_24_MAX);

/// Widen a 16-bit sample to the 24-bit scale
#[inline]
pub const fn widen_16(sample: i16) -> i32 {
    (sample as i32) << 8
}

/// Sign-extend a 24-bit sample stored in the low bits of a 32-bit container
#[inline]
pub const fn sign_extend_24(container: u32) -> i32 {
    ((container << 8) as i32) >> 8
}

/// Scale a 24-bit sample into the modulator domain
#[inline]
pub const fn to_modulator_domain(sample: i32) -> i32 {
    (sample * 45) >> 6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixteen_and_twenty_four_bit_agree() {
        assert_eq!(widen_16(i16::MAX), 0x7FFF00);
        assert_eq!(widen_16(-1), -256);
        assert_eq!(
            to_modulator_domain(widen_16(1000)),
            to_modulator_domain(sign_extend_24(1000 << 8))
        );
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sign_extend_24(0x00FF_FFFF), -1);
        assert_eq!(sign_extend_24(0x0080_0000), -(1 << 23));
        assert_eq!(sign_extend_24(0x007F_FFFF), SAMPLE_24_MAX);
        // container padding is ignored
        assert_eq!(sign_extend_24(0xAB00_0001), 1);
    }

    #[test]
    fn modulator_input_is_about_71_percent() {
        let ratio = f64::from(MODULATOR_INPUT_MAX) / f64::from(SAMPLE_24_MAX);
        assert!((ratio - 45.0 / 64.0).abs() < 1e-6);
        // for 16-bit input this is exactly (x * 45) << 2
        assert_eq!(to_modulator_domain(widen_16(i16::MIN)), i32::from(i16::MIN) * 45 * 4);
    }
}
