//! Sub-sample timing recovery from constant-fraction discriminator codes.
//!
//! Each hit carries a 16-bit CFD code whose layout depends on the sampling
//! class of the channel. A successfully resolved code converts to a
//! deterministic sub-sample correction in nanoseconds. When the hardware
//! could not resolve a zero crossing the correction is drawn uniformly from
//! the class' fallback range instead, so that histograms of failed hits do
//! not pile up in an artificial spike at zero.
use rand::Rng;

use crate::chanmap::SamplingClass;

/// Fallback range at 250 MHz, symmetric around zero.
const FALLBACK_250MHZ_NS: std::ops::Range<f64> = -4.0..4.0;
/// Fallback range at 500 MHz. Asymmetric, matching the digitizer firmware
/// formula `2 * (5u - 1)`; do not "fix" this to be symmetric as it would
/// shift downstream timing distributions.
const FALLBACK_500MHZ_NS: std::ops::Range<f64> = -2.0..8.0;

/// A decoded CFD correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correction {
    /// Sub-sample time correction in nanoseconds
    pub ns: f64,
    /// True when the discriminator failed to resolve a crossing and `ns`
    /// is a randomized fallback value
    pub failed: bool,
}

/// Convert a raw CFD code to a correction in nanoseconds.
///
/// `rng` is only consulted on the failure paths. Pass a seeded generator
/// for reproducible output.
pub fn correct<R: Rng>(code: u16, sampling: SamplingClass, rng: &mut R) -> Correction {
    match sampling {
        SamplingClass::Rate250MHz => correct_250mhz(code, rng),
        SamplingClass::Rate500MHz => correct_500mhz(code, rng),
        // No digitizer, no fine timing. The hit decoder also zeroes the
        // timestamp for these channels.
        SamplingClass::Unassigned => Correction {
            ns: 0.0,
            failed: true,
        },
    }
}

/// 250 MHz code layout: bit 15 fail flag, bit 14 trigger source, bits 13..0
/// time fraction in units of 4 ns / 16384.
fn correct_250mhz<R: Rng>(code: u16, rng: &mut R) -> Correction {
    let fail = (code >> 15) & 0x1;
    let trig_source = (code >> 14) & 0x1;
    let fraction = code & 0x3fff;

    if fail == 0 {
        Correction {
            ns: (f64::from(fraction) / 16384.0 - f64::from(trig_source)) * 4.0,
            failed: false,
        }
    } else {
        Correction {
            ns: rng.gen_range(FALLBACK_250MHZ_NS),
            failed: true,
        }
    }
}

/// 500 MHz code layout: bits 15..13 trigger source, bits 12..0 time fraction
/// in units of 2 ns / 8192. Trigger source 7 is the reserved failure code.
fn correct_500mhz<R: Rng>(code: u16, rng: &mut R) -> Correction {
    let trig_source = (code >> 13) & 0x7;
    let fraction = code & 0x1fff;

    if trig_source < 7 {
        Correction {
            ns: (f64::from(fraction) / 8192.0 + f64::from(trig_source) - 1.0) * 2.0,
            failed: false,
        }
    } else {
        Correction {
            ns: rng.gen_range(FALLBACK_500MHZ_NS),
            failed: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};
    use test_case::test_case;

    use super::*;

    #[test_case(0x0000, 0.0; "zero code, source 0")]
    #[test_case(0x3fff, 4.0 * 16383.0 / 16384.0; "max fraction, source 0")]
    #[test_case(0x4000, -4.0; "zero fraction, source 1")]
    #[test_case(0x7fff, 4.0 * 16383.0 / 16384.0 - 4.0; "max fraction, source 1")]
    fn corrections_250mhz(code: u16, expected: f64) {
        let mut rng = StdRng::seed_from_u64(0);
        let zult = correct(code, SamplingClass::Rate250MHz, &mut rng);
        assert!(!zult.failed);
        assert!((zult.ns - expected).abs() < 1e-12, "got {}", zult.ns);
        assert!((-4.0..4.0).contains(&zult.ns));
    }

    #[test_case(0x0000, -2.0; "zero fraction, source 0")]
    #[test_case(0x1fff, 2.0 * 8191.0 / 8192.0 - 2.0; "max fraction, source 0")]
    #[test_case(0xc000, 10.0; "zero fraction, source 6")]
    #[test_case(0xdfff, 2.0 * 8191.0 / 8192.0 + 10.0; "max fraction, source 6")]
    fn corrections_500mhz(code: u16, expected: f64) {
        let mut rng = StdRng::seed_from_u64(0);
        let zult = correct(code, SamplingClass::Rate500MHz, &mut rng);
        assert!(!zult.failed);
        assert!((zult.ns - expected).abs() < 1e-12, "got {}", zult.ns);
        assert!((-2.0..14.0).contains(&zult.ns));
    }

    #[test]
    fn failed_250mhz_is_randomized_within_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for code in [0x8000u16, 0x8001, 0xffff] {
            let zult = correct(code, SamplingClass::Rate250MHz, &mut rng);
            assert!(zult.failed);
            assert!((-4.0..4.0).contains(&zult.ns), "got {}", zult.ns);
        }
    }

    #[test]
    fn failed_500mhz_keeps_asymmetric_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let zult = correct(0xe000, SamplingClass::Rate500MHz, &mut rng);
            assert!(zult.failed);
            assert!((-2.0..8.0).contains(&zult.ns), "got {}", zult.ns);
        }
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let a = correct(
            0x8000,
            SamplingClass::Rate250MHz,
            &mut StdRng::seed_from_u64(42),
        );
        let b = correct(
            0x8000,
            SamplingClass::Rate250MHz,
            &mut StdRng::seed_from_u64(42),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn unassigned_contributes_nothing() {
        let mut rng = StdRng::seed_from_u64(0);
        let zult = correct(0x1234, SamplingClass::Unassigned, &mut rng);
        assert_eq!(zult.ns, 0.0);
        assert!(zult.failed);
    }
}
