//! Hit record decoding.
//!
//! The acquisition system serializes every hit as 4 little-endian 32-bit
//! words:
//!
//! ```text
//! word0: bit 31 pile-up flag, bits 11..0 channel address
//! word1: low 32 bits of the 48-bit timestamp (raw ticks)
//! word2: bits 15..0 high 16 bits of the timestamp, bits 31..16 CFD code
//! word3: bits 15..0 raw energy, remaining bits unused
//! ```
//!
//! Decoding resolves the channel address against the [ChannelMap] to pick
//! the CFD conversion and rescales the raw tick count into nanoseconds
//! (8 ns ticks at 250 MHz, 10 ns at 500 MHz). Channels with no assigned
//! digitizer decode with a zero timestamp and a failed CFD so they never
//! contribute usable time.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cfd;
use crate::chanmap::{ChannelMap, SamplingClass};

/// Size of one serialized hit record in bytes.
pub const RECORD_LEN: usize = 16;

/// A single decoded hit.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Channel address (12 bits on the wire)
    pub address: u16,
    /// Raw, uncalibrated energy
    pub energy: u16,
    /// Raw CFD code as it appeared on the wire
    pub timing_code: u16,
    /// True when the acquisition flagged overlapping analog pulses
    pub pile_up: bool,
    /// Coarse timestamp rescaled to nanoseconds
    pub timestamp_ns: i64,
    /// Sub-sample CFD correction in nanoseconds
    pub cfd_correction_ns: f64,
    /// True when the CFD correction is a randomized fallback
    pub cfd_failed: bool,
}

impl Hit {
    /// Decode one record.
    ///
    /// `rng` backs the randomized CFD fallback; pass a seeded generator for
    /// reproducible decodes.
    #[must_use]
    pub fn decode<R: Rng>(buf: &[u8; RECORD_LEN], map: &ChannelMap, rng: &mut R) -> Hit {
        let word0 = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let word1 = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let word2 = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
        let word3 = u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]);

        let address = (word0 & 0xfff) as u16;
        let ticks = u64::from(word1) | (u64::from(word2 & 0xffff) << 32);
        let timing_code = (word2 >> 16) as u16;

        let sampling = map.get(address).sampling;
        let correction = cfd::correct(timing_code, sampling, rng);
        let timestamp_ns = match sampling {
            SamplingClass::Rate250MHz => ticks as i64 * 8,
            SamplingClass::Rate500MHz => ticks as i64 * 10,
            SamplingClass::Unassigned => 0,
        };

        Hit {
            address,
            energy: (word3 & 0xffff) as u16,
            timing_code,
            pile_up: word0 & 0x8000_0000 != 0,
            timestamp_ns,
            cfd_correction_ns: correction.ns,
            cfd_failed: correction.failed,
        }
    }

    /// Timestamp plus CFD correction, in nanoseconds.
    #[must_use]
    pub fn fine_time_ns(&self) -> f64 {
        self.timestamp_ns as f64 + self.cfd_correction_ns
    }
}

/// Serialize one record in the acquisition wire format.
///
/// `ticks` is the raw 48-bit timestamp before any rescaling; the high 16
/// bits are discarded. Intended for fixtures and simulators.
#[must_use]
pub fn encode_record(
    address: u16,
    pile_up: bool,
    ticks: u64,
    timing_code: u16,
    energy: u16,
) -> [u8; RECORD_LEN] {
    let word0 = u32::from(address & 0xfff) | if pile_up { 0x8000_0000 } else { 0 };
    let word1 = (ticks & 0xffff_ffff) as u32;
    let word2 = ((ticks >> 32) & 0xffff) as u32 | (u32::from(timing_code) << 16);
    let word3 = u32::from(energy);

    let mut buf = [0u8; RECORD_LEN];
    buf[0..4].copy_from_slice(&word0.to_le_bytes());
    buf[4..8].copy_from_slice(&word1.to_le_bytes());
    buf[8..12].copy_from_slice(&word2.to_le_bytes());
    buf[12..16].copy_from_slice(&word3.to_le_bytes());
    buf
}
