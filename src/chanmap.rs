//! Channel address to channel metadata lookup.
//!
//! The acquisition system tags every hit with a 12-bit channel address. The
//! [ChannelMap] is the injected, read-only table describing what is wired to
//! each address: its digitizer sampling-rate class and its detector role.
//! Addresses outside the table resolve to an unassigned/unused channel and
//! never fail a decode.
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Digitizer sampling-rate class of a channel.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SamplingClass {
    /// 250 MHz sampling, 8 ns timestamp ticks
    Rate250MHz,
    /// 500 MHz sampling, 10 ns timestamp ticks
    Rate500MHz,
    /// Address with no digitizer assigned
    #[default]
    Unassigned,
}

/// Detector role of a channel.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ChannelClass {
    /// Fast scintillator, i.e. a gamma channel
    Scintillator,
    /// Thin front strip; hits here anchor correlation windows
    ThinStrip,
    /// Thick back detector
    ThickDetector,
    /// Guard ring of a thick detector
    GuardRing,
    /// Auxiliary channel, e.g. a beam pickup
    Auxiliary,
    /// RF reference channel
    RfReference,
    /// Cabled but unused channel
    #[default]
    Unused,
}

/// Static per-address channel metadata.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Channel address, unique within a map
    pub address: u16,
    #[serde(default)]
    pub sampling: SamplingClass,
    #[serde(default)]
    pub class: ChannelClass,
    /// Linear number of the detector within its class
    #[serde(default)]
    pub local: u16,
    /// Group of related channels, e.g., which telescope a thin/thick
    /// detector pair belongs to
    #[serde(default)]
    pub group: u16,
}

impl ChannelInfo {
    #[must_use]
    pub fn unassigned(address: u16) -> Self {
        ChannelInfo {
            address,
            ..ChannelInfo::default()
        }
    }
}

/// Address-indexed lookup table of [ChannelInfo].
///
/// The table is dense: every address from 0 up to the highest configured
/// address has an entry, with gaps filled by unassigned channels.
#[derive(Debug, Clone)]
pub struct ChannelMap {
    table: Vec<ChannelInfo>,
}

impl ChannelMap {
    const UNASSIGNED: ChannelInfo = ChannelInfo {
        address: 0,
        sampling: SamplingClass::Unassigned,
        class: ChannelClass::Unused,
        local: 0,
        group: 0,
    };

    /// Build a map from explicit per-channel entries.
    ///
    /// # Errors
    /// [Error::ChannelMap] if two entries share an address.
    pub fn from_infos<I>(infos: I) -> Result<Self>
    where
        I: IntoIterator<Item = ChannelInfo>,
    {
        let infos: Vec<ChannelInfo> = infos.into_iter().collect();
        let size = infos
            .iter()
            .map(|info| info.address as usize + 1)
            .max()
            .unwrap_or(0);
        let mut table: Vec<ChannelInfo> = (0..size)
            .map(|addr| ChannelInfo::unassigned(addr as u16))
            .collect();
        let mut seen = vec![false; size];
        for info in infos {
            let idx = info.address as usize;
            if seen[idx] {
                return Err(Error::ChannelMap(format!(
                    "duplicate entry for address {}",
                    info.address
                )));
            }
            seen[idx] = true;
            table[idx] = info;
        }
        Ok(ChannelMap { table })
    }

    /// Load a map from a JSON array of [ChannelInfo].
    ///
    /// # Errors
    /// [Error::ChannelMap] on malformed JSON or duplicate addresses.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let infos: Vec<ChannelInfo> = serde_json::from_reader(reader)
            .map_err(|err| Error::ChannelMap(err.to_string()))?;
        Self::from_infos(infos)
    }

    /// Lookup by address. Addresses outside the table resolve to an
    /// unassigned/unused channel rather than failing.
    #[must_use]
    pub fn get(&self, address: u16) -> &ChannelInfo {
        self.table
            .get(address as usize)
            .unwrap_or(&Self::UNASSIGNED)
    }

    /// Number of addresses covered by the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
