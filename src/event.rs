//! Correlated event output.
//!
//! A [CorrelatedEvent] is one qualifying trigger hit plus the coincident
//! hits found within its time window, grouped by channel class. Coincidence
//! lists have a fixed capacity mirroring the acquisition's per-event hit
//! limits; hits beyond the bound are dropped and counted, never grown into.
use serde::{Deserialize, Serialize};

use crate::hit::Hit;

/// Default bound on thick-detector coincidences per event.
pub const MAX_THICK_COINCIDENCES: usize = 8;
/// Default bound on scintillator coincidences per event.
pub const MAX_SCINT_COINCIDENCES: usize = 64;

/// A hit coincident with a trigger.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Coincidence {
    /// Linear detector number of the source channel
    pub local: u16,
    /// Group number of the source channel
    pub group: u16,
    /// Raw, uncalibrated energy
    pub energy: u16,
    /// Fine time relative to the trigger's fine time, in nanoseconds
    pub time_ns: f64,
}

/// Fixed-capacity list of [Coincidence] with drop-on-overflow.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CoincidenceList {
    items: Vec<Coincidence>,
    capacity: usize,
    dropped: u32,
}

impl CoincidenceList {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        CoincidenceList {
            items: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Append a coincidence, or drop it if the list is full.
    ///
    /// Returns false when the value was dropped.
    pub fn push(&mut self, coincidence: Coincidence) -> bool {
        if self.items.len() < self.capacity {
            self.items.push(coincidence);
            true
        } else {
            self.dropped += 1;
            false
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of coincidences dropped because the list was full.
    #[must_use]
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Coincidence] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Coincidence> {
        self.items.iter()
    }
}

/// One trigger hit and its in-window coincidences.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CorrelatedEvent {
    /// The trigger hit, decoded fields as read from the stream
    pub trigger: Hit,
    /// Linear detector number of the trigger channel
    pub trigger_local: u16,
    /// Group number of the trigger channel
    pub trigger_group: u16,
    /// Thick-detector coincidences in the trigger's group
    pub thick: CoincidenceList,
    /// Scintillator coincidences, any group
    pub scint: CoincidenceList,
}

impl CorrelatedEvent {
    /// Coincidences dropped from this event due to the capacity bounds.
    #[must_use]
    pub fn dropped(&self) -> u32 {
        self.thick.dropped() + self.scint.dropped()
    }
}
