//! Trigger/coincidence correlation over a hit stream.
//!
//! The [Correlator] drives sequential decoding of a record stream. Every
//! non-pile-up hit on a thin-strip channel is a trigger. For each trigger
//! the surrounding records are scanned in both directions, bounded by the
//! time window, collecting thick-detector hits from the trigger's group and
//! scintillator hits from anywhere. Both scans are detours: the cursor is
//! restored to just past the trigger before the outer loop continues, so
//! overlapping triggers each see their own full window.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

use crate::chanmap::{ChannelClass, ChannelMap};
use crate::cursor::RecordCursor;
use crate::event::{
    Coincidence, CoincidenceList, CorrelatedEvent, MAX_SCINT_COINCIDENCES,
    MAX_THICK_COINCIDENCES,
};
use crate::hit::Hit;
use crate::Result;

/// Counters accumulated over one stream scan.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    /// Hits decoded by the outer loop (window re-reads not counted)
    pub hits: u64,
    /// Correlated events emitted
    pub events: u64,
    /// Hits flagged as pile-up
    pub pile_ups: u64,
    /// Hits with a failed CFD
    pub cfd_fails: u64,
    /// Coincidences dropped due to the multiplicity bounds
    pub overflows: u64,
}

impl ScanStats {
    fn add(&mut self, hit: &Hit) {
        self.hits += 1;
        if hit.pile_up {
            self.pile_ups += 1;
        }
        if hit.cfd_failed {
            self.cfd_fails += 1;
        }
    }
}

/// Receives correlated events, and final statistics at end of stream.
///
/// What happens to an event, persisting, histogramming, discarding, is
/// entirely the sink's concern.
pub trait EventSink {
    /// Handle one emitted event.
    ///
    /// # Errors
    /// Sink errors abort the scan and propagate to the caller.
    fn event(&mut self, event: CorrelatedEvent) -> Result<()>;

    /// Called once after the last record of the stream.
    ///
    /// # Errors
    /// Propagated to the caller of the scan.
    fn end_of_stream(&mut self, _stats: &ScanStats) -> Result<()> {
        Ok(())
    }
}

impl EventSink for Vec<CorrelatedEvent> {
    fn event(&mut self, event: CorrelatedEvent) -> Result<()> {
        self.push(event);
        Ok(())
    }
}

/// Correlates triggers with coincident hits across a record stream.
///
/// # Example
/// ```no_run
/// use std::fs::File;
/// use sirius::{ChannelMap, CorrelatedEvent, Correlator};
///
/// let map = ChannelMap::from_reader(File::open("chanmap.json").unwrap()).unwrap();
/// let mut correlator = Correlator::builder().map(map).build();
/// let mut events: Vec<CorrelatedEvent> = Vec::new();
/// let stats = correlator
///     .scan(File::open("run042.data").unwrap(), &mut events)
///     .unwrap();
/// println!("{} events from {} hits", stats.events, stats.hits);
/// ```
#[derive(TypedBuilder)]
pub struct Correlator {
    /// Address to channel metadata table
    map: ChannelMap,
    /// Coincidence window half-width in nanoseconds. The bound is strict:
    /// a hit exactly `window_ns` away is outside the window.
    #[builder(default = 1000)]
    window_ns: i64,
    /// Bound on thick-detector coincidences per event
    #[builder(default = MAX_THICK_COINCIDENCES)]
    max_thick: usize,
    /// Bound on scintillator coincidences per event
    #[builder(default = MAX_SCINT_COINCIDENCES)]
    max_scint: usize,
    /// Generator behind the randomized CFD fallback
    #[builder(default = StdRng::from_entropy())]
    rng: StdRng,
    /// Cooperative cancellation, checked between outer iterations only
    #[builder(default, setter(strip_option))]
    cancel: Option<Arc<AtomicBool>>,
}

impl Correlator {
    /// Scan a full record stream, pushing correlated events to `sink`.
    ///
    /// Malformed records, unknown addresses, CFD failures, and multiplicity
    /// overflows are all non-fatal and end up in the returned [ScanStats];
    /// only an I/O fault on `reader` or a sink error aborts the scan.
    ///
    /// # Errors
    /// Any `std::io::Error` from `reader`, or any error from the sink.
    pub fn scan<R, S>(&mut self, reader: R, sink: &mut S) -> Result<ScanStats>
    where
        R: std::io::Read + std::io::Seek,
        S: EventSink,
    {
        let mut cursor = RecordCursor::new(reader);
        let mut stats = ScanStats::default();

        loop {
            if let Some(cancel) = &self.cancel {
                if cancel.load(Ordering::Relaxed) {
                    debug!(record = cursor.index(), "scan cancelled");
                    break;
                }
            }

            let Some(buf) = cursor.read()? else {
                break;
            };
            let trigger = Hit::decode(&buf, &self.map, &mut self.rng);
            stats.add(&trigger);

            let info = *self.map.get(trigger.address);
            if trigger.pile_up || info.class != ChannelClass::ThinStrip {
                continue;
            }

            // Positions: the trigger is the record just read, so the saved
            // checkpoint is immediately after it and both window scans
            // restore to it.
            let after_trigger = cursor.checkpoint();
            let trigger_index = cursor.index() - 1;

            let mut thick = CoincidenceList::with_capacity(self.max_thick);
            let mut scint = CoincidenceList::with_capacity(self.max_scint);

            // Backward: one record at a time, newest first, until the
            // window is exceeded or the stream start is reached.
            let mut index = trigger_index;
            while index > 0 {
                index -= 1;
                let Some(buf) = cursor.read_at(index)? else {
                    break;
                };
                let hit = Hit::decode(&buf, &self.map, &mut self.rng);
                if trigger.timestamp_ns - hit.timestamp_ns >= self.window_ns {
                    break;
                }
                if !hit.pile_up {
                    self.classify(&trigger, info.group, &hit, &mut thick, &mut scint);
                }
            }
            cursor.restore(after_trigger)?;

            // Forward, same rules, pooled into the same lists.
            while let Some(buf) = cursor.read()? {
                let hit = Hit::decode(&buf, &self.map, &mut self.rng);
                if hit.timestamp_ns - trigger.timestamp_ns >= self.window_ns {
                    break;
                }
                if !hit.pile_up {
                    self.classify(&trigger, info.group, &hit, &mut thick, &mut scint);
                }
            }
            cursor.restore(after_trigger)?;

            // A trigger with no thick-detector coincidence is dropped; it
            // was still counted in the totals.
            if thick.is_empty() {
                trace!(
                    record = trigger_index,
                    address = trigger.address,
                    "trigger without coincidences"
                );
                continue;
            }

            stats.events += 1;
            stats.overflows += u64::from(thick.dropped() + scint.dropped());
            sink.event(CorrelatedEvent {
                trigger,
                trigger_local: info.local,
                trigger_group: info.group,
                thick,
                scint,
            })?;
        }

        debug!(
            hits = stats.hits,
            events = stats.events,
            pile_ups = stats.pile_ups,
            cfd_fails = stats.cfd_fails,
            "end of stream"
        );
        sink.end_of_stream(&stats)?;
        Ok(stats)
    }

    /// Classify a non-pile-up in-window hit against the trigger.
    fn classify(
        &self,
        trigger: &Hit,
        trigger_group: u16,
        hit: &Hit,
        thick: &mut CoincidenceList,
        scint: &mut CoincidenceList,
    ) {
        let info = self.map.get(hit.address);
        // Integer tick difference first, fractional corrections after, so
        // large absolute timestamps do not eat the sub-ns resolution.
        let time_ns = (hit.timestamp_ns - trigger.timestamp_ns) as f64
            + (hit.cfd_correction_ns - trigger.cfd_correction_ns);
        let coincidence = Coincidence {
            local: info.local,
            group: info.group,
            energy: hit.energy,
            time_ns,
        };
        match info.class {
            ChannelClass::ThickDetector if info.group == trigger_group => {
                thick.push(coincidence);
            }
            ChannelClass::Scintillator => {
                scint.push(coincidence);
            }
            _ => (),
        }
    }
}
