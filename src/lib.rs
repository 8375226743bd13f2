#![doc = include_str!("../README.md")]

mod error;

pub mod cfd;
pub mod chanmap;
pub mod correlator;
pub mod cursor;
pub mod event;
pub mod hit;
pub mod scan;

pub use chanmap::{ChannelClass, ChannelInfo, ChannelMap, SamplingClass};
pub use correlator::{Correlator, EventSink, ScanStats};
pub use cursor::{Checkpoint, RecordCursor};
pub use error::{Error, Result};
pub use event::{Coincidence, CoincidenceList, CorrelatedEvent};
pub use hit::{encode_record, Hit, RECORD_LEN};
pub use scan::{FileSummary, ScanPool};
