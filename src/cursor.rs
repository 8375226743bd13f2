//! Record-oriented cursor over a finite hit stream.
//!
//! The correlator re-reads records around each trigger from both
//! directions. Rather than open-coded relative seeks, [RecordCursor]
//! exposes record-indexed reads with save/restore checkpoints: save the
//! position, detour through the surrounding records, restore, continue.
use std::io::{ErrorKind, Read, Seek, SeekFrom};

use crate::hit::RECORD_LEN;
use crate::Result;

/// A saved cursor position. Restorable on the cursor it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(u64);

/// Cursor over a seekable stream of fixed-size records.
///
/// Records are assumed to start at byte 0 of the stream and be densely
/// packed. A partial record at the end of the stream is treated as end of
/// stream, never as an error.
pub struct RecordCursor<R> {
    inner: R,
    index: u64,
}

impl<R> RecordCursor<R>
where
    R: Read + Seek,
{
    pub fn new(inner: R) -> Self {
        RecordCursor { inner, index: 0 }
    }

    /// Zero-based index of the next record to be read.
    #[must_use]
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Save the current position.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.index)
    }

    /// Seek back to a previously saved position.
    ///
    /// # Errors
    /// Any `std::io::Error` seeking.
    pub fn restore(&mut self, checkpoint: Checkpoint) -> Result<()> {
        self.seek_to(checkpoint.0)
    }

    fn seek_to(&mut self, index: u64) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(index * RECORD_LEN as u64))?;
        self.index = index;
        Ok(())
    }

    /// Read the next record, advancing the cursor.
    ///
    /// Returns `None` when fewer than [RECORD_LEN] bytes remain.
    ///
    /// # Errors
    /// Any `std::io::Error` other than an unexpected EOF.
    pub fn read(&mut self) -> Result<Option<[u8; RECORD_LEN]>> {
        let mut buf = [0u8; RECORD_LEN];
        match self.inner.read_exact(&mut buf) {
            Ok(()) => {
                self.index += 1;
                Ok(Some(buf))
            }
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Read the record at an absolute index, leaving the cursor just past
    /// it. Callers that need to resume elsewhere restore a checkpoint.
    ///
    /// # Errors
    /// Any `std::io::Error` seeking or reading.
    pub fn read_at(&mut self, index: u64) -> Result<Option<[u8; RECORD_LEN]>> {
        if self.index != index {
            self.seek_to(index)?;
        }
        self.read()
    }
}
