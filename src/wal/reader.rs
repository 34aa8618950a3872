//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{KvlError, Result};

use super::entry::{payload_len, MAX_PAYLOAD_SIZE};
use super::{WalEntry, HEADER_SIZE};

/// Outcome of reading one frame
pub(crate) enum Frame {
    Entry(WalEntry),
    /// Clean end of file
    End,
    /// The file ends in the middle of a frame (torn write)
    Torn,
}

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,
    /// Offset of the next unread frame
    position: u64,
    file_len: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();

        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
            file_len,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at end of file, including a torn final frame left
    /// by a crash mid-append, and `WalCorruption` for a checksum mismatch.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        match self.read_frame()? {
            Frame::Entry(entry) => Ok(Some(entry)),
            Frame::End | Frame::Torn => Ok(None),
        }
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> WalIterator {
        WalIterator { reader: self, done: false }
    }

    /// Offset just past the last frame read successfully
    pub fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn read_frame(&mut self) -> Result<Frame> {
        let remaining = self.file_len - self.position;
        if remaining == 0 {
            return Ok(Frame::End);
        }
        if remaining < HEADER_SIZE as u64 {
            return Ok(self.torn());
        }

        let mut header = [0u8; HEADER_SIZE];
        self.reader.read_exact(&mut header)?;

        let len = payload_len(&header);
        if len > MAX_PAYLOAD_SIZE {
            return Err(KvlError::WalCorruption(format!(
                "implausible entry length {} at offset {}",
                len, self.position
            )));
        }
        if remaining < (HEADER_SIZE + len) as u64 {
            return Ok(self.torn());
        }

        let mut frame = Vec::with_capacity(HEADER_SIZE + len);
        frame.extend_from_slice(&header);
        frame.resize(HEADER_SIZE + len, 0);
        self.reader.read_exact(&mut frame[HEADER_SIZE..])?;

        let entry = WalEntry::deserialize(&frame)?;
        self.position += frame.len() as u64;

        Ok(Frame::Entry(entry))
    }

    /// Treat everything from the current frame on as past the end
    fn torn(&mut self) -> Frame {
        self.file_len = self.position;
        Frame::Torn
    }
}

/// Iterator over WAL entries
///
/// Yields the first error and then stops.
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
