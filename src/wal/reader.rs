//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{DiscountError, Result};
use super::entry::EntryHeader;
use super::{WalEntry, HEADER_SIZE, MAX_ENTRY_SIZE};

/// What the reader found at its current position
#[derive(Debug)]
pub(crate) enum Frame {
    /// A valid entry
    Entry(WalEntry),

    /// A frame with an intact header whose data failed validation; reading
    /// can continue after it
    Corrupted { offset: u64, reason: String },

    /// The file ends inside a frame (partial write): either fewer than
    /// `HEADER_SIZE` bytes remain, or an intact header promises more data
    /// than the file holds
    Truncated { offset: u64 },

    /// Clean end of file
    End,
}

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,
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
    /// Returns `Ok(None)` at a clean end of file and an error on any
    /// corrupted or partially written entry.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        match self.next_frame()? {
            Frame::Entry(entry) => Ok(Some(entry)),
            Frame::End => Ok(None),
            Frame::Corrupted { offset, reason } => Err(DiscountError::WalCorruption(format!(
                "corrupted entry at offset {}: {}",
                offset, reason
            ))),
            Frame::Truncated { offset } => Err(DiscountError::WalCorruption(format!(
                "partial entry at offset {}",
                offset
            ))),
        }
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }

    /// Byte offset of the next frame
    pub fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame> {
        let offset = self.position;
        let remaining = self.file_len - offset;

        if remaining == 0 {
            return Ok(Frame::End);
        }
        if remaining < HEADER_SIZE as u64 {
            return Ok(Frame::Truncated { offset });
        }

        let mut header_bytes = [0u8; HEADER_SIZE];
        self.reader.read_exact(&mut header_bytes)?;

        // Without a trustworthy length the next frame cannot be located
        let header = match EntryHeader::parse(&header_bytes) {
            Ok(header) => header,
            Err(DiscountError::WalCorruption(reason)) => {
                return Err(DiscountError::WalCorruption(format!(
                    "entry at offset {}: {}",
                    offset, reason
                )))
            }
            Err(e) => return Err(e),
        };
        if header.len > MAX_ENTRY_SIZE {
            return Err(DiscountError::WalCorruption(format!(
                "entry at offset {} declares {} data bytes (max {})",
                offset, header.len, MAX_ENTRY_SIZE
            )));
        }

        // Intact header, data cut short: a torn final write
        if remaining - (HEADER_SIZE as u64) < u64::from(header.len) {
            return Ok(Frame::Truncated { offset });
        }

        let mut data = vec![0u8; header.len as usize];
        self.reader.read_exact(&mut data)?;
        self.position = offset + HEADER_SIZE as u64 + u64::from(header.len);

        match WalEntry::decode_data(&header, &data) {
            Ok(entry) => Ok(Frame::Entry(entry)),
            Err(e) => Ok(Frame::Corrupted {
                offset,
                reason: e.to_string(),
            }),
        }
    }
}

/// Iterator over WAL entries
///
/// Yields an error for the first invalid entry and then stops.
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
