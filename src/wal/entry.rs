//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::code::DiscountCode;
use crate::error::{DiscountError, Result};

/// Header size: LSN (8) + data CRC (4) + data length (4) + header CRC (4)
pub const HEADER_SIZE: usize = 20;

/// Bytes covered by the header CRC (LSN, data CRC and length)
const HEADER_BODY_SIZE: usize = HEADER_SIZE - 4;

/// Largest data section a single entry may carry (16 MB)
pub const MAX_ENTRY_SIZE: u32 = 16 * 1024 * 1024;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// A batch of freshly generated codes
    Issue { codes: Vec<DiscountCode> },

    /// A code was redeemed
    Redeem { code: String, used_at: DateTime<Utc> },
}

/// Parsed entry header
///
/// The trailing header CRC covers the first 16 bytes, so a damaged
/// length is detected before it is trusted to find the next frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EntryHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: u32,
}

impl EntryHeader {
    /// Parse a header, failing if its own CRC does not match
    pub(crate) fn parse(bytes: &[u8; HEADER_SIZE]) -> Result<Self> {
        let mut lsn = [0u8; 8];
        let mut crc = [0u8; 4];
        let mut len = [0u8; 4];
        let mut header_crc = [0u8; 4];
        lsn.copy_from_slice(&bytes[0..8]);
        crc.copy_from_slice(&bytes[8..12]);
        len.copy_from_slice(&bytes[12..16]);
        header_crc.copy_from_slice(&bytes[16..20]);

        let stored = u32::from_le_bytes(header_crc);
        let computed = crc32fast::hash(&bytes[..HEADER_BODY_SIZE]);
        if stored != computed {
            return Err(DiscountError::WalCorruption(format!(
                "header CRC mismatch: stored {:08x}, computed {:08x}",
                stored, computed
            )));
        }

        Ok(Self {
            lsn: u64::from_le_bytes(lsn),
            crc: u32::from_le_bytes(crc),
            len: u32::from_le_bytes(len),
        })
    }
}

impl WalEntry {
    /// Create an entry stamped with the current time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        Self {
            lsn,
            operation,
            timestamp: Utc::now().timestamp_millis().max(0) as u64,
        }
    }

    /// Serialize to the framed on-disk form (header + data)
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let data = bincode::serialize(self)?;
        if data.len() > MAX_ENTRY_SIZE as usize {
            return Err(DiscountError::WalWrite(format!(
                "entry too large: {} bytes (max {})",
                data.len(),
                MAX_ENTRY_SIZE
            )));
        }

        let mut bytes = Vec::with_capacity(HEADER_SIZE + data.len());
        bytes.extend_from_slice(&self.lsn.to_le_bytes());
        bytes.extend_from_slice(&Self::compute_crc(&data).to_le_bytes());
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        let header_crc = crc32fast::hash(&bytes[..HEADER_BODY_SIZE]);
        bytes.extend_from_slice(&header_crc.to_le_bytes());
        bytes.extend_from_slice(&data);
        Ok(bytes)
    }

    /// Deserialize one framed entry, verifying both CRCs, length and LSN
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let header_bytes: &[u8; HEADER_SIZE] = bytes
            .get(..HEADER_SIZE)
            .and_then(|h| h.try_into().ok())
            .ok_or_else(|| {
                DiscountError::WalCorruption(format!(
                    "incomplete header: {} bytes",
                    bytes.len()
                ))
            })?;
        let header = EntryHeader::parse(header_bytes)?;

        let data = bytes
            .get(HEADER_SIZE..HEADER_SIZE + header.len as usize)
            .ok_or_else(|| {
                DiscountError::WalCorruption(format!(
                    "incomplete data: expected {} bytes, got {}",
                    header.len,
                    bytes.len() - HEADER_SIZE
                ))
            })?;

        Self::decode_data(&header, data)
    }

    /// Decode the data section once the header has been read
    pub(crate) fn decode_data(header: &EntryHeader, data: &[u8]) -> Result<Self> {
        let crc = Self::compute_crc(data);
        if crc != header.crc {
            return Err(DiscountError::WalCorruption(format!(
                "CRC mismatch at lsn {}: stored {:08x}, computed {:08x}",
                header.lsn, header.crc, crc
            )));
        }

        let entry: WalEntry = bincode::deserialize(data)?;
        if entry.lsn != header.lsn {
            return Err(DiscountError::WalCorruption(format!(
                "LSN mismatch: header {}, entry {}",
                header.lsn, entry.lsn
            )));
        }

        Ok(entry)
    }

    /// CRC32 of an entry's data section
    pub fn compute_crc(data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }
}
