//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their on-disk frame.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{KvlError, Result};
use crate::table::RowId;

/// Frame header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Upper bound on a single frame payload; larger lengths are treated as corruption
pub(crate) const MAX_PAYLOAD_SIZE: usize = 1 << 30;

/// A single entry in the WAL
///
/// One entry is one atomic unit: either a single autocommit statement or
/// every effect of a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The row-level effects, in execution order
    pub operations: Vec<Operation>,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Row-level effects that can be logged
///
/// Effects are assignments addressed by row id, so replaying a suffix of the
/// log onto a table that already contains it converges to the same state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// A new row
    Insert { row_id: RowId, key: Vec<u8>, value: Vec<u8> },

    /// In-place value replacement
    Update { row_id: RowId, value: Vec<u8> },

    /// Row removal
    Delete { row_id: RowId },
}

impl Operation {
    pub fn row_id(&self) -> RowId {
        match self {
            Operation::Insert { row_id, .. }
            | Operation::Update { row_id, .. }
            | Operation::Delete { row_id } => *row_id,
        }
    }
}

impl WalEntry {
    /// Create an entry stamped with the current wall-clock time
    pub fn new(lsn: u64, operations: Vec<Operation>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self { lsn, operations, timestamp }
    }

    /// Encode into a complete frame: `[LSN][CRC][Len][Data]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let data = bincode::serialize(&(self.timestamp, &self.operations))
            .map_err(|e| KvlError::WalWrite(format!("Failed to encode WAL entry: {}", e)))?;

        if data.len() > MAX_PAYLOAD_SIZE {
            return Err(KvlError::WalWrite(format!(
                "WAL entry of {} bytes exceeds the {} byte limit",
                data.len(),
                MAX_PAYLOAD_SIZE
            )));
        }

        let len = data.len() as u32;
        let crc = compute_crc(self.lsn, len, &data);

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + data.len());
        buf.put_u64_le(self.lsn);
        buf.put_u32_le(crc);
        buf.put_u32_le(len);
        buf.put_slice(&data);

        Ok(buf.to_vec())
    }

    /// Decode a complete frame, validating length and checksum
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(KvlError::WalCorruption(format!(
                "frame of {} bytes is smaller than the {} byte header",
                bytes.len(),
                HEADER_SIZE
            )));
        }

        let mut header = &bytes[..HEADER_SIZE];
        let lsn = header.get_u64_le();
        let stored_crc = header.get_u32_le();
        let len = header.get_u32_le();

        let data_end = HEADER_SIZE + len as usize;
        if bytes.len() < data_end {
            return Err(KvlError::WalCorruption(format!(
                "truncated frame: expected {} data bytes, found {}",
                len,
                bytes.len() - HEADER_SIZE
            )));
        }
        let data = &bytes[HEADER_SIZE..data_end];

        let actual_crc = compute_crc(lsn, len, data);
        if actual_crc != stored_crc {
            return Err(KvlError::WalCorruption(format!(
                "CRC mismatch at lsn {}: stored {:#010x}, computed {:#010x}",
                lsn, stored_crc, actual_crc
            )));
        }

        let (timestamp, operations): (u64, Vec<Operation>) = bincode::deserialize(data)
            .map_err(|e| KvlError::WalCorruption(format!("undecodable entry at lsn {}: {}", lsn, e)))?;

        Ok(Self { lsn, operations, timestamp })
    }
}

/// Read the payload length out of a frame header
pub(crate) fn payload_len(header: &[u8; HEADER_SIZE]) -> usize {
    let mut len = &header[12..16];
    len.get_u32_le() as usize
}

/// CRC over LSN, length and payload
fn compute_crc(lsn: u64, len: u32, data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&lsn.to_le_bytes());
    hasher.update(&len.to_le_bytes());
    hasher.update(data);
    hasher.finalize()
}
