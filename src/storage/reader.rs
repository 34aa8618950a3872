//! Table File Reader
//!
//! Loads a table file back into a `RowTable`.

use std::fs;
use std::path::Path;

use bytes::Buf;

use crate::error::{KvlError, Result};
use crate::table::{RowId, RowTable};

use super::{FOOTER_SIZE, HEADER_SIZE, MAGIC, ROW_HEADER_SIZE, VERSION};

/// Reader for table files
pub struct TableFileReader;

impl TableFileReader {
    /// Load a table file, validating header, row count and checksum
    pub fn load(path: &Path) -> Result<RowTable> {
        let data = fs::read(path)?;

        if (data.len() as u64) < HEADER_SIZE + FOOTER_SIZE {
            return Err(KvlError::Storage(format!(
                "table file {} is too short ({} bytes)",
                path.display(),
                data.len()
            )));
        }

        let mut header = &data[..HEADER_SIZE as usize];
        let mut magic = [0u8; 4];
        header.copy_to_slice(&mut magic);
        if &magic != MAGIC {
            return Err(KvlError::Storage(format!(
                "Invalid table file magic: expected KVTB, got {:?}",
                magic
            )));
        }

        let version = header.get_u16_le();
        if version != VERSION {
            return Err(KvlError::Storage(format!(
                "Unsupported table file version: {}",
                version
            )));
        }

        let row_count = header.get_u64_le();
        let next_row_id = RowId(header.get_u64_le());

        let footer_start = data.len() - FOOTER_SIZE as usize;
        let row_block = &data[HEADER_SIZE as usize..footer_start];
        let mut footer = &data[footer_start..];
        let stored_crc = footer.get_u32_le();

        let actual_crc = crc32fast::hash(row_block);
        if actual_crc != stored_crc {
            return Err(KvlError::Storage(format!(
                "table file {} failed checksum: stored {:#010x}, computed {:#010x}",
                path.display(),
                stored_crc,
                actual_crc
            )));
        }

        let mut table = RowTable::with_next_row_id(next_row_id);
        let mut rows = row_block;
        let mut loaded = 0u64;

        while rows.has_remaining() {
            if rows.remaining() < ROW_HEADER_SIZE {
                return Err(KvlError::Storage("truncated row header".to_string()));
            }
            let row_id = RowId(rows.get_u64_le());
            let key_len = rows.get_u32_le() as usize;
            let val_len = rows.get_u32_le() as usize;

            if rows.remaining() < key_len + val_len {
                return Err(KvlError::Storage(format!("truncated row {}", row_id)));
            }
            let key = rows[..key_len].to_vec();
            rows.advance(key_len);
            let value = rows[..val_len].to_vec();
            rows.advance(val_len);

            table.load_row(row_id, key, value);
            loaded += 1;
        }

        if loaded != row_count {
            return Err(KvlError::Storage(format!(
                "table file {} declares {} rows but holds {}",
                path.display(),
                row_count,
                loaded
            )));
        }

        Ok(table)
    }
}
