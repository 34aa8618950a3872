//! Table File Builder
//!
//! Writes rows (ascending by row id) to a new table file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{KvlError, Result};
use crate::table::RowId;

use super::{temp_path, TableFile, HEADER_SIZE, MAGIC, VERSION};

/// Builder for a table file
///
/// Rows go to `{path}.tmp`; `finish()` makes the file durable and renames it
/// over `path`, so a crash mid-checkpoint leaves the previous file intact.
pub struct TableFileBuilder {
    /// Final file path
    path: PathBuf,
    /// Temporary file path being written
    temp_path: PathBuf,
    /// Buffered writer for performance
    writer: BufWriter<File>,
    /// Number of rows written
    row_count: u64,
    /// Last row id written (enforces ascending order)
    last_row_id: Option<RowId>,
    /// Running CRC hasher for the row block
    row_hasher: crc32fast::Hasher,
}

impl TableFileBuilder {
    /// Create a new builder
    ///
    /// Writes the header immediately; call `add()` in ascending row id order,
    /// then `finish()` to write the footer and publish the file.
    pub fn new(path: &Path) -> Result<Self> {
        let temp_path = temp_path(path);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)?;

        let mut writer = BufWriter::new(file);

        // Row count and next row id are patched in finish()
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&0u64.to_le_bytes())?;
        writer.write_all(&0u64.to_le_bytes())?;

        Ok(Self {
            path: path.to_path_buf(),
            temp_path,
            writer,
            row_count: 0,
            last_row_id: None,
            row_hasher: crc32fast::Hasher::new(),
        })
    }

    /// Add a row (must be called in ascending row id order)
    pub fn add(&mut self, row_id: RowId, key: &[u8], value: &[u8]) -> Result<()> {
        if let Some(last) = self.last_row_id {
            if row_id <= last {
                return Err(KvlError::Storage(format!(
                    "rows out of order: {} written after {}",
                    row_id, last
                )));
            }
        }

        let row_id_bytes = row_id.get().to_le_bytes();
        let key_len_bytes = (key.len() as u32).to_le_bytes();
        let val_len_bytes = (value.len() as u32).to_le_bytes();

        let parts: [&[u8]; 5] = [&row_id_bytes, &key_len_bytes, &val_len_bytes, key, value];
        for part in parts {
            self.writer.write_all(part)?;
            self.row_hasher.update(part);
        }

        self.last_row_id = Some(row_id);
        self.row_count += 1;

        Ok(())
    }

    /// Finish: write footer, patch header, fsync, rename over the final path
    pub fn finish(mut self, next_row_id: RowId) -> Result<TableFile> {
        let row_crc = self.row_hasher.finalize();

        self.writer.write_all(&row_crc.to_le_bytes())?;
        self.writer.write_all(&[0u8; 4])?; // Padding for alignment
        self.writer.flush()?;

        let mut file = self.writer.into_inner().map_err(|e| {
            KvlError::Storage(format!("Failed to flush table file: {}", e))
        })?;
        file.seek(SeekFrom::Start(6))?; // After magic + version
        file.write_all(&self.row_count.to_le_bytes())?;
        file.write_all(&next_row_id.get().to_le_bytes())?;
        file.sync_all()?;

        let file_size = file.metadata()?.len();
        debug_assert!(file_size >= HEADER_SIZE);
        drop(file);

        fs::rename(&self.temp_path, &self.path)?;
        sync_parent_dir(&self.path);

        Ok(TableFile {
            path: self.path,
            row_count: self.row_count,
            next_row_id: next_row_id.get(),
            file_size,
        })
    }
}

/// Persist the rename itself; not every platform lets a directory be opened
fn sync_parent_dir(path: &Path) {
    if let Some(dir) = path.parent() {
        if let Ok(dir) = File::open(dir) {
            let _ = dir.sync_all();
        }
    }
}
