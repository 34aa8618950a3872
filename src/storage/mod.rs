//! Storage Module
//!
//! Checkpointed table file: the whole relation persisted in row id order.
//!
//! ## Responsibilities
//! - Persist every live row so the WAL can be truncated
//! - Persist the row id counter so ids are never reused across restarts
//! - Replace the previous table file atomically (write temp, fsync, rename)
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (22 bytes)                                            │
//! │   Magic: "KVTB" (4) | Version: u16 (2) | RowCount: u64 (8)   │
//! │   NextRowId: u64 (8)                                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Row Block (variable)                                         │
//! │   [RowId: u64][KeyLen: u32][ValLen: u32][Key][Value]         │
//! │   ... repeated for each row, ascending by RowId ...          │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Footer (8 bytes)                                             │
//! │   RowCRC: u32 (4) | Padding (4)                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod builder;
mod reader;

use std::path::{Path, PathBuf};

pub use builder::TableFileBuilder;
pub use reader::TableFileReader;

// =============================================================================
// Shared Constants (used by builder and reader)
// =============================================================================

/// Magic bytes identifying a KVL table file
pub(crate) const MAGIC: &[u8; 4] = b"KVTB";

/// Current table file format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + RowCount (8) + NextRowId (8) = 22 bytes
pub(crate) const HEADER_SIZE: u64 = 22;

/// Footer size: RowCRC (4) + Padding (4) = 8 bytes
pub(crate) const FOOTER_SIZE: u64 = 8;

/// Per-row header: RowId (8) + KeyLen (4) + ValLen (4)
pub(crate) const ROW_HEADER_SIZE: usize = 16;

// =============================================================================
// Table File Metadata
// =============================================================================

/// Metadata describing a finished table file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFile {
    /// Path to the table file
    pub path: PathBuf,
    /// Number of rows written
    pub row_count: u64,
    /// Counter value persisted for the next insert
    pub next_row_id: u64,
    /// File size in bytes
    pub file_size: u64,
}

/// Path of the temporary file a checkpoint writes before renaming
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
