//! Table Module
//!
//! In-memory relation holding every live row.
//!
//! ## Responsibilities
//! - Rows ordered by an engine-assigned `RowId` (stable scan order)
//! - Unique index from key bytes to row id
//! - Row id allocation from a counter that only grows
//! - Undo records so an open transaction can be rolled back
//!
//! ## Data Structure Choice
//! - `BTreeMap<RowId, RowData>`: ordered by insertion token, so a page is a
//!   range query starting just after the cursor
//! - `HashMap<Vec<u8>, RowId>`: O(1) uniqueness checks and point lookups

mod row_table;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use row_table::RowTable;

/// Engine-assigned ordering token
///
/// Monotonically increasing, never reused, never exposed as a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowId(pub u64);

impl RowId {
    /// First id handed out by an empty table
    pub const FIRST: RowId = RowId(1);

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn next(self) -> RowId {
        RowId(self.0 + 1)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row as returned to readers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub row_id: RowId,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// How to reverse one applied operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Undo {
    /// Remove a row that was inserted
    Inserted { row_id: RowId },

    /// Put back a row's previous value
    Updated { row_id: RowId, previous: Vec<u8> },

    /// Reinsert a row that was deleted
    Deleted { row_id: RowId, key: Vec<u8>, value: Vec<u8> },
}
