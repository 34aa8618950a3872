//! RowTable implementation
//!
//! BTreeMap rows plus a HashMap unique key index.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use crate::wal::Operation;

use super::{Row, RowId, Undo};

#[derive(Debug, Clone)]
struct RowData {
    key: Vec<u8>,
    value: Vec<u8>,
}

/// In-memory relation: rows by id plus a unique key index
///
/// Not internally synchronized; the engine owning it sits behind the
/// connection lock.
#[derive(Debug)]
pub struct RowTable {
    rows: BTreeMap<RowId, RowData>,
    index: HashMap<Vec<u8>, RowId>,
    next_row_id: RowId,
    /// Approximate payload size in bytes (keys + values)
    size: usize,
}

impl RowTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self::with_next_row_id(RowId::FIRST)
    }

    /// Create an empty table whose counter resumes at `next_row_id`
    pub fn with_next_row_id(next_row_id: RowId) -> Self {
        Self {
            rows: BTreeMap::new(),
            index: HashMap::new(),
            next_row_id: next_row_id.max(RowId::FIRST),
            size: 0,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Row id holding `key`, if any
    pub fn lookup(&self, key: &[u8]) -> Option<RowId> {
        self.index.get(key).copied()
    }

    /// Value stored under `key`
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let row_id = self.lookup(key)?;
        self.rows.get(&row_id).map(|row| row.value.as_slice())
    }

    /// Up to `limit` rows with id strictly greater than `after`, ascending
    pub fn page_after(&self, after: Option<RowId>, limit: usize) -> Vec<Row> {
        let lower = match after {
            Some(row_id) => Bound::Excluded(row_id),
            None => Bound::Unbounded,
        };

        self.rows
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(row_id, row)| Row {
                row_id: *row_id,
                key: row.key.clone(),
                value: row.value.clone(),
            })
            .collect()
    }

    /// Iterate over all rows in ascending row id order
    pub fn iter(&self) -> impl Iterator<Item = (RowId, &[u8], &[u8])> + '_ {
        self.rows
            .iter()
            .map(|(row_id, row)| (*row_id, row.key.as_slice(), row.value.as_slice()))
    }

    /// Number of live rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Approximate size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// The id the next insert will receive
    pub fn next_row_id(&self) -> RowId {
        self.next_row_id
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Hand out a fresh row id
    pub fn allocate_row_id(&mut self) -> RowId {
        let row_id = self.next_row_id;
        self.next_row_id = row_id.next();
        row_id
    }

    /// Apply a logged operation, returning how to reverse it
    ///
    /// Returns `None` when the operation changed nothing (update or delete of
    /// a row that is not there, which only happens during replay).
    pub fn apply(&mut self, operation: &Operation) -> Option<Undo> {
        match operation {
            Operation::Insert { row_id, key, value } => {
                let previous = self.remove_row(*row_id);
                self.insert_row(*row_id, key.clone(), value.clone());
                Some(match previous {
                    Some((key, value)) => Undo::Deleted { row_id: *row_id, key, value },
                    None => Undo::Inserted { row_id: *row_id },
                })
            }
            Operation::Update { row_id, value } => {
                let row = self.rows.get_mut(row_id)?;
                let previous = std::mem::replace(&mut row.value, value.clone());
                self.size = self.size - previous.len() + value.len();
                Some(Undo::Updated { row_id: *row_id, previous })
            }
            Operation::Delete { row_id } => {
                let (key, value) = self.remove_row(*row_id)?;
                Some(Undo::Deleted { row_id: *row_id, key, value })
            }
        }
    }

    /// Reverse an operation applied earlier in the same transaction
    pub fn revert(&mut self, undo: Undo) {
        match undo {
            Undo::Inserted { row_id } => {
                self.remove_row(row_id);
            }
            Undo::Updated { row_id, previous } => {
                if let Some(row) = self.rows.get_mut(&row_id) {
                    self.size = self.size - row.value.len() + previous.len();
                    row.value = previous;
                }
            }
            Undo::Deleted { row_id, key, value } => {
                self.insert_row(row_id, key, value);
            }
        }
    }

    /// Rebuild the key index from the rows
    ///
    /// Replay touches rows by id only; the index is derived afterwards.
    pub fn rebuild_index(&mut self) {
        self.index.clear();
        self.size = 0;
        for (row_id, row) in &self.rows {
            self.index.insert(row.key.clone(), *row_id);
            self.size += row.key.len() + row.value.len();
        }
    }

    /// Insert a row loaded from a table file
    pub(crate) fn load_row(&mut self, row_id: RowId, key: Vec<u8>, value: Vec<u8>) {
        self.insert_row(row_id, key, value);
    }

    fn insert_row(&mut self, row_id: RowId, key: Vec<u8>, value: Vec<u8>) {
        self.size += key.len() + value.len();
        self.index.insert(key.clone(), row_id);
        self.rows.insert(row_id, RowData { key, value });
        if row_id >= self.next_row_id {
            self.next_row_id = row_id.next();
        }
    }

    fn remove_row(&mut self, row_id: RowId) -> Option<(Vec<u8>, Vec<u8>)> {
        let row = self.rows.remove(&row_id)?;
        if self.index.get(&row.key) == Some(&row_id) {
            self.index.remove(&row.key);
        }
        self.size -= row.key.len() + row.value.len();
        Some((row.key, row.value))
    }
}

impl Default for RowTable {
    fn default() -> Self {
        Self::new()
    }
}
