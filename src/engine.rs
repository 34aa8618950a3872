//! Engine Module
//!
//! The row engine underneath the typed store.
//!
//! ## Responsibilities
//! - Execute statements against the relation with the unique key constraint
//!   (insert-or-ignore, insert-or-replace, update, delete, select)
//! - Log every effect to the WAL before it counts as durable
//! - Group statements into atomic transactions with rollback
//! - Checkpoint the table file and truncate the WAL
//! - Manage crash recovery on startup

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{KvlError, Result};
use crate::storage::{TableFile, TableFileBuilder, TableFileReader};
use crate::table::{Row, RowId, RowTable, Undo};
use crate::wal::{Operation, WalRecovery, WalWriter};

/// Effects recorded while a transaction is open
#[derive(Debug, Default)]
struct TxnState {
    /// Reverse of each applied operation, in application order
    undo: Vec<Undo>,
    /// Operations to log as one WAL entry at commit
    redo: Vec<Operation>,
}

/// The row engine
///
/// ## Execution Model
///
/// - **Autocommit** (no transaction open): each statement appends one WAL
///   entry, then applies to the in-memory table.
/// - **Transaction**: statements apply to the table immediately (later
///   statements see earlier ones) and record undo/redo. `commit` appends all
///   redo as a single WAL entry; `rollback`, or a failed commit, replays the
///   undo records in reverse.
///
/// All methods that change state take `&mut self`; the owning connection
/// serializes access.
pub struct TableEngine {
    /// Engine configuration
    config: Config,

    /// Write-ahead log path
    wal_path: PathBuf,

    /// Table file path
    table_path: PathBuf,

    /// Write-ahead log for durability
    wal: WalWriter,

    /// Every live row
    table: RowTable,

    /// Open transaction, if any
    txn: Option<TxnState>,
}

impl TableEngine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Load the table file if one exists
    /// 3. Recover the WAL (drop torn tail) and replay it
    /// 4. Checkpoint replayed entries so the WAL starts empty
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;

        let wal_path = config.wal_path();
        let table_path = config.table_path();

        // Step 2: Load the last checkpoint
        let mut table = if table_path.exists() {
            TableFileReader::load(&table_path)?
        } else {
            RowTable::new()
        };

        // Step 3: Replay the WAL on top of it
        let mut replayed = 0u64;
        if wal_path.exists() {
            let (entries, recovery_result) = WalRecovery::recover(&wal_path)?;

            if recovery_result.entries_recovered > 0 || recovery_result.entries_corrupted > 0 {
                tracing::info!(
                    table = config.schema.table(),
                    recovered = recovery_result.entries_recovered,
                    corrupted = recovery_result.entries_corrupted,
                    last_lsn = recovery_result.last_lsn,
                    "WAL recovery"
                );
            }

            for entry in &entries {
                for operation in &entry.operations {
                    table.apply(operation);
                }
            }
            table.rebuild_index();
            replayed = recovery_result.entries_recovered;
        }

        let wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?;

        let mut engine = Self {
            config,
            wal_path,
            table_path,
            wal,
            table,
            txn: None,
        };

        // Step 4: Make recovered data durable in the table file
        if replayed > 0 {
            engine.checkpoint()?;
        }

        tracing::info!(
            table = engine.config.schema.table(),
            data_dir = %engine.config.data_dir.display(),
            rows = engine.table.len(),
            bytes = engine.table_size(),
            next_row_id = %engine.table.next_row_id(),
            "engine opened"
        );

        Ok(engine)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Insert a row unless `key` already exists
    ///
    /// Returns `false` (and changes nothing) when the key is present.
    pub fn insert_or_ignore(&mut self, key: &[u8], value: &[u8]) -> Result<bool> {
        if self.table.lookup(key).is_some() {
            return Ok(false);
        }

        let row_id = self.table.allocate_row_id();
        self.execute(Operation::Insert {
            row_id,
            key: key.to_vec(),
            value: value.to_vec(),
        })?;
        Ok(true)
    }

    /// Insert a row, or replace the value of the existing row in place
    ///
    /// Returns the row id now holding `key`.
    pub fn insert_or_replace(&mut self, key: &[u8], value: &[u8]) -> Result<RowId> {
        let (row_id, operation) = match self.table.lookup(key) {
            Some(row_id) => (row_id, Operation::Update { row_id, value: value.to_vec() }),
            None => {
                let row_id = self.table.allocate_row_id();
                (
                    row_id,
                    Operation::Insert { row_id, key: key.to_vec(), value: value.to_vec() },
                )
            }
        };

        self.execute(operation)?;
        Ok(row_id)
    }

    /// Replace the value of an existing row; `false` if `key` is absent
    pub fn update(&mut self, key: &[u8], value: &[u8]) -> Result<bool> {
        let Some(row_id) = self.table.lookup(key) else {
            return Ok(false);
        };

        self.execute(Operation::Update { row_id, value: value.to_vec() })?;
        Ok(true)
    }

    /// Remove the row holding `key`; `false` if `key` is absent
    pub fn delete(&mut self, key: &[u8]) -> Result<bool> {
        let Some(row_id) = self.table.lookup(key) else {
            return Ok(false);
        };

        self.execute(Operation::Delete { row_id })?;
        Ok(true)
    }

    /// Value stored under `key`
    pub fn select(&self, key: &[u8]) -> Option<&[u8]> {
        self.table.get(key)
    }

    /// Up to `limit` rows with row id greater than `after`, ascending
    ///
    /// `after = None` starts from the lowest row id.
    pub fn select_page_after(&self, after: Option<RowId>, limit: usize) -> Vec<Row> {
        self.table.page_after(after, limit)
    }

    /// Run one operation: buffered inside a transaction, logged otherwise
    fn execute(&mut self, operation: Operation) -> Result<()> {
        if let Some(txn) = self.txn.as_mut() {
            if let Some(undo) = self.table.apply(&operation) {
                txn.undo.push(undo);
            }
            txn.redo.push(operation);
            return Ok(());
        }

        // WAL first (durability guarantee), then the table
        self.wal.append(vec![operation.clone()])?;
        self.table.apply(&operation);
        self.maybe_checkpoint();
        Ok(())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Open a transaction
    pub fn begin(&mut self) -> Result<()> {
        if self.txn.is_some() {
            return Err(KvlError::Transaction(
                "a transaction is already active".to_string(),
            ));
        }
        self.txn = Some(TxnState::default());
        Ok(())
    }

    /// Commit the open transaction as one WAL entry
    ///
    /// Returns the number of row operations committed. If the WAL append
    /// fails the transaction is rolled back before the error is returned.
    pub fn commit(&mut self) -> Result<usize> {
        let txn = self
            .txn
            .take()
            .ok_or_else(|| KvlError::Transaction("no active transaction".to_string()))?;

        if txn.redo.is_empty() {
            return Ok(0);
        }

        let count = txn.redo.len();
        if let Err(e) = self.wal.append(txn.redo) {
            self.revert(txn.undo);
            return Err(e);
        }

        self.maybe_checkpoint();
        Ok(count)
    }

    /// Discard the open transaction, reverting every applied operation
    ///
    /// Returns the number of row operations reverted.
    pub fn rollback(&mut self) -> Result<usize> {
        let txn = self
            .txn
            .take()
            .ok_or_else(|| KvlError::Transaction("no active transaction".to_string()))?;

        let count = txn.redo.len();
        self.revert(txn.undo);
        Ok(count)
    }

    /// Whether a transaction is open
    pub fn in_transaction(&self) -> bool {
        self.txn.is_some()
    }

    fn revert(&mut self, undo: Vec<Undo>) {
        for record in undo.into_iter().rev() {
            self.table.revert(record);
        }
    }

    // =========================================================================
    // Checkpoints & Lifecycle
    // =========================================================================

    /// Write the whole table to the table file and truncate the WAL
    pub fn checkpoint(&mut self) -> Result<TableFile> {
        if self.txn.is_some() {
            return Err(KvlError::Transaction(
                "cannot checkpoint inside a transaction".to_string(),
            ));
        }

        // Step 1: Write every row to a fresh table file (atomic rename)
        let mut builder = TableFileBuilder::new(&self.table_path)?;
        for (row_id, key, value) in self.table.iter() {
            builder.add(row_id, key, value)?;
        }
        let table_file = builder.finish(self.table.next_row_id())?;

        // Step 2: Truncate WAL (entries are now durable in the table file)
        self.wal.truncate()?;

        tracing::info!(
            table = self.config.schema.table(),
            rows = table_file.row_count,
            bytes = table_file.file_size,
            "checkpoint complete"
        );

        Ok(table_file)
    }

    /// Checkpoint when the WAL has grown past the configured threshold
    ///
    /// Runs after the write is already durable in the WAL. A failure is
    /// logged, the WAL is kept, and the write still succeeds.
    fn maybe_checkpoint(&mut self) {
        if self.wal.size_bytes() < self.config.checkpoint_threshold {
            return;
        }
        if let Err(e) = self.checkpoint() {
            tracing::warn!(
                table = self.config.schema.table(),
                wal_bytes = self.wal.size_bytes(),
                error = %e,
                "automatic checkpoint failed, WAL kept"
            );
        }
    }

    /// Close the engine gracefully
    ///
    /// Rolls back an open transaction, checkpoints and syncs to disk.
    pub fn close(mut self) -> Result<()> {
        if self.txn.is_some() {
            let reverted = self.rollback()?;
            tracing::warn!(reverted, "open transaction rolled back on close");
        }

        if self.wal.size_bytes() > 0 || !self.table_path.exists() {
            self.checkpoint()?;
        }
        self.wal.sync()?;

        tracing::info!(table = self.config.schema.table(), "engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of live rows
    pub fn row_count(&self) -> usize {
        self.table.len()
    }

    /// Approximate size of the live rows in bytes
    pub fn table_size(&self) -> usize {
        self.table.size()
    }

    /// The id the next insert will receive
    pub fn next_row_id(&self) -> RowId {
        self.table.next_row_id()
    }

    /// Current WAL length in bytes
    pub fn wal_size(&self) -> u64 {
        self.wal.size_bytes()
    }

    /// Path of the write-ahead log
    pub fn wal_path(&self) -> &Path {
        &self.wal_path
    }

    /// Path of the table file
    pub fn table_path(&self) -> &Path {
        &self.table_path
    }
}
