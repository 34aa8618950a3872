//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{KvlError, Result};

use super::{Operation, WalEntry, WalRecovery};

/// Writes entries to the WAL file
///
/// Frames are written with a single `write_all` on the raw file. An append
/// that fails (write or fsync) cuts the file back to its previous length, so
/// an entry reported as failed is never replayed. After an fsync failure, or
/// when the cut itself fails, the writer is marked failed and refuses every
/// later append; reopening the store recovers from what is on disk.
pub struct WalWriter {
    path: PathBuf,
    file: File,
    next_lsn: u64,
    sync_strategy: WalSyncStrategy,
    /// Entries written since the last fsync
    uncommitted: usize,
    /// Current file length in bytes
    size: u64,
    /// Set once the file can no longer be trusted to match `size`
    failed: bool,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// An existing file is scanned to continue its LSN sequence. Callers run
    /// `WalRecovery::recover` first so the tail is known to be clean.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let last_lsn = if path.exists() {
            WalRecovery::verify(path)?.last_lsn
        } else {
            0
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_lsn: last_lsn + 1,
            sync_strategy,
            uncommitted: 0,
            size,
            failed: false,
        })
    }

    /// Append one atomic entry holding `operations`; returns its LSN
    ///
    /// On `Err` the entry is not in the log.
    pub fn append(&mut self, operations: Vec<Operation>) -> Result<u64> {
        if self.failed {
            return Err(KvlError::WalWrite(format!(
                "{} is unusable after an earlier write failure; reopen the store",
                self.path.display()
            )));
        }

        let lsn = self.next_lsn;
        let frame = WalEntry::new(lsn, operations).serialize()?;

        if let Err(e) = self.file.write_all(&frame) {
            return Err(self.abort_append(lsn, "write", e));
        }

        let should_sync = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.uncommitted + 1 >= count,
        };
        if should_sync {
            if let Err(e) = self.sync_file() {
                // Dirty pages may already be dropped; nothing later is safe to acknowledge
                self.failed = true;
                return Err(self.abort_append(lsn, "fsync", e));
            }
            self.uncommitted = 0;
        } else {
            self.uncommitted += 1;
        }

        self.size += frame.len() as u64;
        self.next_lsn += 1;

        Ok(lsn)
    }

    /// Drop whatever part of the frame made it to the file
    fn abort_append(&mut self, lsn: u64, stage: &str, cause: std::io::Error) -> KvlError {
        if let Err(cut) = self.file.set_len(self.size) {
            self.failed = true;
            return KvlError::WalWrite(format!(
                "{} of lsn {} to {} failed ({}), and cutting the frame back failed too: {}",
                stage,
                lsn,
                self.path.display(),
                cause,
                cut
            ));
        }

        KvlError::WalWrite(format!(
            "{} of lsn {} to {} failed: {}",
            stage,
            lsn,
            self.path.display(),
            cause
        ))
    }

    fn sync_file(&mut self) -> std::io::Result<()> {
        self.file.flush()?;
        self.file.sync_data()
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        if let Err(e) = self.sync_file() {
            self.failed = true;
            return Err(KvlError::WalWrite(format!(
                "fsync of {} failed: {}",
                self.path.display(),
                e
            )));
        }
        self.uncommitted = 0;
        Ok(())
    }

    /// Discard every entry (after a checkpoint made them redundant)
    ///
    /// The LSN sequence restarts at 1, as it would on reopening an empty log.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.size = 0;
        self.next_lsn = 1;
        self.uncommitted = 0;
        Ok(())
    }

    /// The LSN the next append will receive
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Entries written since the last fsync
    pub fn uncommitted_count(&self) -> usize {
        self.uncommitted
    }

    /// Current WAL length in bytes
    pub fn size_bytes(&self) -> u64 {
        self.size
    }

    /// Whether an earlier failure has disabled appends
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
