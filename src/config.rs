//! Configuration for KVL
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{KvlError, Result};
use crate::schema::Schema;

/// Main configuration for a KVL store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── {table}.wal      (write-ahead log)
    ///     └── {table}.tbl      (checkpointed table file)
    pub data_dir: PathBuf,

    /// Relation and column names
    pub schema: Schema,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    /// WAL size (in bytes) that triggers an automatic checkpoint
    pub checkpoint_threshold: u64,

    // -------------------------------------------------------------------------
    // Scan Configuration
    // -------------------------------------------------------------------------
    /// Rows fetched per page during a full scan
    pub page_size: usize,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./kvl_data"),
            schema: Schema::default(),
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            checkpoint_threshold: 64 * 1024 * 1024, // 64 MB
            page_size: Config::DEFAULT_PAGE_SIZE,
        }
    }
}

impl Config {
    /// Reference page size for full scans
    pub const DEFAULT_PAGE_SIZE: usize = 512;

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the config before opening a store
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(KvlError::Config("page_size must be greater than 0".to_string()));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(KvlError::Config(
                "EveryNEntries sync count must be greater than 0".to_string(),
            ));
        }
        self.schema.validate().map_err(KvlError::Config)
    }

    /// Path of the write-ahead log
    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join(self.schema.wal_file_name())
    }

    /// Path of the checkpointed table file
    pub fn table_path(&self) -> PathBuf {
        self.data_dir.join(self.schema.table_file_name())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the relation descriptor
    pub fn schema(mut self, schema: Schema) -> Self {
        self.config.schema = schema;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the WAL size (in bytes) that triggers a checkpoint
    pub fn checkpoint_threshold(mut self, bytes: u64) -> Self {
        self.config.checkpoint_threshold = bytes;
        self
    }

    /// Set the scan page size (rows per page)
    pub fn page_size(mut self, rows: usize) -> Self {
        self.config.page_size = rows;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
