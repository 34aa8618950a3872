//! Error types for KVL
//!
//! Provides a unified error type for all operations.
//!
//! Constraint no-ops (add on an existing key, update/delete on a missing key)
//! are not errors and never show up here.

use thiserror::Error;

/// Result type alias using KvlError
pub type Result<T> = std::result::Result<T, KvlError>;

/// Unified error type for KVL operations
#[derive(Debug, Error)]
pub enum KvlError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("WAL write failed: {0}")]
    WalWrite(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Failed to encode value: {0}")]
    Encode(String),

    #[error("Failed to decode value: {0}")]
    Decode(String),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Store is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KvlError {
    /// True for faults raised by the storage engine itself (I/O, WAL, table file,
    /// transaction state), as opposed to codec or lifecycle errors.
    pub fn is_engine_failure(&self) -> bool {
        matches!(
            self,
            KvlError::Io(_)
                | KvlError::WalCorruption(_)
                | KvlError::WalWrite(_)
                | KvlError::Storage(_)
                | KvlError::Transaction(_)
        )
    }
}
