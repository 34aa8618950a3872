//! # KVL
//!
//! A typed key-value store layered over a durable row engine:
//! - Typed CRUD with distinct add / upsert / update semantics
//! - Atomic, all-or-nothing batch writes
//! - Lazy full-table scans with keyset pagination
//! - Write-Ahead Logging (WAL) with crash recovery and checkpoints
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  KeyValueStore<T, S>                        │
//! │     add / upsert / update / delete / get / scan / batch     │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │ Serializer<T>                │
//!                │ (T <-> bytes)                │ PaginatedScanner
//! ┌──────────────▼──────────────────────────────▼───────────────┐
//! │                     StoreConnection                          │
//! │          (one engine handle, Mutex, Transaction)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      TableEngine                             │
//! │     (unique key constraint, autocommit, undo/redo txns)      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────────┐
//!          │            │                     │
//!          ▼            ▼                     ▼
//!   ┌─────────────┐ ┌─────────────┐   ┌──────────────┐
//!   │     WAL     │ │  RowTable   │   │  Table File  │
//!   │  (Append)   │ │ (by RowId)  │   │ (Checkpoint) │
//!   └─────────────┘ └─────────────┘   └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use kvl::{Config, KeyValueStore};
//!
//! let config = Config::builder().data_dir("./data").build();
//! let store: KeyValueStore<String> = KeyValueStore::open(config)?;
//!
//! store.add(b"user:1", &"alice".to_string())?;
//! assert_eq!(store.get(b"user:1")?, Some("alice".to_string()));
//!
//! for entry in store.scan() {
//!     let (key, value) = entry?;
//!     println!("{:?} => {}", key, value);
//! }
//! # Ok::<(), kvl::KvlError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod schema;

pub mod wal;
pub mod table;
pub mod storage;
pub mod engine;

pub mod codec;
pub mod connection;
pub mod scan;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvlError, Result};
pub use config::{Config, WalSyncStrategy};
pub use schema::{ColumnRole, Schema};
pub use codec::{BincodeSerializer, RawSerializer, Serializer, Utf8Serializer};
pub use connection::{StoreConnection, Transaction};
pub use engine::TableEngine;
pub use scan::PaginatedScanner;
pub use store::KeyValueStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of KVL
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
