//! Key-Value Store
//!
//! Typed CRUD surface over the row engine.
//!
//! ## Write Semantics
//! | Operation | Key absent      | Key present          |
//! |-----------|-----------------|----------------------|
//! | `add`     | insert          | no-op (keeps value)  |
//! | `upsert`  | insert          | replace value        |
//! | `update`  | no-op           | replace value        |
//! | `delete`  | no-op           | remove               |
//!
//! Batch variants apply the same per-entry logic, in order, inside one
//! transaction. A batch is all-or-nothing: any error rolls back every entry
//! already applied and nothing reaches the WAL.

use std::borrow::Borrow;
use std::marker::PhantomData;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{BincodeSerializer, Serializer};
use crate::config::Config;
use crate::connection::StoreConnection;
use crate::engine::TableEngine;
use crate::error::Result;
use crate::scan::PaginatedScanner;
use crate::storage::TableFile;

/// Per-entry write logic shared by single and batch calls
type EntryOp = fn(&mut TableEngine, &[u8], &[u8]) -> Result<()>;

/// A typed key-value store
///
/// Keys are raw bytes compared byte-for-byte; values go through `S`.
///
/// The store may be shared between threads (statements are serialized on
/// the connection lock), but the order of statements issued from different
/// threads is up to the caller.
pub struct KeyValueStore<T, S = BincodeSerializer<T>> {
    connection: StoreConnection,
    serializer: S,
    page_size: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> KeyValueStore<T, BincodeSerializer<T>>
where
    T: Serialize + DeserializeOwned,
{
    /// Open a store whose values are bincode-encoded
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with(config, BincodeSerializer::new())
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }
}

impl<T, S: Serializer<T>> KeyValueStore<T, S> {
    /// Open a store with an explicit value serializer
    pub fn open_with(config: Config, serializer: S) -> Result<Self> {
        let page_size = config.page_size;
        let connection = StoreConnection::open(config)?;

        Ok(Self {
            connection,
            serializer,
            page_size,
            _marker: PhantomData,
        })
    }

    // =========================================================================
    // Single-entry Operations
    // =========================================================================

    /// Insert `value` under `key` unless the key already exists
    pub fn add(&self, key: impl AsRef<[u8]>, value: &T) -> Result<()> {
        self.write_one(key.as_ref(), value, Self::add_entry)
    }

    /// Insert or replace the value under `key`
    pub fn upsert(&self, key: impl AsRef<[u8]>, value: &T) -> Result<()> {
        self.write_one(key.as_ref(), value, Self::upsert_entry)
    }

    /// Replace the value under `key` if the key exists
    pub fn update(&self, key: impl AsRef<[u8]>, value: &T) -> Result<()> {
        self.write_one(key.as_ref(), value, Self::update_entry)
    }

    /// Remove `key` if present
    pub fn delete(&self, key: impl AsRef<[u8]>) -> Result<()> {
        let key = key.as_ref();
        self.connection.with_engine(|engine| Self::delete_entry(engine, key))
    }

    /// Point lookup; `Ok(None)` when the key is absent
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<T>> {
        let key = key.as_ref();
        let bytes = self
            .connection
            .with_engine(|engine| Ok(engine.select(key).map(<[u8]>::to_vec)))?;

        bytes.map(|bytes| self.serializer.decode(&bytes)).transpose()
    }

    /// Lazily read every `(key, value)` pair in insertion order
    ///
    /// The scanner pages through the live table; see `PaginatedScanner` for
    /// its consistency under concurrent writes.
    pub fn scan(&self) -> PaginatedScanner<'_, T, S> {
        PaginatedScanner::new(&self.connection, &self.serializer, self.page_size)
    }

    // =========================================================================
    // Batch Operations
    // =========================================================================

    /// `add` each pair, in order, atomically
    pub fn add_batch<I, K, V>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: Borrow<T>,
    {
        self.write_batch("add", entries, Self::add_entry)
    }

    /// `upsert` each pair, in order, atomically
    pub fn upsert_batch<I, K, V>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: Borrow<T>,
    {
        self.write_batch("upsert", entries, Self::upsert_entry)
    }

    /// `update` each pair, in order, atomically
    pub fn update_batch<I, K, V>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: Borrow<T>,
    {
        self.write_batch("update", entries, Self::update_entry)
    }

    /// `delete` each key, in order, atomically
    pub fn delete_batch<I, K>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        let mut txn = self.connection.transaction()?;
        for key in keys {
            Self::delete_entry(&mut *txn, key.as_ref())?;
        }
        let applied = txn.commit()?;
        tracing::debug!(op = "delete", applied, "batch committed");
        Ok(())
    }

    // =========================================================================
    // Lifecycle & Introspection
    // =========================================================================

    /// Number of entries
    pub fn len(&self) -> Result<usize> {
        self.connection.with_engine(|engine| Ok(engine.row_count()))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Persist the table file now and truncate the WAL
    pub fn checkpoint(&self) -> Result<TableFile> {
        self.connection.with_engine(|engine| engine.checkpoint())
    }

    /// Release the engine; later operations fail with `Closed`
    pub fn close(&self) -> Result<()> {
        self.connection.close()
    }

    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }

    // =========================================================================
    // Per-entry Logic
    // =========================================================================

    fn write_one(&self, key: &[u8], value: &T, op: EntryOp) -> Result<()> {
        let bytes = self.serializer.encode(value)?;
        self.connection.with_engine(|engine| op(engine, key, &bytes))
    }

    fn write_batch<I, K, V>(&self, name: &'static str, entries: I, op: EntryOp) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: Borrow<T>,
    {
        let mut txn = self.connection.transaction()?;
        for (key, value) in entries {
            let bytes = self.serializer.encode(value.borrow())?;
            op(&mut *txn, key.as_ref(), &bytes)?;
        }
        let applied = txn.commit()?;
        tracing::debug!(op = name, applied, "batch committed");
        Ok(())
    }

    fn add_entry(engine: &mut TableEngine, key: &[u8], value: &[u8]) -> Result<()> {
        if !engine.insert_or_ignore(key, value)? {
            tracing::debug!(key_len = key.len(), "add skipped, key already present");
        }
        Ok(())
    }

    fn upsert_entry(engine: &mut TableEngine, key: &[u8], value: &[u8]) -> Result<()> {
        engine.insert_or_replace(key, value)?;
        Ok(())
    }

    fn update_entry(engine: &mut TableEngine, key: &[u8], value: &[u8]) -> Result<()> {
        if !engine.update(key, value)? {
            tracing::debug!(key_len = key.len(), "update skipped, key absent");
        }
        Ok(())
    }

    fn delete_entry(engine: &mut TableEngine, key: &[u8]) -> Result<()> {
        if !engine.delete(key)? {
            tracing::debug!(key_len = key.len(), "delete skipped, key absent");
        }
        Ok(())
    }
}
