//! Store Connection
//!
//! Owns the one engine handle a store uses.
//!
//! ## Lifecycle
//! - Opened on construction
//! - Released exactly once: by `close()` or, failing that, on drop
//! - `close()` after close is a no-op; every other call fails with `Closed`
//!
//! ## Concurrency
//! The engine sits behind a `parking_lot::Mutex`: statements execute one at a
//! time in the order they acquire the lock. A `Transaction` holds the lock
//! until it commits or is dropped.

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::config::Config;
use crate::engine::TableEngine;
use crate::error::{KvlError, Result};

/// Exclusive owner of a `TableEngine`
pub struct StoreConnection {
    /// `None` once closed
    engine: Mutex<Option<TableEngine>>,
}

impl StoreConnection {
    /// Open the engine described by `config`
    pub fn open(config: Config) -> Result<Self> {
        let engine = TableEngine::open(config)?;
        Ok(Self {
            engine: Mutex::new(Some(engine)),
        })
    }

    /// Run `f` against the engine as a single statement
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut TableEngine) -> Result<R>) -> Result<R> {
        let mut guard = self.engine.lock();
        let engine = guard.as_mut().ok_or(KvlError::Closed)?;
        f(engine)
    }

    /// Begin a transaction
    ///
    /// The returned guard holds the engine lock. Calling back into this
    /// connection from the same thread before the guard is gone deadlocks.
    pub fn transaction(&self) -> Result<Transaction<'_>> {
        let engine = MutexGuard::try_map(self.engine.lock(), |engine| engine.as_mut())
            .map_err(|_| KvlError::Closed)?;
        Transaction::begin(engine)
    }

    /// Release the engine (checkpoint + sync); a second call is a no-op
    pub fn close(&self) -> Result<()> {
        let engine = self.engine.lock().take();
        match engine {
            Some(engine) => engine.close(),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.engine.lock().is_none()
    }
}

impl Drop for StoreConnection {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.get_mut().take() {
            if let Err(e) = engine.close() {
                tracing::error!(error = %e, "failed to close engine on drop");
            }
        }
    }
}

/// A scoped transaction
///
/// Dereferences to the engine. `commit()` makes every statement durable as
/// one WAL entry; dropping the guard without committing rolls them all back.
pub struct Transaction<'a> {
    engine: MappedMutexGuard<'a, TableEngine>,
    finished: bool,
}

impl<'a> Transaction<'a> {
    fn begin(mut engine: MappedMutexGuard<'a, TableEngine>) -> Result<Self> {
        engine.begin()?;
        Ok(Self {
            engine,
            finished: false,
        })
    }

    /// Commit; returns the number of row operations made durable
    pub fn commit(mut self) -> Result<usize> {
        self.finished = true;
        self.engine.commit()
    }

    /// Roll back explicitly; returns the number of row operations reverted
    pub fn rollback(mut self) -> Result<usize> {
        self.finished = true;
        self.engine.rollback()
    }
}

impl std::ops::Deref for Transaction<'_> {
    type Target = TableEngine;

    fn deref(&self) -> &TableEngine {
        &self.engine
    }
}

impl std::ops::DerefMut for Transaction<'_> {
    fn deref_mut(&mut self) -> &mut TableEngine {
        &mut self.engine
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        match self.engine.rollback() {
            Ok(reverted) => tracing::warn!(reverted, "transaction dropped without commit, rolled back"),
            Err(e) => tracing::error!(error = %e, "rollback of dropped transaction failed"),
        }
    }
}
