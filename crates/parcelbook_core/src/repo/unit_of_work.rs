//! Transactional scope for service-level check-then-act sequences.
//!
//! # Invariants
//! - Work runs under `BEGIN IMMEDIATE`, so concurrent writers on the same
//!   database serialize before their first read.
//! - `Ok` commits; `Err` (including cancellation) rolls back everything.
//! - A call made while a transaction is already open joins it.

use super::{RepoError, RepoResult};
use log::warn;
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Runs a closure atomically against the store the repositories share.
pub trait UnitOfWork {
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>;
}

/// Unit of work over the connection shared with the SQLite repositories.
pub struct SqliteUnitOfWork<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUnitOfWork<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn begin(&self) -> RepoResult<Transaction<'conn>> {
        Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate).map_err(|err| {
            warn!(
                "event=tx_begin module=repo status=error error_code=tx_begin_failed error={}",
                err
            );
            RepoError::from(err)
        })
    }
}

impl UnitOfWork for SqliteUnitOfWork<'_> {
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>,
    {
        if !self.conn.is_autocommit() {
            return work();
        }

        let tx = self.begin()?;
        let value = work()?;
        tx.commit().map_err(RepoError::from)?;
        Ok(value)
    }
}
