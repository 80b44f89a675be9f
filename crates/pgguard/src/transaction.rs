//! Transaction handle passed to [`Db::transaction`](crate::Db::transaction).
//!
//! A [`Tx`] is an [`Executor`], so every guarded operation available on a
//! [`Db`] runs the same way inside the transaction.
//!
//! ```ignore
//! use pgguard::{Db, Executor, GuardError};
//!
//! let result = db
//!     .transaction(|tx| Box::pin(async move {
//!         let rows: Vec<Account> = tx
//!             .query("SELECT * FROM accounts WHERE uid = $1 FOR UPDATE NOWAIT", &[&uid])
//!             .await?;
//!         tx.exec("UPDATE accounts SET balance = 0, updated_at = now() WHERE uid = $1", &[&uid])
//!             .await?;
//!         Ok(rows.len())
//!     }))
//!     .await;
//!
//! match result {
//!     Err(GuardError::LockNotAvailable) => { /* someone else holds the row */ }
//!     other => { other?; }
//! }
//! ```

use crate::client::Executor;
use crate::db::Db;
use crate::error::{Fatal, GuardError, GuardResult, classify};
use crate::row::ResultSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_postgres::types::ToSql;

/// An open transaction on one pooled connection.
///
/// Every driver error raised through the handle is remembered. PostgreSQL
/// turns COMMIT of an aborted transaction into a silent ROLLBACK, so a
/// handle that saw an error refuses to commit with
/// [`Fatal::CommitDespiteError`].
pub struct Tx<'a> {
    inner: deadpool_postgres::Transaction<'a>,
    db: &'a Db,
    failed: AtomicBool,
}

impl std::fmt::Debug for Tx<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tx")
            .field("failed", &self.is_failed())
            .finish_non_exhaustive()
    }
}

impl<'a> Tx<'a> {
    pub(crate) fn new(db: &'a Db, inner: deadpool_postgres::Transaction<'a>) -> Self {
        Self {
            inner,
            db,
            failed: AtomicBool::new(false),
        }
    }

    /// Whether a driver error has been raised inside this transaction.
    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    fn track<T>(&self, result: Result<T, tokio_postgres::Error>, sql: &str) -> GuardResult<T> {
        result.map_err(|e| {
            self.failed.store(true, Ordering::Release);
            GuardError::from_driver(e, sql)
        })
    }

    /// Commit, classifying errors raised by COMMIT itself.
    pub(crate) async fn commit(self) -> GuardResult<()> {
        if self.is_failed() {
            tracing::error!(target: "pgguard.tx", "commit requested after an error in the transaction");
            self.inner.rollback().await.map_err(|source| Fatal::Rollback {
                cause: Fatal::CommitDespiteError.to_string(),
                source,
            })?;
            return Err(Fatal::CommitDespiteError.into());
        }

        self.inner.commit().await.map_err(|e| match classify(&e) {
            Some(recoverable) => {
                tracing::info!(target: "pgguard.tx", error = %recoverable, "commit rejected");
                recoverable
            }
            None => Fatal::Commit(e).into(),
        })
    }

    pub(crate) async fn rollback(self) -> Result<(), tokio_postgres::Error> {
        self.inner.rollback().await
    }

    /// Roll back because the unit of work returned `cause`.
    pub(crate) async fn rollback_for(self, cause: &GuardError) -> GuardResult<()> {
        self.inner.rollback().await.map_err(|source| {
            tracing::error!(target: "pgguard.tx", error = %source, "rollback failed");
            Fatal::Rollback {
                cause: cause.to_string(),
                source,
            }
            .into()
        })
    }
}

impl Executor for Tx<'_> {
    fn db(&self) -> &Db {
        self.db
    }

    async fn fetch(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> GuardResult<ResultSet> {
        let statement = self.track(self.inner.prepare_cached(sql).await, sql)?;
        let rows = self.track(self.inner.query(&statement, params).await, sql)?;
        Ok(ResultSet::from_statement(&statement, rows))
    }

    async fn execute_raw(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> GuardResult<u64> {
        let statement = self.track(self.inner.prepare_cached(sql).await, sql)?;
        self.track(self.inner.execute(&statement, params).await, sql)
    }
}
