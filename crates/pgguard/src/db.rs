//! The pool-backed database handle.

use crate::client::Executor;
use crate::config::GuardConfig;
use crate::error::{Fatal, GuardError, GuardResult};
use crate::plan::PlanAuditor;
use crate::pool::create_pool;
use crate::row::ResultSet;
use crate::transaction::Tx;
use crate::validate::QueryValidator;
use deadpool_postgres::{Pool, Status};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_postgres::types::ToSql;

struct DbInner {
    pool: Pool,
    config: GuardConfig,
    validator: QueryValidator,
    auditor: PlanAuditor,
}

/// Guarded access to a connection pool.
///
/// Cheap to clone. Statements run directly on a `Db` autocommit on a pooled
/// connection; use [`Db::transaction`] to group them.
#[derive(Clone)]
pub struct Db {
    inner: Arc<DbInner>,
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("config", &self.inner.config)
            .field("pool", &self.inner.pool.status())
            .finish()
    }
}

impl Db {
    pub fn new(pool: Pool, config: GuardConfig) -> Self {
        Self {
            inner: Arc::new(DbInner {
                validator: QueryValidator::new(config.clone()),
                auditor: PlanAuditor::new(pool.clone(), config.clone()),
                pool,
                config,
            }),
        }
    }

    /// Build a pool for `database_url` and wrap it.
    pub fn connect(database_url: &str, config: GuardConfig) -> GuardResult<Self> {
        Ok(Self::new(create_pool(database_url)?, config))
    }

    pub fn config(&self) -> &GuardConfig {
        &self.inner.config
    }

    pub fn pool(&self) -> &Pool {
        &self.inner.pool
    }

    pub fn validator(&self) -> &QueryValidator {
        &self.inner.validator
    }

    pub fn auditor(&self) -> &PlanAuditor {
        &self.inner.auditor
    }

    /// Enforce the plan audit for `sql` when running in debug mode.
    fn audits_plans(&self) -> bool {
        self.inner.config.is_debug() && self.inner.config.seq_scan_check
    }

    pub(crate) async fn audit(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> GuardResult<()> {
        if !self.inner.config.is_debug() {
            return Ok(());
        }
        self.inner.auditor.enforce(sql, params).await
    }

    /// Run `work` inside a new transaction.
    ///
    /// - `Ok` commits. A recoverable error raised by COMMIT (for example a
    ///   deferred unique violation) is returned as that error.
    /// - `Err` rolls back and returns the error.
    /// - A panic rolls back and then resumes unwinding with the original
    ///   payload.
    ///
    /// ```ignore
    /// db.transaction(|tx| Box::pin(async move {
    ///     tx.exec("UPDATE accounts SET balance = $1, updated_at = now() WHERE id = $2", &[&10_i64, &id]).await?;
    ///     Ok(())
    /// }))
    /// .await?;
    /// ```
    pub async fn transaction<T, F>(&self, work: F) -> GuardResult<T>
    where
        T: Send,
        F: for<'t> FnOnce(&'t Tx<'_>) -> BoxFuture<'t, GuardResult<T>> + Send,
    {
        // The plan audit takes a second connection while this one is held.
        if self.audits_plans() && self.inner.pool.status().max_size < 2 {
            return Err(Fatal::Pool(
                "plan audit inside a transaction needs a pool of at least 2 connections"
                    .to_string(),
            )
            .into());
        }
        let mut client = self.inner.pool.get().await?;
        let inner = client.transaction().await.map_err(Fatal::Begin)?;
        let tx = Tx::new(self, inner);

        let outcome = AssertUnwindSafe(work(&tx)).catch_unwind().await;
        match outcome {
            Ok(Ok(value)) => {
                tx.commit().await?;
                Ok(value)
            }
            Ok(Err(err)) => {
                tracing::info!(target: "pgguard.tx", error = %err, "rollback start");
                tx.rollback_for(&err).await?;
                tracing::info!(target: "pgguard.tx", "rollback end");
                Err(err)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(target: "pgguard.tx", panic = %message, "rollback start because panic occurred");
                if let Err(rollback) = tx.rollback().await {
                    tracing::error!(target: "pgguard.tx", error = %rollback, "rollback failed");
                    panic!("{message} (rollback failed: {rollback})");
                }
                tracing::warn!(target: "pgguard.tx", "rollback end");
                std::panic::resume_unwind(payload)
            }
        }
    }

    /// `TRUNCATE <tables> RESTART IDENTITY`. Refused outside debug mode.
    pub async fn truncate(&self, tables: &[&str]) -> GuardResult<()> {
        if !self.inner.config.is_debug() {
            return Err(Fatal::DebugOnly {
                operation: "truncate",
            }
            .into());
        }
        if tables.is_empty() {
            return Ok(());
        }
        let sql = format!("TRUNCATE {} RESTART IDENTITY", tables.join(","));
        let client = self.inner.pool.get().await?;
        client
            .batch_execute(&sql)
            .await
            .map_err(|e| GuardError::from_driver(e, &sql))?;
        tracing::debug!(target: "pgguard", sql, "tables truncated");
        Ok(())
    }

    /// Pool status snapshot; also logged at debug level in debug mode.
    pub fn stats(&self) -> Status {
        let status = self.inner.pool.status();
        if self.inner.config.is_debug() {
            tracing::debug!(
                target: "pgguard",
                max_size = status.max_size,
                size = status.size,
                available = status.available,
                waiting = status.waiting,
                "pool stats"
            );
        }
        status
    }
}

impl Executor for Db {
    fn db(&self) -> &Db {
        self
    }

    async fn fetch(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> GuardResult<ResultSet> {
        let client = self.inner.pool.get().await?;
        let statement = client
            .prepare_cached(sql)
            .await
            .map_err(|e| GuardError::from_driver(e, sql))?;
        let rows = client
            .query(&statement, params)
            .await
            .map_err(|e| GuardError::from_driver(e, sql))?;
        Ok(ResultSet::from_statement(&statement, rows))
    }

    async fn execute_raw(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> GuardResult<u64> {
        let client = self.inner.pool.get().await?;
        let statement = client
            .prepare_cached(sql)
            .await
            .map_err(|e| GuardError::from_driver(e, sql))?;
        client
            .execute(&statement, params)
            .await
            .map_err(|e| GuardError::from_driver(e, sql))
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
