//! The execution seam shared by [`Db`] and [`Tx`](crate::Tx).
//!
//! Implementors supply two raw driver calls. Every guarded operation is a
//! default method built on them, so a statement run on the pool and one run
//! inside a transaction go through the same validator and plan auditor.
//!
//! Order per statement: validate, execute, materialize (reads), then audit
//! the plan when the mode is debug.

use crate::db::Db;
use crate::error::GuardResult;
use crate::qb::{self, Assignments, BuiltQuery, Filter, Page};
use crate::record::Record;
use crate::row::{ResultSet, materialize};
use std::future::Future;
use tokio_postgres::types::ToSql;

/// A handle that can run statements.
pub trait Executor: Send + Sync {
    /// The database handle whose configuration guards this executor.
    fn db(&self) -> &Db;

    /// Run a statement and return its rows together with the result column
    /// names. No validation.
    fn fetch(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = GuardResult<ResultSet>> + Send;

    /// Run a statement and return the affected row count. No validation.
    fn execute_raw(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = GuardResult<u64>> + Send;

    /// Validated, audited read mapped onto `M`.
    ///
    /// Zero rows give an empty vector.
    fn query<M: Record>(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = GuardResult<Vec<M>>> + Send {
        async move {
            let db = self.db();
            db.validator().check_read(sql, params.len())?;
            log_statement(db, sql, params);

            let set = self.fetch(sql, params).await?;
            let records = materialize::<M>(&set)?;
            db.audit(sql, params).await?;
            Ok(records)
        }
    }

    /// Like [`query`](Self::query) but returns only the first record.
    fn query_first<M: Record>(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = GuardResult<Option<M>>> + Send {
        async move {
            let records = self.query::<M>(sql, params).await?;
            Ok(records.into_iter().next())
        }
    }

    /// Validated, audited write. Returns the affected row count.
    fn exec(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = GuardResult<u64>> + Send {
        async move {
            let db = self.db();
            db.validator().check_write(sql, params.len())?;
            log_statement(db, sql, params);

            let affected = self.execute_raw(sql, params).await?;
            db.audit(sql, params).await?;
            Ok(affected)
        }
    }

    /// `SELECT * FROM <table of M>` with `filter` and `page`.
    fn find<M: Record>(
        &self,
        filter: &Filter,
        page: &Page,
    ) -> impl Future<Output = GuardResult<Vec<M>>> + Send {
        async move {
            let built = qb::select_sql::<M>(filter, page)?;
            self.query::<M>(&built.sql, &built.params_ref()).await
        }
    }

    /// First record matching `filter`, if any.
    fn first<M: Record>(
        &self,
        filter: &Filter,
        page: &Page,
    ) -> impl Future<Output = GuardResult<Option<M>>> + Send {
        async move {
            let built = qb::select_sql::<M>(filter, page)?;
            self.query_first::<M>(&built.sql, &built.params_ref()).await
        }
    }

    /// Insert one record, leaving `id`, `created_at` and `updated_at` to
    /// database defaults.
    fn insert<M: Record>(&self, record: &M) -> impl Future<Output = GuardResult<u64>> + Send {
        self.insert_ignoring(record, qb::DEFAULT_IGNORED)
    }

    /// Insert one record, leaving the `ignored` columns to database defaults.
    fn insert_ignoring<M: Record>(
        &self,
        record: &M,
        ignored: &[&str],
    ) -> impl Future<Output = GuardResult<u64>> + Send {
        async move {
            let built = qb::insert_sql(record, ignored)?;
            self.exec_built(&built).await
        }
    }

    /// Insert every record in one statement. Nothing to insert is a no-op.
    fn bulk_insert<M: Record>(
        &self,
        records: &[M],
    ) -> impl Future<Output = GuardResult<u64>> + Send {
        async move {
            match qb::bulk_insert_sql(records, qb::DEFAULT_IGNORED)? {
                Some(built) => self.exec_built(&built).await,
                None => Ok(0),
            }
        }
    }

    /// Update rows of `M`'s table; `updated_at` is always set.
    fn update<M: Record>(
        &self,
        set: &Assignments,
        filter: &Filter,
    ) -> impl Future<Output = GuardResult<u64>> + Send {
        async move {
            let built = qb::update_sql::<M>(set, filter)?;
            self.exec_built(&built).await
        }
    }

    /// Delete rows of `M`'s table.
    fn delete<M: Record>(&self, filter: &Filter) -> impl Future<Output = GuardResult<u64>> + Send {
        async move {
            let built = qb::delete_sql::<M>(filter)?;
            self.exec_built(&built).await
        }
    }

    #[doc(hidden)]
    fn exec_built(&self, built: &BuiltQuery) -> impl Future<Output = GuardResult<u64>> + Send {
        async move { self.exec(&built.sql, &built.params_ref()).await }
    }
}

fn log_statement(db: &Db, sql: &str, params: &[&(dyn ToSql + Sync)]) {
    if db.config().log_sql {
        tracing::debug!(target: "pgguard.sql", sql, ?params, "guarded statement");
    }
}
