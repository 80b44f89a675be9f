//! # pgguard
//!
//! Guarded SQL execution for PostgreSQL.
//!
//! Every statement passes a validator before it reaches the driver and, in
//! debug mode, has its query plan audited for sequential scans afterwards.
//! Transactions roll back deterministically on errors and panics, and driver
//! errors are classified into three recoverable conditions plus one fatal
//! category.
//!
//! ## Features
//!
//! - **Statement guards**: placeholder arity, mandatory WHERE, `NOWAIT` on
//!   locking reads, `updated_at` on every UPDATE
//! - **Plan audit**: `EXPLAIN` with sequential scans disabled; a plan that
//!   still scans sequentially aborts the operation
//! - **Panic-safe transactions**: rollback on error or panic, commit refused
//!   after a swallowed driver error
//! - **Typed rows**: `#[derive(Record)]` maps annotated fields to columns
//! - **Statement builders**: select / insert / bulk insert / update / delete
//!   generated from a record type
//!
//! ## Example
//!
//! ```ignore
//! use pgguard::{Db, Executor, Filter, GuardConfig, Page, Record};
//!
//! #[derive(Debug, Default, Record)]
//! struct TableForTest {
//!     #[orm(column = "id")]
//!     id: uuid::Uuid,
//!     #[orm(column = "uid")]
//!     uid: String,
//!     #[orm(column = "name")]
//!     name: Option<String>,
//! }
//!
//! let db = Db::connect(&std::env::var("DATABASE_URL")?, GuardConfig::from_env()?)?;
//!
//! db.transaction(|tx| Box::pin(async move {
//!     tx.insert(&TableForTest { uid: "u-1".into(), ..Default::default() }).await?;
//!     Ok(())
//! }))
//! .await?;
//!
//! let rows: Vec<TableForTest> = db
//!     .find(&Filter::new().eq("uid", "u-1"), &Page::new())
//!     .await?;
//! ```

extern crate self as pgguard;

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod plan;
pub mod pool;
pub mod prelude;
pub mod qb;
pub mod record;
pub mod row;
pub mod text;
pub mod transaction;
pub mod validate;

pub use client::Executor;
pub use config::{GuardConfig, LOG_SQL_ENV, MODE_ENV, Mode};
pub use db::Db;
pub use error::{Fatal, GuardError, GuardResult, classify};
pub use plan::{MAX_PLAN_DEPTH, PlanAuditor, PlanNode, decode_plan};
pub use pool::{create_pool, create_pool_with_config};
pub use qb::{Assignments, BuiltQuery, DEFAULT_IGNORED, Filter, Page, Param, SetValue};
pub use record::{FieldDef, Record, RecordDescriptor, descriptor_of, table_name, to_table_name};
pub use row::{ColumnPlan, ResultSet, materialize};
pub use text::{contains_any_ignore_case, contains_ignore_case};
pub use transaction::Tx;
pub use validate::{
    QueryValidator, SEQ_SCAN_CHECK_DISABLE, WHERE_CHECK_DISABLE, disable_seq_scan_check,
    disable_where_check,
};

// Re-exported for derive-generated code and callers naming driver types.
pub use tokio_postgres;

#[cfg(feature = "derive")]
pub use pgguard_derive::Record;
