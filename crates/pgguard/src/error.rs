//! Error types for pgguard
//!
//! Errors come in two tiers. The three variants of [`GuardError`] other than
//! [`GuardError::Fatal`] are recoverable conditions a caller is expected to
//! match on. Everything else is a [`Fatal`] abort: a programming, schema, or
//! infrastructure failure that should end the current unit of work and reach
//! a top-level boundary.

use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Result type alias for pgguard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors returned by guarded execution.
#[derive(Debug, Error)]
pub enum GuardError {
    /// `NOWAIT` locking read hit a row that is already locked (SQLSTATE 55P03).
    #[error("lock not available")]
    LockNotAvailable,

    /// Unique constraint violation (SQLSTATE 23505).
    #[error("violate unique constraint")]
    UniqueViolation,

    /// Deadlock detected by the server (SQLSTATE 40P01).
    #[error("deadlock detected")]
    Deadlock,

    /// Unrecoverable failure.
    #[error(transparent)]
    Fatal(#[from] Fatal),
}

/// Programmer, schema, or infrastructure failures.
#[derive(Debug, Error)]
pub enum Fatal {
    #[error("the number of placeholders ({placeholders}) must match the number of args ({args})")]
    PlaceholderMismatch { placeholders: usize, args: usize },

    #[error("read statement does not contain SELECT: {sql}")]
    NotSelect { sql: String },

    #[error("select sql must use where keyword: {sql}")]
    SelectWithoutWhere { sql: String },

    #[error("delete sql must use where keyword: {sql}")]
    DeleteWithoutWhere { sql: String },

    #[error("update sql must use where keyword: {sql}")]
    UpdateWithoutWhere { sql: String },

    #[error("update sql must have updated_at field: {sql}")]
    UpdateWithoutUpdatedAt { sql: String },

    #[error("locking read must use nowait: {sql}")]
    LockingReadWithoutNowait { sql: String },

    #[error("sql executed by Seq Scan: {sql}")]
    SeqScan { sql: String },

    #[error("malformed query plan: {0}")]
    PlanDecode(String),

    #[error("record {record} has no field for result column '{column}'")]
    UnknownColumn { record: &'static str, column: String },

    #[error("field '{field}' of record {record} has no column annotation")]
    MissingColumn {
        record: &'static str,
        field: &'static str,
    },

    #[error("record {record} maps column '{column}' more than once")]
    DuplicateColumn {
        record: &'static str,
        column: &'static str,
    },

    #[error("failed to decode column '{column}' into {record}: {source}")]
    Decode {
        record: &'static str,
        column: String,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("query failed: {source}, failed query: {sql}")]
    Query {
        sql: String,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("pool error: {0}")]
    Pool(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("begin transaction failed: {0}")]
    Begin(#[source] tokio_postgres::Error),

    #[error("you have executed commit despite there is error in transaction")]
    CommitDespiteError,

    #[error("commit failed: {0}")]
    Commit(#[source] tokio_postgres::Error),

    #[error("rollback failed after `{cause}`: {source}")]
    Rollback {
        cause: String,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("invalid mode '{0}' (expected \"debug\" or \"production\")")]
    InvalidMode(String),

    #[error("{operation} is only allowed in debug mode")]
    DebugOnly { operation: &'static str },
}

impl GuardError {
    /// Returns `true` for the three recoverable driver conditions.
    pub fn is_recoverable(&self) -> bool {
        !self.is_fatal()
    }

    /// Returns `true` if this is an abort-category error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// Borrow the fatal cause, if any.
    pub fn as_fatal(&self) -> Option<&Fatal> {
        match self {
            Self::Fatal(fatal) => Some(fatal),
            _ => None,
        }
    }

    /// Translate a driver error raised while running `sql`.
    ///
    /// Lock-not-available, unique-violation, and deadlock become their typed
    /// variants; anything else is [`Fatal::Query`] carrying the statement.
    pub fn from_driver(err: tokio_postgres::Error, sql: &str) -> Self {
        classify(&err).unwrap_or_else(|| {
            Self::Fatal(Fatal::Query {
                sql: sql.to_string(),
                source: err,
            })
        })
    }
}

/// Map a driver error onto one of the recoverable variants, if it is one.
pub fn classify(err: &tokio_postgres::Error) -> Option<GuardError> {
    let code = err.code()?;
    if *code == SqlState::LOCK_NOT_AVAILABLE {
        Some(GuardError::LockNotAvailable)
    } else if *code == SqlState::UNIQUE_VIOLATION {
        Some(GuardError::UniqueViolation)
    } else if *code == SqlState::T_R_DEADLOCK_DETECTED {
        Some(GuardError::Deadlock)
    } else {
        None
    }
}

impl From<deadpool_postgres::PoolError> for GuardError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Fatal(Fatal::Pool(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_converts_into_guard_error() {
        let err: GuardError = Fatal::CommitDespiteError.into();
        assert!(err.is_fatal());
        assert!(!err.is_recoverable());
        assert!(matches!(err.as_fatal(), Some(Fatal::CommitDespiteError)));
    }

    #[test]
    fn recoverable_variants_are_not_fatal() {
        for err in [
            GuardError::LockNotAvailable,
            GuardError::UniqueViolation,
            GuardError::Deadlock,
        ] {
            assert!(err.is_recoverable());
            assert!(err.as_fatal().is_none());
        }
    }

    #[test]
    fn seq_scan_message_carries_statement() {
        let err = Fatal::SeqScan {
            sql: "SELECT * FROM users WHERE name = $1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "sql executed by Seq Scan: SELECT * FROM users WHERE name = $1"
        );
    }

    #[test]
    fn placeholder_mismatch_message() {
        let err = Fatal::PlaceholderMismatch {
            placeholders: 2,
            args: 1,
        };
        assert_eq!(
            err.to_string(),
            "the number of placeholders (2) must match the number of args (1)"
        );
    }
}
