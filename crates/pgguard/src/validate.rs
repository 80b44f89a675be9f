//! Statement guards run before a statement reaches the driver.
//!
//! Every check is a case-insensitive substring test over the statement text;
//! nothing here parses SQL. A keyword inside a string literal satisfies a
//! check just as well as a real clause does.
//!
//! Placeholders are counted by the number of `$` characters, so one
//! parameter cannot be referenced twice in the same statement.

use crate::config::GuardConfig;
use crate::error::{Fatal, GuardResult};
use crate::text::{contains_any_ignore_case, contains_ignore_case};

/// Marker that disables the mandatory WHERE check for one statement.
///
/// Insert it as a tautology: `WHERE 'where check disable'='where check disable'`.
pub const WHERE_CHECK_DISABLE: &str = "where check disable";

/// Marker that disables the sequential-scan audit for one statement.
pub const SEQ_SCAN_CHECK_DISABLE: &str = "seq scan check disable";

/// Tautological clause that opts a statement out of the WHERE check.
pub fn disable_where_check() -> String {
    format!("'{WHERE_CHECK_DISABLE}'='{WHERE_CHECK_DISABLE}'")
}

/// Tautological clause that opts a statement out of the plan audit.
pub fn disable_seq_scan_check() -> String {
    format!("'{SEQ_SCAN_CHECK_DISABLE}'='{SEQ_SCAN_CHECK_DISABLE}'")
}

/// The `$` count must equal the argument count.
pub fn check_placeholders(sql: &str, args: usize) -> GuardResult<()> {
    let placeholders = sql.matches('$').count();
    if placeholders != args {
        return Err(Fatal::PlaceholderMismatch { placeholders, args }.into());
    }
    Ok(())
}

/// Read statements must contain `SELECT `.
pub fn check_select(sql: &str) -> GuardResult<()> {
    if !contains_ignore_case(sql, "SELECT ") {
        return Err(Fatal::NotSelect {
            sql: sql.to_string(),
        }
        .into());
    }
    Ok(())
}

/// `FOR UPDATE` / `FOR SELECT` must be paired with `NOWAIT`.
pub fn check_nowait(sql: &str) -> GuardResult<()> {
    let locking = contains_any_ignore_case(sql, &[" FOR SELECT", " FOR UPDATE"]);
    if locking && !contains_ignore_case(sql, " NOWAIT") {
        return Err(Fatal::LockingReadWithoutNowait {
            sql: sql.to_string(),
        }
        .into());
    }
    Ok(())
}

fn has_where(sql: &str) -> bool {
    contains_ignore_case(sql, " WHERE ") || contains_ignore_case(sql, WHERE_CHECK_DISABLE)
}

/// Validator for statements about to be executed.
#[derive(Debug, Clone, Default)]
pub struct QueryValidator {
    config: GuardConfig,
}

impl QueryValidator {
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Checks for the read path (`query` / `query_first`).
    pub fn check_read(&self, sql: &str, args: usize) -> GuardResult<()> {
        check_placeholders(sql, args)?;
        check_select(sql)?;
        if self.config.where_check && !has_where(sql) {
            return Err(Fatal::SelectWithoutWhere {
                sql: sql.to_string(),
            }
            .into());
        }
        if self.config.nowait_check {
            check_nowait(sql)?;
        }
        Ok(())
    }

    /// Checks for the write path (`exec`).
    pub fn check_write(&self, sql: &str, args: usize) -> GuardResult<()> {
        check_placeholders(sql, args)?;

        if self.config.where_check && contains_ignore_case(sql, "DELETE ") && !has_where(sql) {
            return Err(Fatal::DeleteWithoutWhere {
                sql: sql.to_string(),
            }
            .into());
        }

        if contains_ignore_case(sql, "UPDATE ") {
            if self.config.where_check && !has_where(sql) {
                return Err(Fatal::UpdateWithoutWhere {
                    sql: sql.to_string(),
                }
                .into());
            }
            if self.config.updated_at_check && !contains_ignore_case(sql, "updated_at") {
                return Err(Fatal::UpdateWithoutUpdatedAt {
                    sql: sql.to_string(),
                }
                .into());
            }
        }

        if self.config.nowait_check {
            check_nowait(sql)?;
        }
        Ok(())
    }
}
