//! Statement generation from [`Record`](crate::Record) types.
//!
//! Builders only produce text and bind values; execution goes through an
//! [`Executor`](crate::Executor), so generated statements meet the same
//! validator and plan auditor as hand-written ones.
//!
//! Clause fragments use `?` as the placeholder marker. Every marker in the
//! assembled statement is rewritten to `$1, $2, ...` from left to right.
//!
//! ```ignore
//! use pgguard::qb::{self, Filter, Page};
//!
//! let q = qb::select_sql::<User>(
//!     &Filter::new().eq("name", "alice").and("is_active = true"),
//!     &Page::new().order_by("created_at DESC").limit(20),
//! )?;
//! assert_eq!(
//!     q.sql,
//!     "SELECT * FROM users WHERE name = $1 AND is_active = true ORDER BY created_at DESC LIMIT $2"
//! );
//! ```

mod clause;
mod delete;
mod insert;
mod param;
mod select;
mod update;


pub use clause::{Assignments, Filter, Page, SetValue};
pub use delete::delete_sql;
pub use insert::{bulk_insert_sql, insert_sql};
pub use param::{Param, ParamList};
pub use select::select_sql;
pub use update::update_sql;

pub(crate) use update::update_sql_at;

use tokio_postgres::types::ToSql;

/// Columns left to database defaults on insert: identity, creation and
/// update timestamps.
pub const DEFAULT_IGNORED: &[&str] = &["id", "created_at", "updated_at"];

/// Generated statement text and its positional parameters.
#[derive(Clone, Debug)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: ParamList,
}

impl BuiltQuery {
    pub fn new(sql: String, params: ParamList) -> Self {
        Self { sql, params }
    }

    /// Parameters in the form `tokio-postgres` binds.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.as_refs()
    }
}

/// Replace every `?` in `sql` with `$start+1`, `$start+2`, ... in order.
pub fn rewrite_placeholders(sql: &str, start: usize) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut idx = start;
    for ch in sql.chars() {
        if ch == '?' {
            idx += 1;
            out.push('$');
            out.push_str(&idx.to_string());
        } else {
            out.push(ch);
        }
    }
    out
}
