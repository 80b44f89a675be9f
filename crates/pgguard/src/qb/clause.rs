//! Clause lists handed to the statement builders.
//!
//! Clause fragments use `?` as a generic placeholder marker. The builders
//! rewrite markers to `$1, $2, ...` from left to right, so values must be
//! supplied in the same order as the markers appear.

use crate::qb::param::{Param, ParamList};
use tokio_postgres::types::ToSql;

/// WHERE clauses (joined with `AND`) and the values their markers bind.
#[derive(Clone, Debug, Default)]
pub struct Filter {
    pub(crate) clauses: Vec<String>,
    pub(crate) values: ParamList,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a clause fragment, e.g. `"name = ?"` or `"is_active = true"`.
    pub fn and(mut self, clause: &str) -> Self {
        self.clauses.push(clause.to_string());
        self
    }

    /// Append a value for the next unbound marker.
    pub fn bind<T: ToSql + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.values.push(value);
        self
    }

    /// Shorthand for `and("<column> = ?").bind(value)`.
    pub fn eq<T: ToSql + Send + Sync + 'static>(self, column: &str, value: T) -> Self {
        self.and(&format!("{column} = ?")).bind(value)
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub(crate) fn render(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// ORDER BY / LIMIT / OFFSET for reads.
#[derive(Clone, Debug, Default)]
pub struct Page {
    pub(crate) order_by: Vec<String>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an ORDER BY fragment, e.g. `"created_at DESC"`.
    pub fn order_by(mut self, clause: &str) -> Self {
        self.order_by.push(clause.to_string());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// A value bound by a SET clause.
#[derive(Clone, Debug)]
pub enum SetValue {
    Value(Param),
    /// The statement's captured instant, the same one written to `updated_at`.
    Now,
}

impl SetValue {
    pub fn value<T: ToSql + Send + Sync + 'static>(value: T) -> Self {
        Self::Value(Param::new(value))
    }
}

#[derive(Clone, Debug)]
pub(crate) struct SetClause {
    pub(crate) clause: String,
    pub(crate) values: Vec<SetValue>,
}

impl SetClause {
    /// Column on the left-hand side of `=`.
    pub(crate) fn target(&self) -> &str {
        self.clause
            .split('=')
            .next()
            .unwrap_or_default()
            .trim()
            .trim_matches('"')
    }
}

/// SET clauses for an UPDATE.
///
/// `updated_at` is always assigned by the builder; clauses targeting `id`,
/// `created_at`, or `updated_at` are dropped together with their values.
#[derive(Clone, Debug, Default)]
pub struct Assignments {
    pub(crate) clauses: Vec<SetClause>,
}

impl Assignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// `"<column> = ?"` bound to `value`.
    pub fn set<T: ToSql + Send + Sync + 'static>(self, column: &str, value: T) -> Self {
        self.clause(&format!("{column} = ?"), vec![SetValue::value(value)])
    }

    /// `"<column> = ?"` bound to the statement's captured instant.
    pub fn set_now(self, column: &str) -> Self {
        self.clause(&format!("{column} = ?"), vec![SetValue::Now])
    }

    /// An arbitrary expression with no markers, e.g. `"age = (age + 1)"`.
    pub fn expr(self, clause: &str) -> Self {
        self.clause(clause, Vec::new())
    }

    /// An arbitrary clause together with the values for its markers.
    pub fn clause(mut self, clause: &str, values: Vec<SetValue>) -> Self {
        self.clauses.push(SetClause {
            clause: clause.to_string(),
            values,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}
