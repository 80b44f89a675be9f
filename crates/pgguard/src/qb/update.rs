//! UPDATE generation.

use crate::error::GuardResult;
use crate::qb::clause::{Assignments, Filter, SetValue};
use crate::qb::param::ParamList;
use crate::qb::{BuiltQuery, rewrite_placeholders};
use crate::record::{Record, table_name};
use chrono::{DateTime, Utc};

/// Columns the builder never takes from caller assignments.
const PROTECTED: &[&str] = &["id", "created_at", "updated_at"];

/// `UPDATE <table> SET ..., updated_at = $n` with an optional WHERE.
///
/// `updated_at` and every [`SetValue::Now`] bind one instant captured per
/// call. Values bind in the order set-values, that instant, where-values.
pub fn update_sql<M: Record>(set: &Assignments, filter: &Filter) -> GuardResult<BuiltQuery> {
    update_sql_at::<M>(set, filter, Utc::now())
}

pub(crate) fn update_sql_at<M: Record>(
    set: &Assignments,
    filter: &Filter,
    now: DateTime<Utc>,
) -> GuardResult<BuiltQuery> {
    let table = table_name::<M>()?;

    let mut clauses = Vec::with_capacity(set.clauses.len() + 1);
    let mut params = ParamList::new();

    for clause in &set.clauses {
        let target = clause.target();
        if PROTECTED.iter().any(|c| *c == target) {
            tracing::debug!(
                target: "pgguard.sql",
                clause = %clause.clause,
                "skipping assignment to builder-owned column"
            );
            continue;
        }
        clauses.push(clause.clause.as_str());
        for value in &clause.values {
            match value {
                SetValue::Value(param) => params.push_param(param.clone()),
                SetValue::Now => params.push(now),
            };
        }
    }

    clauses.push("updated_at = ?");
    params.push(now);
    params.extend(&filter.values);

    let sql = format!(
        "UPDATE {table} SET {}{}",
        clauses.join(", "),
        filter.render()
    );
    Ok(BuiltQuery::new(rewrite_placeholders(&sql, 0), params))
}
