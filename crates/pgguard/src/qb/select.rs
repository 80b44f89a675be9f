//! SELECT generation.

use crate::error::GuardResult;
use crate::qb::clause::{Filter, Page};
use crate::qb::param::ParamList;
use crate::qb::{BuiltQuery, rewrite_placeholders};
use crate::record::{Record, table_name};

/// `SELECT * FROM <table>` with optional WHERE, ORDER BY, LIMIT and OFFSET.
///
/// Values bind in the order where-values, limit, offset.
pub fn select_sql<M: Record>(filter: &Filter, page: &Page) -> GuardResult<BuiltQuery> {
    let table = table_name::<M>()?;

    let mut sql = format!("SELECT * FROM {table}{}", filter.render());
    let mut params = ParamList::new();
    params.extend(&filter.values);

    if !page.order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&page.order_by.join(", "));
    }
    if let Some(limit) = page.limit {
        sql.push_str(" LIMIT ?");
        params.push(limit);
    }
    if let Some(offset) = page.offset {
        sql.push_str(" OFFSET ?");
        params.push(offset);
    }

    Ok(BuiltQuery::new(rewrite_placeholders(&sql, 0), params))
}
