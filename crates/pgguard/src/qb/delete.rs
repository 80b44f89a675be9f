//! DELETE generation.

use crate::error::GuardResult;
use crate::qb::clause::Filter;
use crate::qb::{BuiltQuery, rewrite_placeholders};
use crate::record::{Record, table_name};

/// `DELETE FROM <table>` with an optional WHERE.
///
/// An empty filter produces a statement the write-path validator rejects
/// unless WHERE checking is switched off.
pub fn delete_sql<M: Record>(filter: &Filter) -> GuardResult<BuiltQuery> {
    let table = table_name::<M>()?;
    let sql = format!("DELETE FROM {table}{}", filter.render());
    Ok(BuiltQuery::new(
        rewrite_placeholders(&sql, 0),
        filter.values.clone(),
    ))
}
