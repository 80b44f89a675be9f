//! INSERT generation from record values.

use crate::error::{Fatal, GuardResult};
use crate::qb::BuiltQuery;
use crate::qb::param::ParamList;
use crate::record::{Record, RecordDescriptor, descriptor_of};

/// Field indices that take part in the insert, in declaration order.
fn included_fields(desc: &RecordDescriptor, ignored: &[&str]) -> Vec<usize> {
    desc.fields()
        .iter()
        .enumerate()
        .filter(|(_, def)| !ignored.contains(&def.column))
        .map(|(idx, _)| idx)
        .collect()
}

fn column_list(desc: &RecordDescriptor, fields: &[usize]) -> String {
    fields
        .iter()
        .map(|&idx| format!("\"{}\"", desc.fields()[idx].column))
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_values<M: Record>(
    record: &M,
    desc: &RecordDescriptor,
    fields: &[usize],
    params: &mut ParamList,
) -> GuardResult<String> {
    let mut placeholders = Vec::with_capacity(fields.len());
    for &idx in fields {
        let param = record.field_param(idx).ok_or(Fatal::MissingColumn {
            record: desc.name(),
            field: desc.fields()[idx].field,
        })?;
        placeholders.push(format!("${}", params.push_param(param)));
    }
    Ok(format!("({})", placeholders.join(", ")))
}

/// `INSERT INTO <table> ("a", "b") VALUES ($1, $2)` for one record.
///
/// Columns named in `ignored` are left out so the database default applies;
/// pass [`DEFAULT_IGNORED`](crate::qb::DEFAULT_IGNORED) for the usual set.
/// `Option` fields bind SQL NULL when `None`.
pub fn insert_sql<M: Record>(record: &M, ignored: &[&str]) -> GuardResult<BuiltQuery> {
    let desc = descriptor_of::<M>()?;
    let fields = included_fields(desc, ignored);

    let mut params = ParamList::new();
    let values = push_values(record, desc, &fields, &mut params)?;

    let sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        desc.table(),
        column_list(desc, &fields),
        values
    );
    Ok(BuiltQuery::new(sql, params))
}

/// One INSERT with a value tuple per record; placeholders keep counting
/// across tuples.
///
/// Returns `Ok(None)` when `records` is empty.
pub fn bulk_insert_sql<M: Record>(
    records: &[M],
    ignored: &[&str],
) -> GuardResult<Option<BuiltQuery>> {
    if records.is_empty() {
        return Ok(None);
    }
    let desc = descriptor_of::<M>()?;
    let fields = included_fields(desc, ignored);

    let mut params = ParamList::new();
    let mut tuples = Vec::with_capacity(records.len());
    for record in records {
        tuples.push(push_values(record, desc, &fields, &mut params)?);
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        desc.table(),
        column_list(desc, &fields),
        tuples.join(", ")
    );
    Ok(Some(BuiltQuery::new(sql, params)))
}
