//! Result materialization: rows → records.

use crate::error::{Fatal, GuardResult};
use crate::record::{Record, RecordDescriptor, descriptor_of};
use tokio_postgres::{Row, Statement};

/// Rows returned by a read, together with the result column names in the
/// order the server sent them.
#[derive(Debug, Default)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Take column names from the prepared statement so they are known even
    /// when no row comes back.
    pub fn from_statement(statement: &Statement, rows: Vec<Row>) -> Self {
        let columns = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// For each result column, the record field it is decoded into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    fields: Vec<usize>,
}

impl ColumnPlan {
    /// Resolve result columns against the descriptor.
    ///
    /// A column with no matching field means the record and the statement
    /// disagree about the schema; that is [`Fatal::UnknownColumn`].
    pub fn resolve<S: AsRef<str>>(desc: &RecordDescriptor, columns: &[S]) -> GuardResult<Self> {
        let fields = columns
            .iter()
            .map(|column| {
                let column = column.as_ref();
                desc.field_index(column).ok_or_else(|| Fatal::UnknownColumn {
                    record: desc.name(),
                    column: column.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { fields })
    }

    /// Field index for each result column, in result order.
    pub fn fields(&self) -> &[usize] {
        &self.fields
    }

    /// Decode one row into a fresh `M::default()`.
    pub fn decode<M: Record>(&self, row: &Row) -> GuardResult<M> {
        let mut record = M::default();
        for (column, &field) in self.fields.iter().enumerate() {
            record
                .decode_field(field, row, column)
                .map_err(|source| Fatal::Decode {
                    record: M::NAME,
                    column: row.columns()[column].name().to_string(),
                    source,
                })?;
        }
        Ok(record)
    }
}

/// Map every row of `set` onto `M`.
///
/// Zero rows yield an empty vector. Each row starts from `M::default()`, so
/// a field with no result column keeps its default.
pub fn materialize<M: Record>(set: &ResultSet) -> GuardResult<Vec<M>> {
    let desc = descriptor_of::<M>()?;
    let plan = ColumnPlan::resolve(desc, &set.columns)?;

    let mut out = Vec::with_capacity(set.rows.len());
    for row in &set.rows {
        out.push(plan.decode(row)?);
    }
    Ok(out)
}
