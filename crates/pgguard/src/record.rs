//! Record types and their column descriptors.

use crate::error::{Fatal, GuardResult};
use crate::qb::Param;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use tokio_postgres::Row;

/// One `(field, column)` pair of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub field: &'static str,
    pub column: &'static str,
}

impl FieldDef {
    pub const fn new(field: &'static str, column: &'static str) -> Self {
        Self { field, column }
    }
}

/// A struct whose fields map one-to-one onto table columns.
///
/// This trait should typically be derived using `#[derive(Record)]`, which
/// requires every field to carry `#[orm(column = "...")]`.
///
/// # Example
///
/// ```ignore
/// use pgguard::Record;
///
/// #[derive(Debug, Default, Record)]
/// struct OrderItem {
///     #[orm(column = "id")]
///     id: uuid::Uuid,
///     #[orm(column = "sku")]
///     sku: String,
///     #[orm(column = "note")]
///     note: Option<String>,
/// }
///
/// assert_eq!(pgguard::table_name::<OrderItem>().unwrap(), "order_items");
/// ```
pub trait Record: Default + Send + Sync + 'static {
    /// Declared type name; the table name is derived from it.
    const NAME: &'static str;

    /// Fields in declaration order.
    const FIELDS: &'static [FieldDef];

    /// Decode result column `column` of `row` into field number `field`.
    fn decode_field(
        &mut self,
        field: usize,
        row: &Row,
        column: usize,
    ) -> Result<(), tokio_postgres::Error>;

    /// The value of field number `field` as a bind parameter.
    fn field_param(&self, field: usize) -> Option<Param>;
}

/// Column layout of a [`Record`] type, built once per type.
#[derive(Debug)]
pub struct RecordDescriptor {
    name: &'static str,
    table: String,
    fields: &'static [FieldDef],
    by_column: HashMap<&'static str, usize>,
}

impl RecordDescriptor {
    /// Validate `fields` and build the descriptor.
    ///
    /// Every field needs a non-empty, unique column name.
    pub fn build(name: &'static str, fields: &'static [FieldDef]) -> GuardResult<Self> {
        let mut by_column = HashMap::with_capacity(fields.len());
        for (idx, def) in fields.iter().enumerate() {
            if def.column.trim().is_empty() {
                return Err(Fatal::MissingColumn {
                    record: name,
                    field: def.field,
                }
                .into());
            }
            if by_column.insert(def.column, idx).is_some() {
                return Err(Fatal::DuplicateColumn {
                    record: name,
                    column: def.column,
                }
                .into());
            }
        }
        Ok(Self {
            name,
            table: to_table_name(name),
            fields,
            by_column,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> &'static [FieldDef] {
        self.fields
    }

    /// Field index for a result column name.
    pub fn field_index(&self, column: &str) -> Option<usize> {
        self.by_column.get(column).copied()
    }
}

/// Descriptor for `M`, built on first use and cached for the process.
pub fn descriptor_of<M: Record>() -> GuardResult<&'static RecordDescriptor> {
    static CACHE: OnceLock<Mutex<HashMap<TypeId, &'static RecordDescriptor>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let key = TypeId::of::<M>();

    if let Some(found) = cache
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(&key)
        .copied()
    {
        return Ok(found);
    }

    // Build outside the lock; a failed build is not cached.
    let built: &'static RecordDescriptor =
        Box::leak(Box::new(RecordDescriptor::build(M::NAME, M::FIELDS)?));

    let mut map = cache
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    Ok(*map.entry(key).or_insert(built))
}

/// Table name of `M`.
pub fn table_name<M: Record>() -> GuardResult<&'static str> {
    Ok(descriptor_of::<M>()?.table())
}

/// Convert a CamelCase type name into a pluralized snake_case table name.
///
/// A lowercase letter or digit followed by an uppercase letter gets an
/// underscore between them; the result is lowercased and suffixed with `s`.
/// No irregular plurals.
pub fn to_table_name(type_name: &str) -> String {
    static BOUNDARY: OnceLock<regex::Regex> = OnceLock::new();
    let boundary = BOUNDARY.get_or_init(|| {
        regex::Regex::new("([a-z0-9])([A-Z])").expect("invalid built-in table name regex")
    });
    let snake = boundary.replace_all(type_name, "${1}_${2}");
    format!("{}s", snake.to_lowercase())
}
