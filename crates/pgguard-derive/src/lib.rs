//! Derive macros for pgguard
//!
//! Provides `#[derive(Record)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record;

/// Derive the `Record` trait for a struct.
///
/// # Example
///
/// ```ignore
/// use pgguard::Record;
///
/// #[derive(Debug, Default, Record)]
/// struct TableForTest {
///     #[orm(column = "id")]
///     id: uuid::Uuid,
///     #[orm(column = "uid")]
///     uid: String,
///     #[orm(column = "name")]
///     name: Option<String>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(column = "name")]` - Column the field maps to (required on every field)
///
/// Field types must implement `FromSql`, `ToSql` and `Clone`; the struct must
/// implement `Default`.
#[proc_macro_derive(Record, attributes(orm))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
