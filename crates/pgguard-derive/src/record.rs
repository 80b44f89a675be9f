//! Record derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use std::collections::HashMap;
use syn::{Data, DeriveInput, Fields, LitStr, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let type_name = name.to_string();
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let mut seen: HashMap<String, &syn::Ident> = HashMap::new();
    let mut defs = Vec::with_capacity(fields.len());
    let mut decode_arms = Vec::with_capacity(fields.len());
    let mut param_arms = Vec::with_capacity(fields.len());

    for (idx, field) in fields.iter().enumerate() {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let column = column_name(field)?;
        if let Some(previous) = seen.insert(column.value(), ident) {
            return Err(syn::Error::new_spanned(
                &column,
                format!(
                    "column \"{}\" is already mapped by field `{previous}`",
                    column.value()
                ),
            ));
        }

        let field_name = ident.to_string();
        defs.push(quote! {
            pgguard::FieldDef::new(#field_name, #column)
        });
        decode_arms.push(quote! {
            #idx => self.#ident = row.try_get(column)?,
        });
        param_arms.push(quote! {
            #idx => ::core::option::Option::Some(
                pgguard::Param::new(::core::clone::Clone::clone(&self.#ident))
            ),
        });
    }

    Ok(quote! {
        impl #impl_generics pgguard::Record for #name #ty_generics #where_clause {
            const NAME: &'static str = #type_name;

            const FIELDS: &'static [pgguard::FieldDef] = &[
                #(#defs),*
            ];

            fn decode_field(
                &mut self,
                field: usize,
                row: &pgguard::tokio_postgres::Row,
                column: usize,
            ) -> ::core::result::Result<(), pgguard::tokio_postgres::Error> {
                match field {
                    #(#decode_arms)*
                    _ => {}
                }
                ::core::result::Result::Ok(())
            }

            fn field_param(&self, field: usize) -> ::core::option::Option<pgguard::Param> {
                match field {
                    #(#param_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}

/// The `#[orm(column = "...")]` value of a field. Every field must carry one.
fn column_name(field: &syn::Field) -> Result<LitStr> {
    let mut column: Option<LitStr> = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("column") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().trim().is_empty() {
                    return Err(meta.error("column name must not be empty"));
                }
                column = Some(value);
                Ok(())
            } else {
                Err(meta.error("unsupported orm attribute, expected `column = \"...\"`"))
            }
        })?;
    }

    column.ok_or_else(|| {
        syn::Error::new_spanned(
            field,
            "every Record field needs #[orm(column = \"...\")]",
        )
    })
}
