//! Derive macro for the `Record` trait.

use darling::{FromDeriveInput, FromField, ast::Data, util::Ignored};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, Ident, parse_macro_input};

/// Parsed struct-level attributes.
#[derive(FromDeriveInput)]
#[darling(attributes(record), supports(struct_named))]
struct RecordArgs {
    ident: Ident,
    generics: syn::Generics,
    data: Data<Ignored, RecordField>,

    /// Collection name; defaults to the snake-cased type name.
    #[darling(default)]
    collection: Option<String>,

    #[darling(default)]
    before_insert: bool,

    #[darling(default)]
    before_update: bool,
}

#[derive(FromField)]
#[darling(attributes(record))]
struct RecordField {
    ident: Option<Ident>,

    #[darling(default)]
    id: bool,
}

/// Converts `AuditEntry` into `audit_entry` and `HTTPLog` into `http_log`.
fn snake_case(name: &str) -> String {
    let chars = name.chars().collect::<Vec<_>>();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|next| next.is_lowercase());

            if prev != '_' && (!prev.is_uppercase() || next_is_lower) {
                out.push('_');
            }
        }
        out.extend(ch.to_lowercase());
    }

    out
}

/// Picks the identity field: the one marked `#[record(id)]`, else the one named `id`.
fn id_field(args: &RecordArgs) -> darling::Result<Ident> {
    let fields = match &args.data {
        Data::Struct(fields) => &fields.fields,
        Data::Enum(_) => {
            return Err(darling::Error::unsupported_shape("enum").with_span(&args.ident));
        }
    };

    let marked = fields
        .iter()
        .filter(|field| field.id)
        .filter_map(|field| field.ident.clone())
        .collect::<Vec<_>>();

    match marked.as_slice() {
        [one] => Ok(one.clone()),
        [] => fields
            .iter()
            .filter_map(|field| field.ident.clone())
            .find(|ident| ident == "id")
            .ok_or_else(|| {
                darling::Error::custom(
                    "Record needs an identity field: name it `id` or mark it with #[record(id)]",
                )
                .with_span(&args.ident)
            }),
        [_, second, ..] => Err(
            darling::Error::custom("only one field may be marked #[record(id)]").with_span(second),
        ),
    }
}

fn capability(
    enabled: bool,
    accessor: TokenStream2,
    capability: TokenStream2,
) -> TokenStream2 {
    if !enabled {
        return TokenStream2::new();
    }

    quote! {
        fn #accessor(&mut self) -> ::core::option::Option<&mut dyn ::docket::record::#capability> {
            ::core::option::Option::Some(self)
        }
    }
}

pub(crate) fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let args = match RecordArgs::from_derive_input(&input) {
        Ok(args) => args,
        Err(err) => return err.write_errors().into(),
    };

    let id = match id_field(&args) {
        Ok(id) => id,
        Err(err) => return err.write_errors().into(),
    };

    let name = &args.ident;
    let (impl_generics, ty_generics, where_clause) = args.generics.split_for_impl();

    let collection = args
        .collection
        .clone()
        .unwrap_or_else(|| snake_case(&name.to_string()));

    let before_insert = capability(args.before_insert, quote!(as_before_insert), quote!(BeforeInsert));
    let before_update = capability(args.before_update, quote!(as_before_update), quote!(BeforeUpdate));

    let expanded = quote! {
        impl #impl_generics ::docket::record::Record for #name #ty_generics #where_clause {
            fn id(&self) -> &str {
                &self.#id
            }

            fn set_id(&mut self, id: ::std::string::String) {
                self.#id = id;
            }

            fn collection_name() -> &'static str {
                #collection
            }

            #before_insert
            #before_update
        }
    };

    expanded.into()
}
