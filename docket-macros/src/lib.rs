//! Procedural macros for the docket project.
//!
//! This crate provides `#[derive(Record)]`, which implements `docket::record::Record` for a
//! struct with a named identity field.

#[allow(unused_extern_crates)]
extern crate self as docket_macros;

mod record;

use proc_macro::TokenStream;

/// Derive macro for the `Record` trait.
///
/// # Attributes
///
/// On the struct, all optional:
///
/// - `collection = "..."`: collection name. Defaults to the type name in snake case.
/// - `before_insert`: the type implements `BeforeInsert`; the collection will call it.
/// - `before_update`: the type implements `BeforeUpdate`; the collection will call it.
///
/// On a field:
///
/// - `id`: marks the `String` identity field. Without it, a field named `id` is used.
///
/// # Example
///
/// ```ignore
/// use docket::Record;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Default, Serialize, Deserialize, Record)]
/// #[record(collection = "notes", before_insert)]
/// struct Note {
///     #[serde(rename = "_id")]
///     id: String,
///     title: String,
/// }
/// ```
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record(input)
}
