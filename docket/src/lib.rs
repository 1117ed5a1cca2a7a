//! Main docket crate: a typed data-access layer over document stores.
//!
//! This crate is the entry point for users of docket. It re-exports the core types from
//! the sub-crates, the `#[derive(Record)]` macro, and the bundled storage backends.
//!
//! # Features
//!
//! - **Typed collections** - Store any Serde type that implements [`Record`]
//! - **Hook chains** - Ordered interceptors per operation that can rewrite filters and
//!   payloads, or veto the call before the store is reached
//! - **Lifecycle capabilities** - Opt-in `BeforeInsert` / `BeforeUpdate` hooks on the record type
//! - **Multiple backends** - In-memory and MongoDB, behind one backend trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docket::{prelude::*, memory::InMemoryStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize, Record)]
//! #[record(collection = "users")]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: String,
//!     pub name: String,
//!     pub tenant: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!
//!     let mut users = store.collection::<User>();
//!
//!     // Every lookup is narrowed to one tenant.
//!     users.hooks_mut().on_find(|filter| {
//!         filter.insert("tenant", "acme");
//!         Ok(())
//!     });
//!
//!     let mut user = User { name: "Alice".into(), tenant: "acme".into(), ..Default::default() };
//!     let id = users.insert(&mut user).await?;
//!
//!     let found = users.find(doc! { "name": "Alice" }, FindOptions::default()).await?;
//!     assert_eq!(found[0].id, id);
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! A `DocumentStore` can be converted into a [`DynDocumentStore`](store::DynDocumentStore)
//! with `into_dyn`, for code that picks its backend at runtime. Collections obtained from it
//! behave exactly the same.
//!
//! ```ignore
//! use docket::{prelude::*, memory::InMemoryStore};
//!
//! let store = DocumentStore::new(InMemoryStore::new()).into_dyn();
//! let users = store.collection::<User>();
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires the `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as docket;

pub mod prelude;

pub use docket_core::{backend, collection, config, error, hooks, id, query, record, store};

pub use docket_core::{
    collection::Collection,
    error::{DocumentStoreError, DocumentStoreResult},
    record::Record,
    store::DocumentStore,
};

/// Derives [`Record`] for a struct. See the `docket-macros` crate for the attributes.
pub use docket_macros::Record;

// Re-exported for backend implementors.
pub use async_trait::async_trait;
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docket_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docket_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
