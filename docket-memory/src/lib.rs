//! In-memory document storage backend for docket.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development,
//! tests and small data sets.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Mongo-style filters** - Implicit equality, dotted paths, comparison operators,
//!   `$in`/`$nin`, `$exists`, `$not` and `$and`/`$or`/`$nor`
//! - **Update operators** - `$set`, `$unset` and `$inc`
//! - **Find options** - Sorting, skip and limit
//!
//! # Quick Start
//!
//! ```ignore
//! use docket::{DocumentStore, Record, memory::InMemoryStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize, Record)]
//! #[record(collection = "users")]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::new());
//!     let users = store.collection::<User>();
//!
//!     let mut user = User { name: "Alice".to_string(), ..Default::default() };
//!     users.insert(&mut user).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docket_memory;

mod evaluator;
pub mod store;
mod update;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
