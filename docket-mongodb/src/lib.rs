//! MongoDB backend implementation for docket.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait. Filters and
//! update expressions are passed to the server unchanged, so the full MongoDB query and
//! update language is available to collections and hooks.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docket = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docket::{DocumentStore, backend::StoreBackendBuilder, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = MongoDbStore::builder("mongodb://localhost:27017", "my_database")
//!         .build()
//!         .await?;
//!     let store = DocumentStore::new(backend);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docket_mongodb;

pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
