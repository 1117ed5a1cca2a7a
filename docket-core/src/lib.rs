//! A typed data-access layer over document databases.
//!
//! This crate is the core of the docket project and provides:
//!
//! - **Record traits** ([`record`]) - The [`Record`](record::Record) contract and the
//!   `BeforeInsert` / `BeforeUpdate` lifecycle capabilities
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Collections** ([`collection`]) - Typed CRUD handles that run hook chains before each call
//! - **Hook chains** ([`hooks`]) - Ordered, short-circuiting interceptors per operation
//! - **Document store** ([`store`]) - Hands out collections over a shared backend
//! - **Filters** ([`query`]) - Filter helpers, find options and a parsed filter tree for backends
//! - **Identifiers** ([`id`]) - Pluggable identifier generation
//! - **Configuration** ([`config`]) - Store-wide settings such as the per-call timeout
//! - **Error handling** ([`error`]) - Error taxonomy and result types
//!
//! # Example
//!
//! ```ignore
//! use docket_core::record::Record;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! impl Record for User {
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//!
//!     fn set_id(&mut self, id: String) {
//!         self.id = id;
//!     }
//!
//!     fn collection_name() -> &'static str {
//!         "users"
//!     }
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docket_core;

pub mod backend;
pub mod collection;
pub mod config;
pub mod error;
pub mod hooks;
pub mod id;
pub mod query;
pub mod record;
pub mod store;
