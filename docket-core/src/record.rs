//! The record contract and its optional lifecycle capabilities.
//!
//! Any type implementing [`Record`] can be stored in a
//! [`Collection`](crate::collection::Collection). A record only has to expose its identity;
//! lifecycle behavior is opt-in through the [`BeforeInsert`] and [`BeforeUpdate`]
//! capabilities, which the collection discovers at call time through
//! [`Record::as_before_insert`] and [`Record::as_before_update`].
//!
//! # Example
//!
//! ```ignore
//! use docket::record::{BeforeInsert, Record};
//! use docket::error::HookResult;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: String,
//!     pub email: String,
//! }
//!
//! impl Record for User {
//!     fn id(&self) -> &str { &self.id }
//!     fn set_id(&mut self, id: String) { self.id = id; }
//!     fn collection_name() -> &'static str { "users" }
//!
//!     fn as_before_insert(&mut self) -> Option<&mut dyn BeforeInsert> { Some(self) }
//! }
//!
//! impl BeforeInsert for User {
//!     fn before_insert(&mut self) -> HookResult {
//!         if self.email.contains('@') { Ok(()) } else { Err("invalid email".into()) }
//!     }
//! }
//! ```

use bson::{Bson, Document, de::deserialize_from_bson, ser::serialize_to_bson};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};

use crate::error::{DocumentStoreError, DocumentStoreResult, HookResult};

/// Document key under which every record stores its identity.
pub const ID_FIELD: &str = "_id";

/// Core trait that every stored record must implement.
///
/// The identity must be serialized under [`ID_FIELD`] (usually with
/// `#[serde(rename = "_id")]`). An unsaved record reports an empty id; the collection
/// assigns one on insert.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Returns the identity of this record, or `""` if it has not been saved yet.
    fn id(&self) -> &str;

    /// Replaces the identity of this record.
    fn set_id(&mut self, id: String);

    /// Returns the name of the collection this record type is stored in by default.
    fn collection_name() -> &'static str;

    /// Capability query for the pre-insert lifecycle hook.
    ///
    /// Types that implement [`BeforeInsert`] return `Some(self)`.
    fn as_before_insert(&mut self) -> Option<&mut dyn BeforeInsert> {
        None
    }

    /// Capability query for the pre-update lifecycle hook.
    ///
    /// Types that implement [`BeforeUpdate`] return `Some(self)`.
    fn as_before_update(&mut self) -> Option<&mut dyn BeforeUpdate> {
        None
    }
}

/// Lifecycle hook invoked once per insert, after the identifier has been assigned.
///
/// Returning an error aborts the insert before the store is contacted.
pub trait BeforeInsert {
    fn before_insert(&mut self) -> HookResult;
}

/// Lifecycle hook invoked once per single-record update, after the `update_one` chain.
///
/// Returning an error aborts the update before the store is contacted.
pub trait BeforeUpdate {
    fn before_update(&mut self) -> HookResult;
}

/// Extension trait providing conversions between records and stored documents.
///
/// Implemented for every [`Record`].
pub trait RecordExt: Record {
    /// Serializes this record into a BSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the record does not serialize to a map.
    fn to_document(&self) -> DocumentStoreResult<Document>;

    /// Decodes a record from a stored BSON document.
    fn from_document(document: Document) -> DocumentStoreResult<Self>;

    /// Converts this record to a JSON value.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a record from a JSON value.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<R: Record> RecordExt for R {
    fn to_document(&self) -> DocumentStoreResult<Document> {
        match serialize_to_bson(self)? {
            Bson::Document(document) => Ok(document),
            other => Err(DocumentStoreError::InvalidDocument(format!(
                "{} serialized to {:?}, expected a document",
                R::collection_name(),
                other.element_type()
            ))),
        }
    }

    fn from_document(document: Document) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(Bson::Document(document))?)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

/// Creation and modification times, stamped by the lifecycle hooks.
///
/// Embed it with `#[serde(flatten)]` and forward the record's own lifecycle hooks to it.
/// Unset times are not serialized, so a `$set` update never clears a stored time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timestamps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl BeforeInsert for Timestamps {
    fn before_insert(&mut self) -> HookResult {
        let now = Utc::now();
        self.created_at = Some(now);
        self.updated_at = Some(now);

        Ok(())
    }
}

impl BeforeUpdate for Timestamps {
    fn before_update(&mut self) -> HookResult {
        self.updated_at = Some(Utc::now());

        Ok(())
    }
}
