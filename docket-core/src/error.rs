//! Error types and result types for collection operations.
//!
//! Every failure a collection call can produce is a [`DocumentStoreError`]. Two variants
//! describe calls that were stopped before the store was contacted
//! ([`HookAborted`](DocumentStoreError::HookAborted) and
//! [`LifecycleAborted`](DocumentStoreError::LifecycleAborted)); everything else comes from
//! the backend and is returned exactly as the backend produced it.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use std::{error::Error as StdError, fmt, time::Duration};
use thiserror::Error;

/// Boxed error returned by hook chains and lifecycle hooks.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// The result type of hook callbacks and lifecycle hooks.
pub type HookResult = Result<(), BoxError>;

/// The collection operations that carry a hook chain.
///
/// Inserts have no chain; they only run the record's own
/// [`BeforeInsert`](crate::record::BeforeInsert) capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    DeleteOne,
    UpdateOne,
    UpdateMany,
    FindOne,
    Find,
    Count,
}

impl Operation {
    /// All hookable operations, in declaration order.
    pub const ALL: [Operation; 6] = [
        Operation::DeleteOne,
        Operation::UpdateOne,
        Operation::UpdateMany,
        Operation::FindOne,
        Operation::Find,
        Operation::Count,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::DeleteOne => "delete_one",
            Operation::UpdateOne => "update_one",
            Operation::UpdateMany => "update_many",
            Operation::FindOne => "find_one",
            Operation::Find => "find",
            Operation::Count => "count",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The type-level lifecycle hooks a record may opt into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleHook {
    BeforeInsert,
    BeforeUpdate,
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleHook::BeforeInsert => f.write_str("before_insert"),
            LifecycleHook::BeforeUpdate => f.write_str("before_update"),
        }
    }
}

/// Represents all possible errors that can occur when working with a collection.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// A hook in the chain of `operation` failed. The hook's own error is kept as the source.
    #[error("{operation} hook aborted the call: {source}")]
    HookAborted {
        operation: Operation,
        #[source]
        source: BoxError,
    },
    /// A record's lifecycle hook failed. The hook's own error is kept as the source.
    #[error("{hook} aborted the call: {source}")]
    LifecycleAborted {
        hook: LifecycleHook,
        #[source]
        source: BoxError,
    },
    /// A single-document lookup matched nothing in the named collection.
    #[error("No document matched the filter in collection {0}")]
    DocumentNotFound(String),
    /// A single-document delete matched nothing in the named collection.
    #[error("Nothing was deleted from collection {0}")]
    NothingDeleted(String),
    /// A document with the given ID already exists.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// Serialization/deserialization error when converting between record and document.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during backend initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The record did not serialize to a document.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The filter could not be understood by the backend.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    /// The update expression could not be applied by the backend.
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),
    /// The store call did not finish within the configured timeout.
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Wraps a failure returned by a chain hook of `operation`.
    pub fn hook_aborted(operation: Operation, source: BoxError) -> Self {
        DocumentStoreError::HookAborted { operation, source }
    }

    /// Wraps a failure returned by a record lifecycle hook.
    pub fn lifecycle_aborted(hook: LifecycleHook, source: BoxError) -> Self {
        DocumentStoreError::LifecycleAborted { hook, source }
    }

    /// Returns `true` when the call was stopped before the store was contacted.
    ///
    /// The only side effect such a call may have left behind is the identifier
    /// assigned to a record by `insert`.
    pub fn aborted_before_store(&self) -> bool {
        matches!(
            self,
            DocumentStoreError::HookAborted { .. } | DocumentStoreError::LifecycleAborted { .. }
        )
    }

    /// Returns `true` for both "nothing found" and "nothing deleted".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DocumentStoreError::DocumentNotFound(_) | DocumentStoreError::NothingDeleted(_)
        )
    }
}

/// A specialized `Result` type for collection and backend operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
