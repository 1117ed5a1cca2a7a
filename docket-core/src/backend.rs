//! Storage backend abstraction.
//!
//! A [`StoreBackend`] is the document store a [`Collection`](crate::collection::Collection)
//! delegates to once its hooks have run. Backends see plain BSON documents and filters; they
//! know nothing about record types or hook chains.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: An object-safe mirror used for dynamic dispatch
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Example
//!
//! ```ignore
//! use docket::backend::StoreBackend;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//!
//! let id = backend.insert_one(doc! { "_id": "u1", "name": "Alice" }, "users").await?;
//! let found = backend.find_one(doc! { "_id": "u1" }, "users").await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use std::{any::Any, fmt::Debug};

use crate::{error::DocumentStoreResult, query::FindOptions};

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// Implementations must support concurrent calls from multiple async tasks. Collections
/// perform no locking of their own.
///
/// # Error Handling
///
/// Errors are returned to the collection caller untouched, so backends should pick the
/// [`DocumentStoreError`](crate::error::DocumentStoreError) variant that describes the
/// failure best. A `find_one` that matches nothing must return
/// [`DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts one document and returns the identity it was stored under.
    ///
    /// If the document has no `_id`, the backend assigns one.
    async fn insert_one(&self, document: Document, collection: &str) -> DocumentStoreResult<Bson>;

    /// Returns the first document matching `filter`.
    async fn find_one(&self, filter: Document, collection: &str) -> DocumentStoreResult<Document>;

    /// Returns every document matching `filter`, with `options` applied.
    ///
    /// Matching nothing is not an error.
    async fn find(
        &self,
        filter: Document,
        options: FindOptions,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Applies the update expression to the first document matching `filter`.
    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Applies the update expression to every document matching `filter`.
    async fn update_many(
        &self,
        filter: Document,
        update: Document,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Deletes the first document matching `filter` and returns how many were deleted.
    async fn delete_one(&self, filter: Document, collection: &str) -> DocumentStoreResult<u64>;

    /// Counts the documents matching `filter`.
    async fn count_documents(&self, filter: Document, collection: &str)
    -> DocumentStoreResult<u64>;

    /// Drops a collection and all its documents.
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Lists the names of all collections in the store.
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Object-safe mirror of [`StoreBackend`], implemented for every sized backend.
///
/// `dyn DynStoreBackend` itself implements [`StoreBackend`], so collections work the
/// same over a boxed backend as over a concrete one.
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn insert_one(&self, document: Document, collection: &str) -> DocumentStoreResult<Bson>;
    async fn find_one(&self, filter: Document, collection: &str) -> DocumentStoreResult<Document>;
    async fn find(
        &self,
        filter: Document,
        options: FindOptions,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>>;
    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn update_many(
        &self,
        filter: Document,
        update: Document,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn delete_one(&self, filter: Document, collection: &str) -> DocumentStoreResult<u64>;
    async fn count_documents(&self, filter: Document, collection: &str)
    -> DocumentStoreResult<u64>;
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    async fn insert_one(&self, document: Document, collection: &str) -> DocumentStoreResult<Bson> {
        StoreBackend::insert_one(self, document, collection).await
    }

    async fn find_one(&self, filter: Document, collection: &str) -> DocumentStoreResult<Document> {
        StoreBackend::find_one(self, filter, collection).await
    }

    async fn find(
        &self,
        filter: Document,
        options: FindOptions,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>> {
        StoreBackend::find(self, filter, options, collection).await
    }

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::update_one(self, filter, update, collection).await
    }

    async fn update_many(
        &self,
        filter: Document,
        update: Document,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::update_many(self, filter, update, collection).await
    }

    async fn delete_one(&self, filter: Document, collection: &str) -> DocumentStoreResult<u64> {
        StoreBackend::delete_one(self, filter, collection).await
    }

    async fn count_documents(
        &self,
        filter: Document,
        collection: &str,
    ) -> DocumentStoreResult<u64> {
        StoreBackend::count_documents(self, filter, collection).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_collection(self, name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        StoreBackend::list_collections(self).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(*self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

#[async_trait]
impl StoreBackend for dyn DynStoreBackend {
    async fn insert_one(&self, document: Document, collection: &str) -> DocumentStoreResult<Bson> {
        DynStoreBackend::insert_one(self, document, collection).await
    }

    async fn find_one(&self, filter: Document, collection: &str) -> DocumentStoreResult<Document> {
        DynStoreBackend::find_one(self, filter, collection).await
    }

    async fn find(
        &self,
        filter: Document,
        options: FindOptions,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>> {
        DynStoreBackend::find(self, filter, options, collection).await
    }

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        DynStoreBackend::update_one(self, filter, update, collection).await
    }

    async fn update_many(
        &self,
        filter: Document,
        update: Document,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        DynStoreBackend::update_many(self, filter, update, collection).await
    }

    async fn delete_one(&self, filter: Document, collection: &str) -> DocumentStoreResult<u64> {
        DynStoreBackend::delete_one(self, filter, collection).await
    }

    async fn count_documents(
        &self,
        filter: Document,
        collection: &str,
    ) -> DocumentStoreResult<u64> {
        DynStoreBackend::count_documents(self, filter, collection).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        DynStoreBackend::drop_collection(self, name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        DynStoreBackend::list_collections(self).await
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
