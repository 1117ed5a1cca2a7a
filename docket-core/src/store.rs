//! Entry point for obtaining typed collections.
//!
//! This module provides two store types:
//!
//! - [`DocumentStore`] - Store bound to a concrete backend type
//! - [`DynDocumentStore`] - Store over a boxed backend, for choosing the backend at runtime
//!
//! Both hand out [`Collection`] handles that share the store's backend, [`StoreConfig`] and
//! [`IdGenerator`].
//!
//! # Example
//!
//! ```ignore
//! use docket::{store::DocumentStore, memory::InMemoryStore};
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let notes = store.collection::<Note>();
//! ```

use std::sync::Arc;

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    collection::{Collection, DynCollection},
    config::StoreConfig,
    error::DocumentStoreResult,
    id::{IdGenerator, ObjectIdGenerator},
    record::Record,
};

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
    config: StoreConfig,
    ids: Arc<dyn IdGenerator>,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a store with the default configuration and ObjectId-style identifiers.
    ///
    /// The default configuration bounds store calls with a Tokio timer; see [`StoreConfig`].
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    /// Creates a store with the given configuration.
    pub fn with_config(backend: B, config: StoreConfig) -> Self {
        Self {
            backend,
            config,
            ids: Arc::new(ObjectIdGenerator),
        }
    }

    /// Replaces the generator used to fill in empty identities on insert.
    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns a handle on the collection named by `T::collection_name()`.
    ///
    /// Each call returns a fresh handle with empty hook chains.
    pub fn collection<T: Record>(&self) -> Collection<'_, B, T> {
        self.collection_named(T::collection_name())
    }

    /// Returns a handle on the collection `name`, storing records of type `T`.
    pub fn collection_named<T: Record>(&self, name: &str) -> Collection<'_, B, T> {
        Collection::new(
            name.to_string(),
            &self.backend,
            self.config.clone(),
            Arc::clone(&self.ids),
        )
    }

    /// Generates a fresh identifier.
    pub fn new_id(&self) -> String {
        self.ids.generate()
    }

    /// Drops a collection and all its documents.
    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_collection(&self.backend, name).await
    }

    /// Lists the names of all collections in the store.
    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        StoreBackend::list_collections(&self.backend).await
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown operation fails.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(self.backend).await
    }
}

/// A document store over a boxed backend.
#[derive(Debug)]
pub struct DynDocumentStore {
    backend: Box<dyn DynStoreBackend>,
    config: StoreConfig,
    ids: Arc<dyn IdGenerator>,
}

impl DynDocumentStore {
    /// Creates a dynamic document store with the given backend trait object.
    pub fn new(backend: Box<dyn DynStoreBackend>) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    pub fn with_config(backend: Box<dyn DynStoreBackend>, config: StoreConfig) -> Self {
        Self {
            backend,
            config,
            ids: Arc::new(ObjectIdGenerator),
        }
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn collection<T: Record>(&self) -> DynCollection<'_, T> {
        self.collection_named(T::collection_name())
    }

    pub fn collection_named<T: Record>(&self, name: &str) -> DynCollection<'_, T> {
        Collection::new(
            name.to_string(),
            &*self.backend,
            self.config.clone(),
            Arc::clone(&self.ids),
        )
    }

    pub fn new_id(&self) -> String {
        self.ids.generate()
    }

    /// Returns the backend as `B` if that is its concrete type.
    pub fn downcast_backend<B: StoreBackend + 'static>(&self) -> Option<&B> {
        self.backend
            .as_any()
            .downcast_ref::<B>()
    }

    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        DynStoreBackend::drop_collection(&*self.backend, name).await
    }

    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        DynStoreBackend::list_collections(&*self.backend).await
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        DynStoreBackend::shutdown_boxed(self.backend).await
    }
}

/// Conversion into a [`DynDocumentStore`], keeping the configuration and id generator.
pub trait IntoDynDocumentStore {
    fn into_dyn(self) -> DynDocumentStore;
}

impl<B: StoreBackend + 'static> IntoDynDocumentStore for DocumentStore<B> {
    fn into_dyn(self) -> DynDocumentStore {
        DynDocumentStore {
            backend: Box::new(self.backend),
            config: self.config,
            ids: self.ids,
        }
    }
}

impl IntoDynDocumentStore for DynDocumentStore {
    fn into_dyn(self) -> DynDocumentStore {
        self
    }
}
