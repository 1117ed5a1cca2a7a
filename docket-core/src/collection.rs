//! Typed collection handles.
//!
//! A [`Collection`] is the CRUD surface for one record type. Every call follows the same
//! linear pipeline:
//!
//! 1. run the hook chain registered for the operation (see [`Hooks`]);
//! 2. run the record's lifecycle capability, if the type has one for the operation;
//! 3. call the backend, bounded by the store's configured timeout;
//! 4. map the result back (decode documents, propagate the stored identity).
//!
//! The first failure ends the call and is returned as is.
//!
//! # Example
//!
//! ```ignore
//! use docket::{prelude::*, memory::InMemoryStore};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize, Record)]
//! #[record(collection = "users")]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! # async fn example() -> DocumentStoreResult<()> {
//! let store = DocumentStore::new(InMemoryStore::new());
//! let users = store.collection::<User>();
//!
//! let mut user = User { name: "Alice".into(), ..Default::default() };
//! let id = users.insert(&mut user).await?;
//! let found = users.find_by_id(&id).await?;
//! # Ok(()) }
//! ```

use bson::{Bson, Document, doc};
use std::{fmt, future::Future, sync::Arc};

use crate::{
    backend::StoreBackend,
    config::StoreConfig,
    error::{DocumentStoreError, DocumentStoreResult, LifecycleHook, Operation},
    hooks::Hooks,
    id::IdGenerator,
    query::{FindOptions, by_id},
    record::{ID_FIELD, Record, RecordExt},
};

/// A typed handle on one collection of a backend.
///
/// The handle owns its hook chains; two handles on the same collection do not share hooks.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `B` - The storage backend type (may be `dyn DynStoreBackend`)
/// * `T` - The record type stored in this collection
pub struct Collection<'a, B: StoreBackend + ?Sized, T: Record> {
    name: String,
    backend: &'a B,
    config: StoreConfig,
    ids: Arc<dyn IdGenerator>,
    hooks: Hooks<T>,
}

/// A collection handle over a boxed backend, as handed out by
/// [`DynDocumentStore`](crate::store::DynDocumentStore).
pub type DynCollection<'a, T> = Collection<'a, dyn crate::backend::DynStoreBackend, T>;

impl<'a, B: StoreBackend + ?Sized, T: Record> Collection<'a, B, T> {
    pub(crate) fn new(
        name: String,
        backend: &'a B,
        config: StoreConfig,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            name,
            backend,
            config,
            ids,
            hooks: Hooks::new(),
        }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the hook chains of this handle.
    pub fn hooks(&self) -> &Hooks<T> {
        &self.hooks
    }

    /// Returns the hook chains of this handle for registration.
    pub fn hooks_mut(&mut self) -> &mut Hooks<T> {
        &mut self.hooks
    }

    /// Generates a fresh identifier without touching the store.
    pub fn new_id(&self) -> String {
        self.ids.generate()
    }

    /// Inserts a record and returns the identity it was stored under.
    ///
    /// An empty identity is replaced with a generated one before anything else runs, and
    /// that assignment stays on the record even when the insert fails afterwards. If the
    /// record type has a [`BeforeInsert`](crate::record::BeforeInsert) capability it runs
    /// next; a failure there returns before the store is contacted.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::LifecycleAborted`] if the lifecycle hook fails,
    /// [`DocumentStoreError::InvalidDocument`] if the record does not serialize its identity
    /// under `_id`, or the backend's error if the store call fails.
    pub async fn insert(&self, record: &mut T) -> DocumentStoreResult<String> {
        tracing::trace!(collection = %self.name, "dispatching insert");

        if record.id().is_empty() {
            record.set_id(self.new_id());
        }

        if let Some(hook) = record.as_before_insert() {
            hook.before_insert()
                .map_err(|source| lifecycle_aborted(LifecycleHook::BeforeInsert, source))?;
        }

        let document = record.to_document()?;
        if document.get_str(ID_FIELD).ok() != Some(record.id()) {
            return Err(DocumentStoreError::InvalidDocument(format!(
                "{} must serialize its identity as {ID_FIELD}",
                std::any::type_name::<T>()
            )));
        }

        let inserted = self
            .within(self.backend.insert_one(document, &self.name))
            .await?;

        let id = stored_id(inserted);
        record.set_id(id.clone());

        Ok(id)
    }

    /// Updates the record with the given identity. Shorthand for
    /// [`update_one`](Self::update_one) with an `_id` filter.
    pub async fn update_by_id(&self, id: &str, record: &mut T) -> DocumentStoreResult<()> {
        self.update_one(by_id(id), record).await
    }

    /// Writes the fields of `record` onto the first document matching `filter`.
    ///
    /// The `update_one` chain runs first and may rewrite both the filter and the record.
    /// Then the record's [`BeforeUpdate`](crate::record::BeforeUpdate) capability runs, if
    /// any. The store receives `{ "$set": <record fields> }` without the identity field, so
    /// fields the record does not serialize keep their stored values.
    ///
    /// Matching nothing is not an error.
    pub async fn update_one(&self, mut filter: Document, record: &mut T) -> DocumentStoreResult<()> {
        tracing::trace!(collection = %self.name, operation = %Operation::UpdateOne, "dispatching");

        self.hooks
            .run_update_one_chain(&mut filter, record)?;

        if let Some(hook) = record.as_before_update() {
            hook.before_update()
                .map_err(|source| lifecycle_aborted(LifecycleHook::BeforeUpdate, source))?;
        }

        let mut fields = record.to_document()?;
        fields.remove(ID_FIELD);

        self.within(
            self.backend
                .update_one(filter, doc! { "$set": fields }, &self.name),
        )
        .await
    }

    /// Applies an update expression to every document matching `filter`.
    ///
    /// The expression is sent as given (after the `update_many` chain), so it must contain
    /// its own operators such as `$set` or `$inc`.
    pub async fn update_many(
        &self,
        mut filter: Document,
        mut update: Document,
    ) -> DocumentStoreResult<()> {
        tracing::trace!(collection = %self.name, operation = %Operation::UpdateMany, "dispatching");

        self.hooks
            .run_update_many_chain(&mut filter, &mut update)?;

        self.within(
            self.backend
                .update_many(filter, update, &self.name),
        )
        .await
    }

    /// Deletes the record with the given identity. Shorthand for
    /// [`delete_one`](Self::delete_one) with an `_id` filter.
    pub async fn delete_by_id(&self, id: &str) -> DocumentStoreResult<()> {
        self.delete_one(by_id(id)).await
    }

    /// Deletes the first document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::NothingDeleted`] if no document matched.
    pub async fn delete_one(&self, mut filter: Document) -> DocumentStoreResult<()> {
        tracing::trace!(collection = %self.name, operation = %Operation::DeleteOne, "dispatching");

        self.hooks
            .run_filter_chain(Operation::DeleteOne, &mut filter)?;

        let deleted = self
            .within(self.backend.delete_one(filter, &self.name))
            .await?;

        if deleted < 1 {
            return Err(DocumentStoreError::NothingDeleted(self.name.clone()));
        }

        Ok(())
    }

    /// Fetches the record with the given identity. Shorthand for
    /// [`find_one`](Self::find_one) with an `_id` filter.
    pub async fn find_by_id(&self, id: &str) -> DocumentStoreResult<T> {
        self.find_one(by_id(id)).await
    }

    /// Fetches the first record matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns the backend's [`DocumentStoreError::DocumentNotFound`] if nothing matched.
    pub async fn find_one(&self, mut filter: Document) -> DocumentStoreResult<T> {
        tracing::trace!(collection = %self.name, operation = %Operation::FindOne, "dispatching");

        self.hooks
            .run_filter_chain(Operation::FindOne, &mut filter)?;

        let document = self
            .within(self.backend.find_one(filter, &self.name))
            .await?;

        T::from_document(document)
    }

    /// Fetches every record matching `filter`, in the order the backend returns them.
    ///
    /// Matching nothing yields an empty vector.
    pub async fn find(&self, mut filter: Document, options: FindOptions) -> DocumentStoreResult<Vec<T>> {
        tracing::trace!(collection = %self.name, operation = %Operation::Find, "dispatching");

        self.hooks
            .run_filter_chain(Operation::Find, &mut filter)?;

        self.within(
            self.backend
                .find(filter, options, &self.name),
        )
        .await?
        .into_iter()
        .map(T::from_document)
        .collect::<DocumentStoreResult<Vec<T>>>()
    }

    /// Counts the records matching `filter`.
    pub async fn count_documents(&self, mut filter: Document) -> DocumentStoreResult<u64> {
        tracing::trace!(collection = %self.name, operation = %Operation::Count, "dispatching");

        self.hooks
            .run_filter_chain(Operation::Count, &mut filter)?;

        self.within(
            self.backend
                .count_documents(filter, &self.name),
        )
        .await
    }

    /// Awaits a backend call under the configured deadline.
    async fn within<R>(
        &self,
        call: impl Future<Output = DocumentStoreResult<R>>,
    ) -> DocumentStoreResult<R> {
        match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| DocumentStoreError::Timeout(limit))?,
            None => call.await,
        }
    }
}

fn lifecycle_aborted(hook: LifecycleHook, source: crate::error::BoxError) -> DocumentStoreError {
    tracing::debug!(%hook, error = %source, "lifecycle hook aborted");
    DocumentStoreError::lifecycle_aborted(hook, source)
}

/// Renders the identity a backend reports for an inserted document as a string.
fn stored_id(id: Bson) -> String {
    match id {
        Bson::String(id) => id,
        Bson::ObjectId(oid) => oid.to_hex(),
        other => other.to_string(),
    }
}

impl<B: StoreBackend + ?Sized, T: Record> fmt::Debug for Collection<'_, B, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("backend", &self.backend)
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .finish()
    }
}
