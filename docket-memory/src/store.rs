//! In-memory storage implementation for document stores.
//!
//! Collections are kept as vectors of BSON documents in insertion order, behind an
//! async-aware read-write lock.

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};

use docket_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FindOptions, SortDirection},
    record::ID_FIELD,
};

use crate::{
    evaluator::{DocumentEvaluator, compare_for_sort, lookup},
    update::Update,
};

type StoreMap = HashMap<String, Vec<Document>>;

/// Thread-safe in-memory document storage backend.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, so clones
/// share the same underlying data and can be handed to separate tasks.
///
/// # Performance
///
/// Every query scans the whole collection. That is fine for tests and small data sets;
/// use a persistent backend such as MongoDB for anything larger.
///
/// # Example
///
/// ```ignore
/// use docket_memory::InMemoryStore;
/// use docket::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
///
/// store.insert_one(doc! { "_id": "u1", "name": "Alice" }, "users").await?;
/// let alice = store.find_one(doc! { "name": "Alice" }, "users").await?;
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> documents in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Seeds a store with documents, keyed by collection name.
    ///
    /// Documents are inserted through the same path as
    /// [`insert_one`](StoreBackend::insert_one), so identities are checked and filled in.
    pub async fn with_documents<I, D>(collections: I) -> DocumentStoreResult<Self>
    where
        I: IntoIterator<Item = (String, D)>,
        D: IntoIterator<Item = Document>,
    {
        let store = Self::new();

        for (collection, documents) in collections {
            for document in documents {
                store.insert_one(document, &collection).await?;
            }
        }

        Ok(store)
    }
}

fn parse_filter(filter: &Document) -> DocumentStoreResult<Expr> {
    Expr::parse(filter).inspect_err(|error| {
        tracing::debug!(%error, "rejected filter");
    })
}

fn parse_update(update: &Document) -> DocumentStoreResult<Update> {
    Update::parse(update).inspect_err(|error| {
        tracing::debug!(%error, "rejected update");
    })
}

/// Applies `update` to the documents at `positions`, all or nothing.
fn apply_all(
    documents: &mut [Document],
    positions: &[usize],
    update: &Update,
) -> DocumentStoreResult<()> {
    let mut updated = Vec::with_capacity(positions.len());

    for &position in positions {
        let mut document = documents[position].clone();
        update.apply(&mut document)?;
        updated.push((position, document));
    }

    for (position, document) in updated {
        documents[position] = document;
    }

    Ok(())
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_one(&self, mut document: Document, collection: &str) -> DocumentStoreResult<Bson> {
        let id = match document.get(ID_FIELD) {
            Some(id) => id.clone(),
            None => {
                let id = Bson::String(ObjectId::new().to_hex());
                document.insert(ID_FIELD, id.clone());
                id
            }
        };

        let mut store = self.store.write().await;
        let documents = store
            .entry(collection.to_string())
            .or_default();

        if documents
            .iter()
            .any(|existing| existing.get(ID_FIELD) == Some(&id))
        {
            tracing::debug!(collection, %id, "duplicate identity");
            return Err(DocumentStoreError::DocumentAlreadyExists(
                id.as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| id.to_string()),
                collection.to_string(),
            ));
        }

        documents.push(document);

        Ok(id)
    }

    async fn find_one(&self, filter: Document, collection: &str) -> DocumentStoreResult<Document> {
        let expr = parse_filter(&filter)?;
        let store = self.store.read().await;

        store
            .get(collection)
            .and_then(|documents| {
                documents
                    .iter()
                    .find(|document| DocumentEvaluator::matches(document, &expr))
            })
            .cloned()
            .ok_or_else(|| DocumentStoreError::DocumentNotFound(collection.to_string()))
    }

    async fn find(
        &self,
        filter: Document,
        options: FindOptions,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>> {
        let expr = parse_filter(&filter)?;
        let store = self.store.read().await;
        let documents = match store.get(collection) {
            Some(documents) => documents,
            None => return Ok(vec![]),
        };

        let mut matched = documents
            .iter()
            .filter(|document| DocumentEvaluator::matches(document, &expr))
            .cloned()
            .collect::<Vec<_>>();

        if let Some(sort) = &options.sort {
            // Stable, so ties keep insertion order.
            matched.sort_by(|a, b| {
                let ordering = compare_for_sort(lookup(a, &sort.field), lookup(b, &sort.field));

                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        Ok(
            matched
                .into_iter()
                .skip(options.skip.unwrap_or(0))
                .take(options.limit.unwrap_or(usize::MAX))
                .collect()
        )
    }

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let expr = parse_filter(&filter)?;
        let update = parse_update(&update)?;
        let mut store = self.store.write().await;
        let documents = match store.get_mut(collection) {
            Some(documents) => documents,
            None => return Ok(()),
        };

        let position = documents
            .iter()
            .position(|document| DocumentEvaluator::matches(document, &expr));

        match position {
            Some(position) => apply_all(documents, &[position], &update),
            None => Ok(()),
        }
    }

    async fn update_many(
        &self,
        filter: Document,
        update: Document,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let expr = parse_filter(&filter)?;
        let update = parse_update(&update)?;
        let mut store = self.store.write().await;
        let documents = match store.get_mut(collection) {
            Some(documents) => documents,
            None => return Ok(()),
        };

        let positions = documents
            .iter()
            .enumerate()
            .filter(|(_, document)| DocumentEvaluator::matches(document, &expr))
            .map(|(position, _)| position)
            .collect::<Vec<_>>();

        apply_all(documents, &positions, &update)
    }

    async fn delete_one(&self, filter: Document, collection: &str) -> DocumentStoreResult<u64> {
        let expr = parse_filter(&filter)?;
        let mut store = self.store.write().await;
        let documents = match store.get_mut(collection) {
            Some(documents) => documents,
            None => return Ok(0),
        };

        match documents
            .iter()
            .position(|document| DocumentEvaluator::matches(document, &expr))
        {
            Some(position) => {
                documents.remove(position);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn count_documents(&self, filter: Document, collection: &str) -> DocumentStoreResult<u64> {
        let expr = parse_filter(&filter)?;
        let store = self.store.read().await;

        Ok(
            store
                .get(collection)
                .map(|documents| {
                    documents
                        .iter()
                        .filter(|document| DocumentEvaluator::matches(document, &expr))
                        .count() as u64
                })
                .unwrap_or(0)
        )
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.store
            .write()
            .await
            .remove(name);

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names = self
            .store
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort();

        Ok(names)
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docket_memory::InMemoryStore;
/// use docket::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder()
///     .with_documents("users", vec![doc! { "_id": "u1", "name": "Alice" }])
///     .build()
///     .await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStoreBuilder {
    seed: Vec<(String, Vec<Document>)>,
}

impl InMemoryStoreBuilder {
    /// Adds documents to insert into `collection` when the store is built.
    pub fn with_documents(mut self, collection: impl Into<String>, documents: Vec<Document>) -> Self {
        self.seed.push((collection.into(), documents));
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds a new [`InMemoryStore`], inserting any seeded documents.
    ///
    /// Fails if the seed contains duplicate identities within a collection.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        InMemoryStore::with_documents(self.seed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docket_core::query::FindOptions;

    async fn seeded() -> InMemoryStore {
        InMemoryStore::builder()
            .with_documents(
                "tasks",
                vec![
                    doc! { "_id": "t1", "title": "write", "priority": 2, "tags": ["docs"] },
                    doc! { "_id": "t2", "title": "review", "priority": 1 },
                    doc! { "_id": "t3", "title": "ship", "priority": 3, "tags": ["release", "docs"] },
                ],
            )
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_an_identity_when_missing() {
        let store = InMemoryStore::new();

        let id = store
            .insert_one(doc! { "title": "untitled" }, "tasks")
            .await
            .unwrap();

        let stored = store
            .find_one(doc! { "_id": id.clone() }, "tasks")
            .await
            .unwrap();
        assert_eq!(stored.get(ID_FIELD), Some(&id));
        assert_eq!(id.as_str().map(str::len), Some(24));
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_identities() {
        let store = seeded().await;

        let err = store
            .insert_one(doc! { "_id": "t1" }, "tasks")
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentStoreError::DocumentAlreadyExists(_, collection) if collection == "tasks"));
    }

    #[tokio::test]
    async fn find_one_reports_missing_documents() {
        let store = seeded().await;

        let err = store
            .find_one(doc! { "title": "nope" }, "tasks")
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = store
            .find_one(doc! {}, "unknown")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn find_filters_sorts_and_pages() {
        let store = seeded().await;

        let options = FindOptions::builder()
            .sort("priority", SortDirection::Desc)
            .skip(1)
            .limit(1)
            .build();
        let found = store
            .find(doc! { "tags": "docs" }, options, "tasks")
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_str("_id").unwrap(), "t1");
    }

    #[tokio::test]
    async fn find_keeps_insertion_order_without_sort() {
        let store = seeded().await;

        let ids = store
            .find(doc! {}, FindOptions::default(), "tasks")
            .await
            .unwrap()
            .iter()
            .map(|document| document.get_str("_id").unwrap().to_string())
            .collect::<Vec<_>>();

        assert_eq!(ids, ["t1", "t2", "t3"]);
    }

    #[tokio::test]
    async fn update_one_touches_only_the_first_match() {
        let store = seeded().await;

        store
            .update_one(doc! { "tags": "docs" }, doc! { "$set": { "done": true } }, "tasks")
            .await
            .unwrap();

        assert_eq!(store.count_documents(doc! { "done": true }, "tasks").await.unwrap(), 1);
        assert!(
            store
                .find_one(doc! { "_id": "t1" }, "tasks")
                .await
                .unwrap()
                .get_bool("done")
                .unwrap()
        );
    }

    #[tokio::test]
    async fn update_many_is_all_or_nothing() {
        let store = InMemoryStore::builder()
            .with_documents(
                "counters",
                vec![doc! { "_id": "a", "n": 1 }, doc! { "_id": "b", "n": "one" }],
            )
            .build()
            .await
            .unwrap();

        let err = store
            .update_many(doc! {}, doc! { "$inc": { "n": 1 } }, "counters")
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidUpdate(_)));

        let a = store
            .find_one(doc! { "_id": "a" }, "counters")
            .await
            .unwrap();
        assert_eq!(a.get_i32("n").unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_one_reports_the_deleted_count() {
        let store = seeded().await;

        assert_eq!(store.delete_one(doc! { "priority": { "$gte": 2 } }, "tasks").await.unwrap(), 1);
        assert_eq!(store.delete_one(doc! { "_id": "t1" }, "tasks").await.unwrap(), 0);
        assert_eq!(store.count_documents(doc! {}, "tasks").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn invalid_filters_are_rejected() {
        let store = seeded().await;

        let err = store
            .count_documents(doc! { "priority": { "$near": 1 } }, "tasks")
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentStoreError::InvalidFilter(_)));
    }

    #[tokio::test]
    async fn collections_can_be_listed_and_dropped() {
        let store = seeded().await;
        store
            .insert_one(doc! { "_id": "n1" }, "notes")
            .await
            .unwrap();

        assert_eq!(store.list_collections().await.unwrap(), ["notes", "tasks"]);

        store.drop_collection("tasks").await.unwrap();

        assert_eq!(store.list_collections().await.unwrap(), ["notes"]);
        assert_eq!(store.count_documents(doc! {}, "tasks").await.unwrap(), 0);
    }
}
