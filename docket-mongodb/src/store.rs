use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions as MongoFindOptions},
};

use docket_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{FindOptions, SortDirection},
};

/// Server error code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }
}

fn backend_error(collection: &str, error: MongoError) -> DocumentStoreError {
    tracing::debug!(collection, %error, "mongodb call failed");
    DocumentStoreError::Backend(error.to_string())
}

fn is_duplicate_key(error: &MongoError) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(failure)) if failure.code == DUPLICATE_KEY
    )
}

fn find_options(options: FindOptions) -> MongoFindOptions {
    let mut mongo_options = MongoFindOptions::default();

    if let Some(limit) = options.limit {
        mongo_options.limit = Some(limit as i64);
    }
    if let Some(skip) = options.skip {
        mongo_options.skip = Some(skip as u64);
    }
    if let Some(sort) = options.sort {
        mongo_options.sort = Some(doc! {
            sort.field: match sort.direction {
                SortDirection::Asc => 1,
                SortDirection::Desc => -1,
            }
        });
    }

    mongo_options
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_one(&self, document: Document, collection: &str) -> DocumentStoreResult<Bson> {
        let id = document.get("_id").cloned();

        self.get_collection(collection)
            .insert_one(document)
            .await
            .map(|result| result.inserted_id)
            .map_err(|e| match id {
                Some(id) if is_duplicate_key(&e) => DocumentStoreError::DocumentAlreadyExists(
                    id.as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| id.to_string()),
                    collection.to_string(),
                ),
                _ => backend_error(collection, e),
            })
    }

    async fn find_one(&self, filter: Document, collection: &str) -> DocumentStoreResult<Document> {
        self.get_collection(collection)
            .find_one(filter)
            .await
            .map_err(|e| backend_error(collection, e))?
            .ok_or_else(|| DocumentStoreError::DocumentNotFound(collection.to_string()))
    }

    async fn find(
        &self,
        filter: Document,
        options: FindOptions,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>> {
        self.get_collection(collection)
            .find(filter)
            .with_options(find_options(options))
            .await
            .map_err(|e| backend_error(collection, e))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| backend_error(collection, e))
    }

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .update_one(filter, update)
            .await
            .map_err(|e| backend_error(collection, e))?;

        Ok(())
    }

    async fn update_many(
        &self,
        filter: Document,
        update: Document,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .update_many(filter, update)
            .await
            .map_err(|e| backend_error(collection, e))?;

        Ok(())
    }

    async fn delete_one(&self, filter: Document, collection: &str) -> DocumentStoreResult<u64> {
        Ok(
            self.get_collection(collection)
                .delete_one(filter)
                .await
                .map_err(|e| backend_error(collection, e))?
                .deleted_count
        )
    }

    async fn count_documents(&self, filter: Document, collection: &str) -> DocumentStoreResult<u64> {
        self.get_collection(collection)
            .count_documents(filter)
            .await
            .map_err(|e| backend_error(collection, e))
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.get_collection(name)
            .drop()
            .await
            .map_err(|e| backend_error(name, e))
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(|e| backend_error(&self.database, e))
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
