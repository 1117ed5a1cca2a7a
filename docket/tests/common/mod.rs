#![allow(dead_code)]

use bson::{Bson, Document};
use docket::{
    async_trait,
    backend::StoreBackend,
    error::{DocumentStoreResult, HookResult},
    memory::InMemoryStore,
    query::FindOptions,
    record::{BeforeInsert, BeforeUpdate, Timestamps},
    Record,
};
use serde::{Deserialize, Serialize};
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, Record)]
#[record(collection = "notes")]
pub struct Note {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl Note {
    pub fn new(title: &str, body: &str) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            ..Default::default()
        }
    }
}

/// A record with both lifecycle capabilities. Titles starting with `!` are refused.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, Record)]
#[record(collection = "audited", before_insert, before_update)]
pub struct Audited {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Audited {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }

    fn check(&self) -> HookResult {
        if self.title.starts_with('!') {
            return Err(format!("title {:?} is refused", self.title).into());
        }

        Ok(())
    }
}

impl BeforeInsert for Audited {
    fn before_insert(&mut self) -> HookResult {
        self.check()?;
        self.timestamps.before_insert()
    }
}

impl BeforeUpdate for Audited {
    fn before_update(&mut self) -> HookResult {
        self.check()?;
        self.timestamps.before_update()
    }
}

/// A store call as seen by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub payload: Document,
}

/// Wraps an [`InMemoryStore`] and records every call that reaches it.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    inner: InMemoryStore,
    calls: Arc<Mutex<Vec<Call>>>,
    count: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `delay` before reaching the store.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Option<Call> {
        self.calls.lock().unwrap().last().cloned()
    }

    async fn record(&self, method: &'static str, payload: &Document) {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(Call {
            method,
            payload: payload.clone(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl StoreBackend for RecordingBackend {
    async fn insert_one(&self, document: Document, collection: &str) -> DocumentStoreResult<Bson> {
        self.record("insert_one", &document).await;
        self.inner.insert_one(document, collection).await
    }

    async fn find_one(&self, filter: Document, collection: &str) -> DocumentStoreResult<Document> {
        self.record("find_one", &filter).await;
        self.inner.find_one(filter, collection).await
    }

    async fn find(
        &self,
        filter: Document,
        options: FindOptions,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>> {
        self.record("find", &filter).await;
        self.inner.find(filter, options, collection).await
    }

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        self.record("update_one", &bson::doc! { "filter": filter.clone(), "update": update.clone() })
            .await;
        self.inner.update_one(filter, update, collection).await
    }

    async fn update_many(
        &self,
        filter: Document,
        update: Document,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        self.record("update_many", &bson::doc! { "filter": filter.clone(), "update": update.clone() })
            .await;
        self.inner.update_many(filter, update, collection).await
    }

    async fn delete_one(&self, filter: Document, collection: &str) -> DocumentStoreResult<u64> {
        self.record("delete_one", &filter).await;
        self.inner.delete_one(filter, collection).await
    }

    async fn count_documents(&self, filter: Document, collection: &str) -> DocumentStoreResult<u64> {
        self.record("count_documents", &filter).await;
        self.inner.count_documents(filter, collection).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.inner.drop_collection(name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.inner.list_collections().await
    }
}
