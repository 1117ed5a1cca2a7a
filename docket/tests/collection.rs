mod common;

use bson::doc;
use common::{Audited, Note, RecordingBackend};
use docket::{
    Record,
    config::StoreConfig,
    error::{DocumentStoreError, LifecycleHook},
    id::SequentialIdGenerator,
    memory::InMemoryStore,
    query::{FindOptions, SortDirection},
    store::{DocumentStore, IntoDynDocumentStore},
};
use futures::{executor::block_on, future::join_all};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, time::Duration};

/// Identity serialized as `id` instead of `_id`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, Record)]
#[record(collection = "plain")]
struct Plain {
    id: String,
    title: String,
}

/// Every field besides the identity may be skipped on serialization.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, Record)]
#[record(collection = "sparse")]
struct Sparse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
}

#[tokio::test]
async fn insert_assigns_an_identity_and_round_trips() {
    let store = DocumentStore::new(InMemoryStore::new());
    let notes = store.collection::<Note>();

    let mut note = Note {
        tag: Some("work".into()),
        ..Note::new("standup", "ten minutes")
    };
    let id = notes.insert(&mut note).await.unwrap();

    assert!(!id.is_empty());
    assert_eq!(note.id, id);
    assert_eq!(notes.find_by_id(&id).await.unwrap(), note);
}

#[tokio::test]
async fn insert_keeps_an_identity_the_caller_chose() {
    let store = DocumentStore::new(InMemoryStore::new());
    let notes = store.collection::<Note>();

    let mut note = Note { id: "chosen".into(), ..Note::new("t", "b") };

    assert_eq!(notes.insert(&mut note).await.unwrap(), "chosen");
    assert!(matches!(
        notes.insert(&mut note).await.unwrap_err(),
        DocumentStoreError::DocumentAlreadyExists(id, _) if id == "chosen"
    ));
}

#[tokio::test]
async fn injected_generator_drives_new_identities() {
    let store = DocumentStore::new(InMemoryStore::new())
        .with_id_generator(SequentialIdGenerator::new("note-"));
    let notes = store.collection::<Note>();

    assert_eq!(notes.new_id(), "note-1");
    assert_eq!(notes.insert(&mut Note::new("a", "")).await.unwrap(), "note-2");
    assert_eq!(store.new_id(), "note-3");
}

#[tokio::test]
async fn concurrent_inserts_never_collide() {
    let store = DocumentStore::new(InMemoryStore::new());
    let notes = store.collection::<Note>();

    let mut batch = (0..50)
        .map(|i| Note::new(&format!("note {i}"), ""))
        .collect::<Vec<_>>();

    let handle = &notes;
    let ids = join_all(batch.iter_mut().map(move |note| handle.insert(note)))
        .await
        .into_iter()
        .collect::<Result<HashSet<_>, _>>()
        .unwrap();

    assert_eq!(ids.len(), 50);
    assert_eq!(notes.count_documents(doc! {}).await.unwrap(), 50);
}

#[tokio::test]
async fn failing_before_insert_aborts_before_the_store() {
    let store = DocumentStore::new(RecordingBackend::new())
        .with_id_generator(SequentialIdGenerator::new("a"));
    let audited = store.collection::<Audited>();

    let mut record = Audited::new("!refused");
    let err = audited.insert(&mut record).await.unwrap_err();

    assert!(err.aborted_before_store());
    assert!(matches!(
        err,
        DocumentStoreError::LifecycleAborted { hook: LifecycleHook::BeforeInsert, .. }
    ));
    assert_eq!(record.id, "a1");
    assert_eq!(record.timestamps.created_at, None);
    assert_eq!(store.backend().call_count(), 0);
}

#[tokio::test]
async fn insert_rejects_records_without_an_id_key() {
    let store = DocumentStore::new(RecordingBackend::new())
        .with_id_generator(SequentialIdGenerator::new("p"));
    let plain = store.collection::<Plain>();

    let mut record = Plain { title: "t".into(), ..Default::default() };
    let err = plain.insert(&mut record).await.unwrap_err();

    assert!(matches!(err, DocumentStoreError::InvalidDocument(_)));
    assert_eq!(record.id, "p1");
    assert_eq!(store.backend().call_count(), 0);
}

#[tokio::test]
async fn lifecycle_hooks_stamp_times() {
    let store = DocumentStore::new(InMemoryStore::new());
    let audited = store.collection::<Audited>();

    let mut record = Audited::new("draft");
    let id = audited.insert(&mut record).await.unwrap();

    let created_at = record.timestamps.created_at.unwrap();
    assert_eq!(record.timestamps.updated_at, Some(created_at));

    tokio::time::sleep(Duration::from_millis(5)).await;
    record.title = "final".into();
    audited.update_by_id(&id, &mut record).await.unwrap();

    let stored = audited.find_by_id(&id).await.unwrap();
    assert_eq!(stored.title, "final");
    assert_eq!(stored.timestamps.created_at, Some(created_at));
    assert!(stored.timestamps.updated_at.unwrap() > created_at);

    record.title = "!late".into();
    let err = audited.update_by_id(&id, &mut record).await.unwrap_err();
    assert!(matches!(
        err,
        DocumentStoreError::LifecycleAborted { hook: LifecycleHook::BeforeUpdate, .. }
    ));
    assert_eq!(audited.find_by_id(&id).await.unwrap().title, "final");
}

#[tokio::test]
async fn update_one_leaves_unserialized_fields_untouched() {
    let store = DocumentStore::new(RecordingBackend::new());
    let notes = store.collection::<Note>();

    let mut note = Note {
        tag: Some("keep".into()),
        ..Note::new("title", "body")
    };
    let id = notes.insert(&mut note).await.unwrap();

    let mut partial = Note {
        id: id.clone(),
        ..Note::new("renamed", "body")
    };
    notes.update_by_id(&id, &mut partial).await.unwrap();

    let call = store.backend().last_call().unwrap();
    assert_eq!(
        call.payload.get_document("update").unwrap(),
        &doc! { "$set": { "title": "renamed", "body": "body" } }
    );

    let stored = notes.find_by_id(&id).await.unwrap();
    assert_eq!(stored.title, "renamed");
    assert_eq!(stored.tag.as_deref(), Some("keep"));
}

#[tokio::test]
async fn update_with_only_skipped_fields_changes_nothing() {
    let store = DocumentStore::new(InMemoryStore::new());
    let sparse = store.collection::<Sparse>();

    let mut record = Sparse { tag: Some("keep".into()), ..Default::default() };
    let id = sparse.insert(&mut record).await.unwrap();

    sparse
        .update_by_id(&id, &mut Sparse { id: id.clone(), tag: None })
        .await
        .unwrap();

    assert_eq!(sparse.find_by_id(&id).await.unwrap(), record);
}

#[tokio::test]
async fn update_one_matching_nothing_is_not_an_error() {
    let store = DocumentStore::new(InMemoryStore::new());
    let notes = store.collection::<Note>();

    notes
        .update_by_id("missing", &mut Note::new("t", "b"))
        .await
        .unwrap();

    assert_eq!(notes.count_documents(doc! {}).await.unwrap(), 0);
}

#[tokio::test]
async fn delete_reports_nothing_deleted_distinctly() {
    let store = DocumentStore::new(InMemoryStore::new());
    let notes = store.collection::<Note>();

    let id = notes.insert(&mut Note::new("t", "b")).await.unwrap();

    notes.delete_by_id(&id).await.unwrap();
    let err = notes.delete_by_id(&id).await.unwrap_err();

    assert!(matches!(err, DocumentStoreError::NothingDeleted(ref collection) if collection == "notes"));
    assert!(!err.aborted_before_store());
    assert!(err.is_not_found());
    assert!(!matches!(err, DocumentStoreError::DocumentNotFound(_)));
}

#[tokio::test]
async fn find_one_missing_is_not_found_but_find_is_empty() {
    let store = DocumentStore::new(InMemoryStore::new());
    let notes = store.collection::<Note>();

    assert!(notes.find_by_id("nope").await.unwrap_err().is_not_found());
    assert!(
        notes
            .find(doc! { "title": "nope" }, FindOptions::default())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn find_applies_sort_skip_and_limit() {
    let store = DocumentStore::new(InMemoryStore::new());
    let notes = store.collection::<Note>();

    for title in ["c", "a", "d", "b"] {
        notes.insert(&mut Note::new(title, "")).await.unwrap();
    }

    let page = notes
        .find(
            doc! { "title": { "$ne": "d" } },
            FindOptions::builder()
                .sort("title", SortDirection::Asc)
                .skip(1)
                .limit(2)
                .build(),
        )
        .await
        .unwrap();

    let titles = page
        .iter()
        .map(|note| note.title.as_str())
        .collect::<Vec<_>>();
    assert_eq!(titles, ["b", "c"]);
}

#[tokio::test]
async fn update_many_applies_operators_to_every_match() {
    let store = DocumentStore::new(InMemoryStore::new());
    let notes = store.collection::<Note>();

    for (title, tag) in [("a", "x"), ("b", "x"), ("c", "y")] {
        let mut note = Note { tag: Some(tag.into()), ..Note::new(title, "") };
        notes.insert(&mut note).await.unwrap();
    }

    notes
        .update_many(doc! { "tag": "x" }, doc! { "$set": { "body": "bulk" } })
        .await
        .unwrap();

    assert_eq!(notes.count_documents(doc! { "body": "bulk" }).await.unwrap(), 2);

    let err = notes
        .update_many(doc! {}, doc! { "body": "replacement" })
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::InvalidUpdate(_)));
}

#[tokio::test]
async fn dyn_store_hands_out_the_same_collections() {
    let store = DocumentStore::new(InMemoryStore::new())
        .with_id_generator(SequentialIdGenerator::new("d"))
        .into_dyn();
    let mut notes = store.collection::<Note>();
    notes.hooks_mut().on_find_one(|filter| {
        filter.insert("tag", "shared");
        Ok(())
    });

    let mut note = Note { tag: Some("shared".into()), ..Note::new("t", "b") };
    let id = notes.insert(&mut note).await.unwrap();

    assert_eq!(id, "d1");
    assert_eq!(notes.find_by_id(&id).await.unwrap(), note);
    assert!(store.downcast_backend::<InMemoryStore>().is_some());
    assert_eq!(store.list_collections().await.unwrap(), ["notes"]);

    drop(notes);
    store.shutdown().await.unwrap();
}

#[tokio::test]
async fn named_collections_are_separate() {
    let store = DocumentStore::new(InMemoryStore::new());
    let archive = store.collection_named::<Note>("archive");
    let notes = store.collection::<Note>();

    archive.insert(&mut Note::new("old", "")).await.unwrap();

    assert_eq!(archive.name(), "archive");
    assert_eq!(notes.count_documents(doc! {}).await.unwrap(), 0);

    store.drop_collection("archive").await.unwrap();
    assert_eq!(archive.count_documents(doc! {}).await.unwrap(), 0);
}

#[tokio::test]
async fn slow_store_calls_time_out() {
    let config = StoreConfig::builder()
        .with_timeout(Duration::from_millis(20))
        .build();
    let store = DocumentStore::with_config(RecordingBackend::with_delay(Duration::from_millis(500)), config);
    let notes = store.collection::<Note>();

    let err = notes.count_documents(doc! {}).await.unwrap_err();

    assert!(matches!(err, DocumentStoreError::Timeout(limit) if limit == Duration::from_millis(20)));
    assert_eq!(store.backend().call_count(), 1);
}

#[test]
fn untimed_store_runs_on_any_executor() {
    let config = StoreConfig::builder().without_timeout().build();
    let store = DocumentStore::with_config(InMemoryStore::new(), config);
    let notes = store.collection::<Note>();

    let id = block_on(notes.insert(&mut Note::new("t", "b"))).unwrap();

    assert_eq!(block_on(notes.count_documents(doc! {})).unwrap(), 1);
    assert_eq!(block_on(notes.find_by_id(&id)).unwrap().title, "t");
}
