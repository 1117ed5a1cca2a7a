//! Convenient re-exports of commonly used types from docket.
//!
//! ```ignore
//! use docket::prelude::*;
//! ```

pub use docket_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::{Collection, DynCollection},
    config::StoreConfig,
    error::{BoxError, DocumentStoreError, DocumentStoreResult, HookResult, LifecycleHook, Operation},
    hooks::Hooks,
    id::{IdGenerator, ObjectIdGenerator, SequentialIdGenerator, UuidGenerator},
    query::{FindOptions, Sort, SortDirection, by_id},
    record::{BeforeInsert, BeforeUpdate, Record, RecordExt, Timestamps},
    store::{DocumentStore, DynDocumentStore, IntoDynDocumentStore},
};

pub use bson::doc;
pub use docket_macros::Record;
