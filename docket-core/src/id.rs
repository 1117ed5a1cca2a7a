//! Identifier generation for new records.
//!
//! A [`DocumentStore`](crate::store::DocumentStore) owns one [`IdGenerator`] and shares it with
//! every collection it hands out. The default produces hex-encoded ObjectIds; tests can
//! inject a [`SequentialIdGenerator`] to get predictable identifiers.

use bson::oid::ObjectId;
use std::{
    fmt::Debug,
    sync::atomic::{AtomicU64, Ordering},
};
use uuid::Uuid;

/// Produces unique, URL-safe string identifiers.
///
/// Implementations must be safe to call concurrently and must never return an
/// empty string.
pub trait IdGenerator: Send + Sync + Debug {
    fn generate(&self) -> String;
}

/// Generates 24-character hex ObjectIds.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectIdGenerator;

impl IdGenerator for ObjectIdGenerator {
    fn generate(&self) -> String {
        ObjectId::new().to_hex()
    }
}

/// Generates random v4 UUIDs in their 32-character simple form.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4()
            .simple()
            .to_string()
    }
}

/// Generates `prefix` followed by an increasing counter, starting at 1.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        format!("{}{}", self.prefix, self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn object_ids_are_hex_and_unique() {
        let ids = (0..1000)
            .map(|_| ObjectIdGenerator.generate())
            .collect::<HashSet<_>>();

        assert_eq!(ids.len(), 1000);
        assert!(ids
            .iter()
            .all(|id| id.len() == 24 && id.chars().all(|c| c.is_ascii_hexdigit())));
    }

    #[test]
    fn uuids_use_the_simple_form() {
        let id = UuidGenerator.generate();

        assert_eq!(id.len(), 32);
        assert!(!id.contains('-'));
    }

    #[test]
    fn sequential_ids_count_up_from_one() {
        let ids = SequentialIdGenerator::new("note-");

        assert_eq!(ids.generate(), "note-1");
        assert_eq!(ids.generate(), "note-2");
    }
}
