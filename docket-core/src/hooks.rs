//! Per-collection interception chains.
//!
//! A [`Hooks`] registry holds one ordered chain of callbacks per hookable
//! [`Operation`]. Before a collection talks to its backend it runs the chain for that
//! operation. Callbacks receive the filter (and, depending on the operation, the record or
//! the update expression) by mutable reference, so a rewrite made by one callback is seen
//! by every later callback and by the store call.
//!
//! Callbacks run in registration order. The first one to return an error stops the chain;
//! the call then fails with [`DocumentStoreError::HookAborted`] carrying that error, and
//! nothing after it runs.
//!
//! # Example
//!
//! ```ignore
//! let mut notes = store.collection::<Note>();
//!
//! // Tenant isolation: every lookup is narrowed to the current tenant.
//! notes.hooks_mut().on_find(|filter| {
//!     filter.insert("tenant", "acme");
//!     Ok(())
//! });
//! ```

use bson::Document;
use std::fmt;

use crate::error::{DocumentStoreError, DocumentStoreResult, HookResult, Operation};

/// Callback receiving the filter of a `delete_one`, `find_one`, `find` or `count` call.
pub type FilterHook = Box<dyn Fn(&mut Document) -> HookResult + Send + Sync>;

/// Callback receiving the filter and the record of an `update_one` call.
pub type UpdateOneHook<T> = Box<dyn Fn(&mut Document, &mut T) -> HookResult + Send + Sync>;

/// Callback receiving the filter and the update expression of an `update_many` call.
pub type UpdateManyHook = Box<dyn Fn(&mut Document, &mut Document) -> HookResult + Send + Sync>;

/// Ordered hook chains for one collection handle.
///
/// Chains only grow. Registration needs `&mut self` while dispatch only needs `&self`,
/// so a chain cannot change underneath a running call.
pub struct Hooks<T> {
    delete_one: Vec<FilterHook>,
    update_one: Vec<UpdateOneHook<T>>,
    update_many: Vec<UpdateManyHook>,
    find_one: Vec<FilterHook>,
    find: Vec<FilterHook>,
    count: Vec<FilterHook>,
}

impl<T> Hooks<T> {
    /// Creates a registry with every chain empty.
    pub fn new() -> Self {
        Self {
            delete_one: Vec::new(),
            update_one: Vec::new(),
            update_many: Vec::new(),
            find_one: Vec::new(),
            find: Vec::new(),
            count: Vec::new(),
        }
    }

    /// Appends a callback to the `delete_one` chain.
    pub fn on_delete_one<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Document) -> HookResult + Send + Sync + 'static,
    {
        self.delete_one.push(Box::new(hook));
        self
    }

    /// Appends a callback to the `update_one` chain.
    ///
    /// The callback may rewrite both the filter and the record about to be written.
    pub fn on_update_one<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Document, &mut T) -> HookResult + Send + Sync + 'static,
    {
        self.update_one.push(Box::new(hook));
        self
    }

    /// Appends a callback to the `update_many` chain.
    ///
    /// The callback may rewrite both the filter and the update expression.
    pub fn on_update_many<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Document, &mut Document) -> HookResult + Send + Sync + 'static,
    {
        self.update_many.push(Box::new(hook));
        self
    }

    /// Appends a callback to the `find_one` chain.
    pub fn on_find_one<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Document) -> HookResult + Send + Sync + 'static,
    {
        self.find_one.push(Box::new(hook));
        self
    }

    /// Appends a callback to the `find` chain.
    pub fn on_find<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Document) -> HookResult + Send + Sync + 'static,
    {
        self.find.push(Box::new(hook));
        self
    }

    /// Appends a callback to the `count` chain.
    pub fn on_count<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Document) -> HookResult + Send + Sync + 'static,
    {
        self.count.push(Box::new(hook));
        self
    }

    /// Returns the number of callbacks registered for `operation`.
    pub fn hook_count(&self, operation: Operation) -> usize {
        match operation {
            Operation::DeleteOne => self.delete_one.len(),
            Operation::UpdateOne => self.update_one.len(),
            Operation::UpdateMany => self.update_many.len(),
            Operation::FindOne => self.find_one.len(),
            Operation::Find => self.find.len(),
            Operation::Count => self.count.len(),
        }
    }

    /// Runs the chain of a filter-only operation against `filter`.
    ///
    /// Only `DeleteOne`, `FindOne`, `Find` and `Count` carry filter-only chains; the update
    /// operations have their own runners.
    pub(crate) fn run_filter_chain(
        &self,
        operation: Operation,
        filter: &mut Document,
    ) -> DocumentStoreResult<()> {
        let chain = match operation {
            Operation::DeleteOne => &self.delete_one,
            Operation::FindOne => &self.find_one,
            Operation::Find => &self.find,
            Operation::Count => &self.count,
            Operation::UpdateOne | Operation::UpdateMany => return Ok(()),
        };

        for (position, hook) in chain.iter().enumerate() {
            hook(filter).map_err(|source| aborted(operation, position, source))?;
        }

        Ok(())
    }

    pub(crate) fn run_update_one_chain(
        &self,
        filter: &mut Document,
        record: &mut T,
    ) -> DocumentStoreResult<()> {
        for (position, hook) in self.update_one.iter().enumerate() {
            hook(filter, record).map_err(|source| aborted(Operation::UpdateOne, position, source))?;
        }

        Ok(())
    }

    pub(crate) fn run_update_many_chain(
        &self,
        filter: &mut Document,
        update: &mut Document,
    ) -> DocumentStoreResult<()> {
        for (position, hook) in self.update_many.iter().enumerate() {
            hook(filter, update)
                .map_err(|source| aborted(Operation::UpdateMany, position, source))?;
        }

        Ok(())
    }
}

fn aborted(
    operation: Operation,
    position: usize,
    source: crate::error::BoxError,
) -> DocumentStoreError {
    tracing::debug!(%operation, position, error = %source, "hook chain aborted");
    DocumentStoreError::hook_aborted(operation, source)
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Hooks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for operation in Operation::ALL {
            map.entry(&operation.as_str(), &self.hook_count(operation));
        }
        map.finish()
    }
}
