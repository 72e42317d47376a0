//! Nested in-memory resource store.
//!
//! Documents are stored in a tree that mirrors the URL patterns they were
//! added through. For `/Pet/{Kind}/Toy` the tree looks like:
//!
//! ```text
//! root
//! └── Pet                 entries: {"Kind":"Dog"}, {"Kind":"Cat"}
//!     ├── Dog (property)
//!     │   └── Toy         entries: {"Name":"Ball"}
//!     └── Cat (property)
//! ```
//!
//! Each stored entry with an identity value owns a property child named after
//! that value; replacing or removing the entry replaces or removes that child
//! and everything below it.
//!
//! ## Partitions
//!
//! A discriminator selects an independent tree. Entries added under one
//! discriminator are invisible to every other, and cascading deletes never
//! cross partitions. The absent discriminator is the default partition.
//!
//! The store has no internal locking; the engine owns it behind its lock.

mod resource;

pub use resource::{Entry, Resource};

use crate::route::{self, RouteToken};
use bytes::Bytes;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Partition used when no discriminator is supplied.
pub const DEFAULT_PARTITION: &str = "";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid JSON document: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Path '{path}' does not match pattern '{pattern}'")]
    RouteMismatch { path: String, pattern: String },
}

/// Tokens addressing the collection that holds the entry identified by
/// `key_property`.
///
/// When the terminal token captures the identity property itself (`/Pet/{Kind}`
/// with key `Kind`) the entry lives in the parent resource (`/Pet`), so the
/// terminal token is dropped.
pub fn parent_resource_of<'a>(tokens: &'a [RouteToken], key_property: Option<&str>) -> &'a [RouteToken] {
    match (tokens.split_last(), key_property) {
        (Some((last, parent)), Some(key)) if last.is_property_named(key) => parent,
        _ => tokens,
    }
}

#[derive(Debug, Default)]
pub struct Imdb {
    partitions: HashMap<String, Resource>,
}

fn partition_key(discriminator: Option<&str>) -> &str {
    discriminator.unwrap_or(DEFAULT_PARTITION)
}

fn tokenize(path: &str, pattern: &str) -> Result<Vec<RouteToken>, StoreError> {
    route::tokenize(path, pattern).ok_or_else(|| StoreError::RouteMismatch {
        path: path.to_string(),
        pattern: pattern.to_string(),
    })
}

impl Imdb {
    pub fn new() -> Self {
        Self::default()
    }

    fn partition(&self, discriminator: Option<&str>) -> Option<&Resource> {
        self.partitions.get(partition_key(discriminator))
    }

    fn partition_mut(&mut self, discriminator: Option<&str>) -> Option<&mut Resource> {
        self.partitions.get_mut(partition_key(discriminator))
    }

    /// Add a JSON document (and optional binary payload) at `path`.
    ///
    /// Entries sharing the `key_property` value are replaced; entries without
    /// a value for it are appended. Malformed JSON is rejected before the tree
    /// is touched.
    pub fn add_json(
        &mut self,
        path: &str,
        pattern: &str,
        key_property: Option<&str>,
        json: &str,
        binary: Option<Bytes>,
        discriminator: Option<&str>,
    ) -> Result<(), StoreError> {
        let entry = Entry::parse(json, binary)?;
        let tokens = tokenize(path, pattern)?;
        self.add_entry(&tokens, key_property, entry, discriminator);
        Ok(())
    }

    /// Token-level add used by the engine once a rule has matched.
    pub fn add_entry(
        &mut self,
        tokens: &[RouteToken],
        key_property: Option<&str>,
        entry: Entry,
        discriminator: Option<&str>,
    ) {
        let collection = parent_resource_of(tokens, key_property);
        debug!(
            depth = collection.len(),
            key = ?key_property,
            partition = partition_key(discriminator),
            "Adding entry to store"
        );
        self.partitions
            .entry(partition_key(discriminator).to_string())
            .or_default()
            .descend_or_create(collection)
            .upsert(key_property, entry);
    }

    /// Find the entry whose `key_property` equals `value` (`None` matches
    /// entries without the property).
    pub fn lookup(
        &self,
        path: &str,
        pattern: &str,
        key_property: &str,
        value: Option<&str>,
        discriminator: Option<&str>,
    ) -> Option<&Entry> {
        let tokens = route::tokenize(path, pattern)?;
        self.lookup_entry(&tokens, key_property, value, discriminator)
    }

    pub fn lookup_entry(
        &self,
        tokens: &[RouteToken],
        key_property: &str,
        value: Option<&str>,
        discriminator: Option<&str>,
    ) -> Option<&Entry> {
        self.partition(discriminator)?
            .descend(parent_resource_of(tokens, Some(key_property)))?
            .find_entry(key_property, value)
    }

    pub fn exists(
        &self,
        path: &str,
        pattern: &str,
        key_property: &str,
        value: Option<&str>,
        discriminator: Option<&str>,
    ) -> bool {
        self.lookup(path, pattern, key_property, value, discriminator)
            .is_some()
    }

    /// Remove at most one matching entry and its property child.
    pub fn remove(
        &mut self,
        path: &str,
        pattern: &str,
        key_property: &str,
        value: Option<&str>,
        discriminator: Option<&str>,
    ) -> bool {
        route::tokenize(path, pattern)
            .and_then(|tokens| self.remove_entry(&tokens, key_property, value, discriminator))
            .is_some()
    }

    pub fn remove_entry(
        &mut self,
        tokens: &[RouteToken],
        key_property: &str,
        value: Option<&str>,
        discriminator: Option<&str>,
    ) -> Option<Entry> {
        let removed = self
            .partition_mut(discriminator)?
            .descend_mut(parent_resource_of(tokens, Some(key_property)))?
            .remove_entry(key_property, value);
        if removed.is_some() {
            debug!(key = key_property, value = ?value, "Removed entry from store");
        }
        removed
    }

    /// Clear every partition.
    pub fn remove_all(&mut self) {
        self.partitions.clear();
    }

    /// The resource node addressed by `path`, regardless of entry identity.
    pub fn lookup_resource(
        &self,
        path: &str,
        pattern: &str,
        discriminator: Option<&str>,
    ) -> Option<&Resource> {
        let tokens = route::tokenize(path, pattern)?;
        self.resource_at(&tokens, discriminator)
    }

    pub fn resource_at(&self, tokens: &[RouteToken], discriminator: Option<&str>) -> Option<&Resource> {
        self.partition(discriminator)?.descend(tokens)
    }

    pub fn contains_resource(&self, path: &str, pattern: &str, discriminator: Option<&str>) -> bool {
        self.lookup_resource(path, pattern, discriminator).is_some()
    }

    /// Remove the resource node addressed by `path` and its subtree.
    pub fn remove_resource(&mut self, path: &str, pattern: &str, discriminator: Option<&str>) -> bool {
        route::tokenize(path, pattern)
            .is_some_and(|tokens| self.remove_resource_at(&tokens, discriminator))
    }

    pub fn remove_resource_at(&mut self, tokens: &[RouteToken], discriminator: Option<&str>) -> bool {
        match tokens.split_last() {
            Some((last, parent)) => self
                .partition_mut(discriminator)
                .and_then(|root| root.descend_mut(parent))
                .and_then(|node| node.remove_child(last))
                .is_some(),
            // The root of a partition: drop the partition itself
            None => self
                .partitions
                .remove(partition_key(discriminator))
                .is_some(),
        }
    }

    /// Remove, in every partition, the resource addressed by the literal
    /// prefix of `pattern`. Returns the number of partitions touched.
    pub fn purge_pattern(&mut self, pattern: &str) -> usize {
        let prefix = route::literal_prefix(pattern);
        if prefix.is_empty() {
            let count = self.partitions.len();
            self.partitions.clear();
            return count;
        }

        let Some((last, parent)) = prefix.split_last() else {
            return 0;
        };
        self.partitions
            .values_mut()
            .filter_map(|root| root.descend_mut(parent))
            .filter_map(|node| node.remove_child(last))
            .count()
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }
}
