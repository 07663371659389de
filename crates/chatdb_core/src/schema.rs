//! Schema definitions and versioned, additive upgrades.
//!
//! A [`Schema`] is an ordered list of [`SchemaStep`]s. Upgrading a store from
//! version `a` to `b` applies every step with `a < version <= b`. Steps only
//! ever create collections and indexes; nothing is dropped or rewritten, so
//! running an upgrade twice is a no-op.
//!
//! ```rust,ignore
//! let schema = Schema::new()
//!     .step(
//!         SchemaStep::new(1)
//!             .create_collection("users", "id")
//!             .create_index("users", "username", "username"),
//!     )
//!     .step(SchemaStep::new(2).create_collection("friend_requests", "id"));
//!
//! SchemaManager::new(schema).ensure_schema(&store, 2).await?;
//! ```

use crate::error::StoreResult;
use crate::store::Store;
use crate::types::SchemaVersion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Definition of a secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name used in queries.
    pub name: String,
    /// Top-level document field the index is keyed by.
    pub key_path: String,
}

impl IndexSpec {
    /// Creates an index definition.
    pub fn new(name: impl Into<String>, key_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_path: key_path.into(),
        }
    }
}

/// Definition of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    /// Collection name.
    pub name: String,
    /// Document field holding the primary key.
    pub key_path: String,
    /// Secondary indexes keyed by name.
    pub indexes: BTreeMap<String, IndexSpec>,
}

impl CollectionSpec {
    /// Creates a collection definition without indexes.
    pub fn new(name: impl Into<String>, key_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_path: key_path.into(),
            indexes: BTreeMap::new(),
        }
    }

    /// Adds an index unless one with that name exists; returns whether it was added.
    pub fn add_index(&mut self, index: IndexSpec) -> bool {
        if self.indexes.contains_key(&index.name) {
            return false;
        }
        self.indexes.insert(index.name.clone(), index);
        true
    }

    /// Returns an index definition by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexSpec> {
        self.indexes.get(name)
    }
}

/// One additive schema change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaChange {
    /// Create a collection if it does not exist.
    CreateCollection {
        /// Collection name.
        name: String,
        /// Primary key field.
        key_path: String,
    },
    /// Create an index if it does not exist, backfilling it from existing rows.
    CreateIndex {
        /// Collection the index belongs to.
        collection: String,
        /// Index definition.
        index: IndexSpec,
    },
}

/// The changes that bring a store to `version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaStep {
    /// Version reached once this step is applied.
    pub version: SchemaVersion,
    /// Changes in application order.
    pub changes: Vec<SchemaChange>,
}

impl SchemaStep {
    /// Creates an empty step.
    #[must_use]
    pub fn new(version: SchemaVersion) -> Self {
        Self {
            version,
            changes: Vec::new(),
        }
    }

    /// Adds a collection.
    #[must_use]
    pub fn create_collection(mut self, name: &str, key_path: &str) -> Self {
        self.changes.push(SchemaChange::CreateCollection {
            name: name.to_string(),
            key_path: key_path.to_string(),
        });
        self
    }

    /// Adds an index on `collection`.
    #[must_use]
    pub fn create_index(mut self, collection: &str, name: &str, key_path: &str) -> Self {
        self.changes.push(SchemaChange::CreateIndex {
            collection: collection.to_string(),
            index: IndexSpec::new(name, key_path),
        });
        self
    }
}

/// The full versioned schema of an application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    steps: Vec<SchemaStep>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a step, keeping steps ordered by version.
    #[must_use]
    pub fn step(mut self, step: SchemaStep) -> Self {
        let at = self.steps.partition_point(|s| s.version <= step.version);
        self.steps.insert(at, step);
        self
    }

    /// Returns the highest version any step reaches.
    #[must_use]
    pub fn latest_version(&self) -> SchemaVersion {
        self.steps.last().map_or(0, |s| s.version)
    }

    /// Returns the steps with `from < version <= to`.
    pub fn steps_between(
        &self,
        from: SchemaVersion,
        to: SchemaVersion,
    ) -> impl Iterator<Item = &SchemaStep> {
        self.steps
            .iter()
            .filter(move |s| s.version > from && s.version <= to)
    }
}

/// Outcome of [`SchemaManager::ensure_schema`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaUpgrade {
    /// Version found in the store.
    pub from: SchemaVersion,
    /// Version the store is at now.
    pub to: SchemaVersion,
    /// Collections created by this upgrade.
    pub created_collections: Vec<String>,
    /// Indexes created by this upgrade, as `(collection, index)`.
    pub created_indexes: Vec<(String, String)>,
}

impl SchemaUpgrade {
    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.from == self.to
            && self.created_collections.is_empty()
            && self.created_indexes.is_empty()
    }
}

/// Brings stores up to a version of a [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaManager {
    schema: Schema,
}

impl SchemaManager {
    /// Creates a manager for `schema`.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    /// Returns the managed schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Upgrades `store` to `target`, creating whatever is missing.
    ///
    /// # Errors
    ///
    /// - `VersionDowngrade` if the store is already past `target`
    /// - `CollectionNotFound` if a step indexes a collection nothing created
    /// - I/O errors while saving the manifest; the store is left unchanged
    pub async fn ensure_schema(
        &self,
        store: &Store,
        target: SchemaVersion,
    ) -> StoreResult<SchemaUpgrade> {
        tokio::task::yield_now().await;
        let upgrade = store.upgrade_schema(&self.schema, target)?;
        if !upgrade.is_noop() {
            info!(
                from = upgrade.from,
                to = upgrade.to,
                collections = ?upgrade.created_collections,
                indexes = ?upgrade.created_indexes,
                "schema upgraded"
            );
        }
        Ok(upgrade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::types::TransactionMode;
    use ciborium::Value;

    fn schema() -> Schema {
        Schema::new()
            .step(SchemaStep::new(2).create_index("notes", "by_author", "author"))
            .step(SchemaStep::new(1).create_collection("notes", "id"))
    }

    fn note(id: &str, author: &str) -> Value {
        Value::Map(vec![
            (Value::Text("id".into()), Value::Text(id.into())),
            (Value::Text("author".into()), Value::Text(author.into())),
        ])
    }

    #[test]
    fn steps_are_ordered() {
        let schema = schema();
        assert_eq!(schema.latest_version(), 2);
        let versions: Vec<_> = schema.steps_between(0, 2).map(|s| s.version).collect();
        assert_eq!(versions, vec![1, 2]);
        assert_eq!(schema.steps_between(1, 2).count(), 1);
    }

    #[test]
    fn collection_spec_indexes_are_idempotent() {
        let mut spec = CollectionSpec::new("notes", "id");
        assert!(spec.add_index(IndexSpec::new("by_author", "author")));
        assert!(!spec.add_index(IndexSpec::new("by_author", "other")));
        assert_eq!(spec.index("by_author").unwrap().key_path, "author");
    }

    #[tokio::test]
    async fn upgrade_is_additive_and_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let manager = SchemaManager::new(schema());

        let first = manager.ensure_schema(&store, 1).await.unwrap();
        assert_eq!(first.created_collections, vec!["notes".to_string()]);
        assert_eq!(store.schema_version(), 1);

        let again = manager.ensure_schema(&store, 1).await.unwrap();
        assert!(again.is_noop());
    }

    #[tokio::test]
    async fn new_index_is_backfilled() {
        let store = Store::open_in_memory().unwrap();
        let manager = SchemaManager::new(schema());
        manager.ensure_schema(&store, 1).await.unwrap();

        store
            .runner()
            .run(&["notes"], TransactionMode::ReadWrite, |txn| {
                txn.add("notes", note("n1", "ada"))?;
                txn.add("notes", note("n2", "bob"))?;
                Ok(())
            })
            .await
            .unwrap();

        let upgrade = manager.ensure_schema(&store, 2).await.unwrap();
        assert_eq!(
            upgrade.created_indexes,
            vec![("notes".to_string(), "by_author".to_string())]
        );

        let found = store
            .runner()
            .run(&["notes"], TransactionMode::ReadOnly, |txn| {
                txn.get_all_by_index("notes", "by_author", "ada")
            })
            .await
            .unwrap();
        assert_eq!(found, vec![note("n1", "ada")]);
    }

    #[tokio::test]
    async fn downgrade_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        let manager = SchemaManager::new(schema());
        manager.ensure_schema(&store, 2).await.unwrap();

        let err = manager.ensure_schema(&store, 1).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionDowngrade {
                stored: 2,
                target: 1
            }
        ));
        assert_eq!(store.schema_version(), 2);
    }

    #[tokio::test]
    async fn index_on_unknown_collection_fails() {
        let store = Store::open_in_memory().unwrap();
        let schema = Schema::new().step(SchemaStep::new(1).create_index("ghosts", "x", "x"));
        let manager = SchemaManager::new(schema);

        let err = manager.ensure_schema(&store, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::CollectionNotFound { .. }));
        assert_eq!(store.schema_version(), 0);
    }
}
