//! Transaction scopes.

use crate::collection::Collection;
use crate::entity::Entity;
use crate::error::{StoreError, StoreResult};
use crate::index::IndexKey;
use crate::journal::JournalOp;
use crate::state::CollectionState;
use crate::store::Store;
use crate::types::{TransactionId, TransactionMode};
use ciborium::Value;
use parking_lot::MutexGuard;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Held by a read-write scope for its whole life.
pub(crate) type WriterGuard<'s> = MutexGuard<'s, ()>;

/// A transaction scope over a fixed set of collections.
///
/// Reads see committed rows merged with this scope's own staged writes.
/// Writes are staged and reach the store only when the scope commits, as a
/// single journal record. Dropping a scope without committing discards them.
///
/// Transactions are created by [`Store::begin`] or, more usually, by
/// [`TransactionRunner::run`](crate::TransactionRunner::run).
///
/// A read-write scope holds the store's writer lock from `begin` until it
/// is committed, aborted or dropped.
pub struct Transaction<'s> {
    store: &'s Store,
    id: TransactionId,
    mode: TransactionMode,
    scope: BTreeSet<String>,
    writes: Vec<JournalOp>,
    staged: HashMap<String, HashMap<String, Option<Value>>>,
    writer: Option<WriterGuard<'s>>,
}

impl<'s> Transaction<'s> {
    pub(crate) fn new(
        store: &'s Store,
        id: TransactionId,
        mode: TransactionMode,
        scope: BTreeSet<String>,
        writer: Option<WriterGuard<'s>>,
    ) -> Self {
        Self {
            store,
            id,
            mode,
            scope,
            writes: Vec::new(),
            staged: HashMap::new(),
            writer,
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Number of staged writes.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Returns a typed view of the collection holding `E`.
    pub fn collection<E: Entity>(&mut self) -> Collection<'_, 's, E> {
        Collection::new(self)
    }

    /// Gets a document by primary key.
    pub fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Value>> {
        self.check_scope(collection)?;
        if let Some(staged) = self.staged_value(collection, key) {
            return Ok(staged.cloned());
        }
        let state = self.store.state();
        Ok(state.collection(collection)?.get(key).cloned())
    }

    /// Gets every document in insertion order.
    pub fn get_all(&self, collection: &str) -> StoreResult<Vec<Value>> {
        self.check_scope(collection)?;
        let state = self.store.state();
        let coll = state.collection(collection)?;
        Ok(self.merged(collection, coll))
    }

    /// Gets every document whose indexed field equals `key`, in insertion order.
    pub fn get_all_by_index(
        &self,
        collection: &str,
        index: &str,
        key: impl Into<IndexKey>,
    ) -> StoreResult<Vec<Value>> {
        self.check_scope(collection)?;
        let key = key.into();
        let state = self.store.state();
        let coll = state.collection(collection)?;

        let Some(spec) = coll.spec().index(index) else {
            return Err(StoreError::IndexNotFound {
                collection: collection.to_string(),
                index: index.to_string(),
            });
        };

        if !self.staged.contains_key(collection) {
            return Ok(coll
                .lookup(index, &key)?
                .into_iter()
                .map(|(_, v)| v.clone())
                .collect());
        }

        Ok(self
            .merged(collection, coll)
            .into_iter()
            .filter(|doc| IndexKey::extract(doc, &spec.key_path).as_ref() == Some(&key))
            .collect())
    }

    /// Counts the documents in a collection.
    pub fn count(&self, collection: &str) -> StoreResult<usize> {
        self.check_scope(collection)?;
        if self.staged.contains_key(collection) {
            return Ok(self.get_all(collection)?.len());
        }
        Ok(self.store.state().collection(collection)?.len())
    }

    /// Inserts a new document; returns its primary key.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` if a document with the same key exists, committed or
    /// staged in this scope.
    pub fn add(&mut self, collection: &str, document: Value) -> StoreResult<String> {
        self.check_writable(collection)?;
        let key = self.primary_key(collection, &document)?;
        if self.get(collection, &key)?.is_some() {
            return Err(StoreError::DuplicateKey {
                collection: collection.to_string(),
                key,
            });
        }
        self.stage_put(collection, key.clone(), document);
        Ok(key)
    }

    /// Inserts or replaces a document; returns its primary key.
    pub fn put(&mut self, collection: &str, document: Value) -> StoreResult<String> {
        self.check_writable(collection)?;
        let key = self.primary_key(collection, &document)?;
        self.stage_put(collection, key.clone(), document);
        Ok(key)
    }

    /// Deletes a document; returns whether it existed.
    pub fn delete(&mut self, collection: &str, key: &str) -> StoreResult<bool> {
        self.check_writable(collection)?;
        if self.get(collection, key)?.is_none() {
            return Ok(false);
        }
        self.writes.push(JournalOp::Delete {
            collection: collection.to_string(),
            key: key.to_string(),
        });
        self.staged
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), None);
        Ok(true)
    }

    pub(crate) fn into_writes(
        self,
    ) -> (TransactionId, Vec<JournalOp>, Option<WriterGuard<'s>>) {
        (self.id, self.writes, self.writer)
    }

    /// Extracts the primary key `collection` would store `document` under.
    pub(crate) fn key_of(&self, collection: &str, document: &Value) -> StoreResult<String> {
        self.check_writable(collection)?;
        self.primary_key(collection, document)
    }

    fn check_scope(&self, collection: &str) -> StoreResult<()> {
        if self.scope.contains(collection) {
            Ok(())
        } else {
            Err(StoreError::OutOfScope {
                collection: collection.to_string(),
            })
        }
    }

    fn check_writable(&self, collection: &str) -> StoreResult<()> {
        self.check_scope(collection)?;
        if self.mode.is_read_only() {
            return Err(StoreError::ReadOnlyTransaction {
                collection: collection.to_string(),
            });
        }
        Ok(())
    }

    fn primary_key(&self, collection: &str, document: &Value) -> StoreResult<String> {
        let state = self.store.state();
        let key_path = state.collection(collection)?.spec().key_path.clone();
        drop(state);

        match IndexKey::extract(document, &key_path) {
            Some(IndexKey::Text(key)) if !key.is_empty() => Ok(key),
            _ => Err(StoreError::invalid_entity(
                collection,
                format!("missing or empty text key field {key_path:?}"),
            )),
        }
    }

    fn stage_put(&mut self, collection: &str, key: String, document: Value) {
        self.writes.push(JournalOp::Put {
            collection: collection.to_string(),
            key: key.clone(),
            value: document.clone(),
        });
        self.staged
            .entry(collection.to_string())
            .or_default()
            .insert(key, Some(document));
    }

    /// `Some(None)` when staged as deleted, `None` when not staged at all.
    fn staged_value(&self, collection: &str, key: &str) -> Option<Option<&Value>> {
        self.staged
            .get(collection)
            .and_then(|c| c.get(key))
            .map(Option::as_ref)
    }

    /// Committed rows overlaid with staged writes; new keys follow in staging order.
    fn merged(&self, collection: &str, coll: &CollectionState) -> Vec<Value> {
        let Some(staged) = self.staged.get(collection) else {
            return coll.iter().map(|(_, v)| v.clone()).collect();
        };

        let mut out: Vec<Value> = coll
            .iter()
            .filter_map(|(key, committed)| match staged.get(key) {
                Some(overlay) => overlay.clone(),
                None => Some(committed.clone()),
            })
            .collect();

        let mut seen = HashSet::new();
        for op in &self.writes {
            if let JournalOp::Put { collection: c, key, .. } = op {
                if c == collection && !coll.contains(key) && seen.insert(key.as_str()) {
                    if let Some(Some(doc)) = staged.get(key) {
                        out.push(doc.clone());
                    }
                }
            }
        }
        out
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("scope", &self.scope)
            .field("pending_writes", &self.writes.len())
            .field("holds_writer", &self.writer.is_some())
            .finish()
    }
}
