//! Committed in-memory state: rows and indexes per collection.

use crate::error::{StoreError, StoreResult};
use crate::index::{HashIndex, IndexKey};
use crate::journal::{JournalOp, JournalRecord};
use crate::manifest::Manifest;
use crate::schema::{CollectionSpec, IndexSpec};
use ciborium::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Clone)]
struct Row {
    value: Value,
    ordinal: u64,
}

/// Rows of one collection in insertion order, plus their indexes.
#[derive(Debug)]
pub(crate) struct CollectionState {
    spec: CollectionSpec,
    rows: HashMap<String, Row>,
    order: BTreeMap<u64, String>,
    indexes: HashMap<String, HashIndex>,
    next_ordinal: u64,
}

impl CollectionState {
    pub(crate) fn new(spec: CollectionSpec) -> Self {
        let mut state = Self {
            spec: CollectionSpec::new(spec.name.clone(), spec.key_path.clone()),
            rows: HashMap::new(),
            order: BTreeMap::new(),
            indexes: HashMap::new(),
            next_ordinal: 0,
        };
        state.adopt_spec(spec);
        state
    }

    pub(crate) fn spec(&self) -> &CollectionSpec {
        &self.spec
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Value> {
        self.rows.get(key).map(|row| &row.value)
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.rows.contains_key(key)
    }

    /// Rows in insertion order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.order.values().filter_map(move |key| {
            self.rows
                .get(key)
                .map(|row| (key.as_str(), &row.value))
        })
    }

    /// Rows whose indexed field equals `key`, in insertion order.
    pub(crate) fn lookup(&self, index: &str, key: &IndexKey) -> StoreResult<Vec<(&str, &Value)>> {
        let idx = self
            .indexes
            .get(index)
            .ok_or_else(|| StoreError::IndexNotFound {
                collection: self.spec.name.clone(),
                index: index.to_string(),
            })?;

        let mut hits: Vec<(&str, &Row)> = idx
            .lookup(key)
            .filter_map(|pk| self.rows.get_key_value(pk).map(|(k, r)| (k.as_str(), r)))
            .collect();
        hits.sort_by_key(|(_, row)| row.ordinal);
        Ok(hits.into_iter().map(|(k, row)| (k, &row.value)).collect())
    }

    /// Inserts or replaces a row; a replaced row keeps its position.
    pub(crate) fn put(&mut self, key: &str, value: Value) {
        let ordinal = match self.rows.get(key) {
            Some(old) => {
                let (ordinal, old_value) = (old.ordinal, old.value.clone());
                self.unindex(key, &old_value);
                ordinal
            }
            None => {
                let ordinal = self.next_ordinal;
                self.next_ordinal += 1;
                self.order.insert(ordinal, key.to_string());
                ordinal
            }
        };

        for index in self.indexes.values_mut() {
            if let Some(ik) = IndexKey::extract(&value, &index.spec().key_path) {
                index.insert(ik, key);
            }
        }
        self.rows.insert(key.to_string(), Row { value, ordinal });
    }

    /// Removes a row; returns whether it existed.
    pub(crate) fn delete(&mut self, key: &str) -> bool {
        let Some(row) = self.rows.remove(key) else {
            return false;
        };
        self.order.remove(&row.ordinal);
        self.unindex(key, &row.value);
        true
    }

    fn unindex(&mut self, key: &str, value: &Value) {
        for index in self.indexes.values_mut() {
            if let Some(ik) = IndexKey::extract(value, &index.spec().key_path) {
                index.remove(&ik, key);
            }
        }
    }

    /// Creates an index and backfills it; returns false if it already exists.
    pub(crate) fn add_index(&mut self, spec: IndexSpec) -> bool {
        if self.indexes.contains_key(&spec.name) {
            return false;
        }
        let mut index = HashIndex::new(spec.clone());
        index.rebuild(self.rows.iter().filter_map(|(pk, row)| {
            IndexKey::extract(&row.value, &spec.key_path).map(|ik| (ik, pk.as_str()))
        }));
        debug!(
            collection = %self.spec.name,
            index = %spec.name,
            entries = index.len(),
            "index built"
        );
        self.spec.add_index(spec.clone());
        self.indexes.insert(spec.name, index);
        true
    }

    /// Takes over a (possibly extended) definition, building new indexes.
    pub(crate) fn adopt_spec(&mut self, spec: CollectionSpec) {
        self.spec.key_path = spec.key_path;
        for index in spec.indexes.into_values() {
            self.add_index(index);
        }
    }

    /// `(name, key path, entries)` per index, sorted by name.
    pub(crate) fn index_sizes(&self) -> Vec<(String, String, usize)> {
        let mut sizes: Vec<_> = self
            .indexes
            .values()
            .map(|i| (i.spec().name.clone(), i.spec().key_path.clone(), i.len()))
            .collect();
        sizes.sort();
        sizes
    }
}

/// Everything a store holds in memory.
#[derive(Debug, Default)]
pub(crate) struct StoreState {
    pub(crate) manifest: Manifest,
    collections: HashMap<String, CollectionState>,
    pub(crate) next_txid: u64,
    pub(crate) next_seq: u64,
    pub(crate) committed_seq: u64,
}

impl StoreState {
    pub(crate) fn new() -> Self {
        Self {
            next_txid: 1,
            next_seq: 1,
            ..Self::default()
        }
    }

    /// A collection defined by the schema.
    pub(crate) fn collection(&self, name: &str) -> StoreResult<&CollectionState> {
        if !self.manifest.collections.contains_key(name) {
            return Err(StoreError::collection_not_found(name));
        }
        self.collections
            .get(name)
            .ok_or_else(|| StoreError::collection_not_found(name))
    }

    /// Defined collections in name order.
    pub(crate) fn collections(&self) -> impl Iterator<Item = &CollectionState> + '_ {
        self.manifest
            .collections
            .keys()
            .filter_map(|name| self.collections.get(name))
    }

    /// Makes `manifest` current, creating or extending collection state.
    pub(crate) fn install_manifest(&mut self, manifest: Manifest) {
        for spec in manifest.collections.values() {
            match self.collections.get_mut(&spec.name) {
                Some(existing) => existing.adopt_spec(spec.clone()),
                None => {
                    self.collections
                        .insert(spec.name.clone(), CollectionState::new(spec.clone()));
                }
            }
        }
        self.manifest = manifest;
    }

    /// Applies a committed record.
    ///
    /// Rows for collections the schema does not define yet are kept and
    /// become visible once the schema creates the collection.
    pub(crate) fn apply(&mut self, record: &JournalRecord) {
        for op in &record.ops {
            let collection = self
                .collections
                .entry(op.collection().to_string())
                .or_insert_with(|| {
                    debug!(collection = op.collection(), "holding rows for undefined collection");
                    CollectionState::new(CollectionSpec::new(op.collection(), "id"))
                });
            match op {
                JournalOp::Put { key, value, .. } => collection.put(key, value.clone()),
                JournalOp::Delete { key, .. } => {
                    collection.delete(key);
                }
            }
        }
        self.next_txid = self.next_txid.max(record.txid.as_u64() + 1);
        self.next_seq = self.next_seq.max(record.sequence.as_u64() + 1);
        self.committed_seq = self.committed_seq.max(record.sequence.as_u64());
    }
}
