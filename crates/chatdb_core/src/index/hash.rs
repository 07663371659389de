//! Hash index implementation.

use super::key::IndexKey;
use crate::schema::IndexSpec;
use std::collections::{BTreeSet, HashMap};

/// Equality index from a field value to the primary keys holding it.
///
/// Non-unique: any number of rows may share a key.
#[derive(Debug, Clone)]
pub struct HashIndex {
    spec: IndexSpec,
    entries: HashMap<IndexKey, BTreeSet<String>>,
    count: usize,
}

impl HashIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new(spec: IndexSpec) -> Self {
        Self {
            spec,
            entries: HashMap::new(),
            count: 0,
        }
    }

    /// Returns the index definition.
    #[must_use]
    pub fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    /// Adds `primary_key` under `key`.
    pub fn insert(&mut self, key: IndexKey, primary_key: &str) {
        if self
            .entries
            .entry(key)
            .or_default()
            .insert(primary_key.to_string())
        {
            self.count += 1;
        }
    }

    /// Removes `primary_key` from under `key`; returns whether it was there.
    pub fn remove(&mut self, key: &IndexKey, primary_key: &str) -> bool {
        let Some(set) = self.entries.get_mut(key) else {
            return false;
        };
        if !set.remove(primary_key) {
            return false;
        }
        self.count -= 1;
        if set.is_empty() {
            self.entries.remove(key);
        }
        true
    }

    /// Returns the primary keys stored under `key`.
    pub fn lookup(&self, key: &IndexKey) -> impl Iterator<Item = &str> + '_ {
        self.entries
            .get(key)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Returns true if any row has `key`.
    #[must_use]
    pub fn contains(&self, key: &IndexKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of (key, row) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the index holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.count = 0;
    }

    /// Replaces the contents with `entries`.
    pub fn rebuild<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (IndexKey, &'a str)>,
    {
        self.clear();
        for (key, primary_key) in entries {
            self.insert(key, primary_key);
        }
    }
}
