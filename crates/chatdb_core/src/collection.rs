//! Typed view of a collection inside a transaction.

use crate::entity::Entity;
use crate::error::{StoreError, StoreResult};
use crate::index::IndexKey;
use crate::transaction::Transaction;
use std::marker::PhantomData;

/// Typed access to the collection of `E` within one transaction scope.
///
/// Obtained with [`Transaction::collection`]. Writes validate the entity
/// and check that [`Entity::key`] names the same key the collection's key
/// path extracts, so invalid records never reach the journal.
pub struct Collection<'t, 's, E> {
    txn: &'t mut Transaction<'s>,
    _marker: PhantomData<E>,
}

impl<'t, 's, E: Entity> Collection<'t, 's, E> {
    pub(crate) fn new(txn: &'t mut Transaction<'s>) -> Self {
        Self {
            txn,
            _marker: PhantomData,
        }
    }

    /// Gets an entity by key.
    pub fn get(&self, key: &str) -> StoreResult<Option<E>> {
        self.txn
            .get(E::COLLECTION, key)?
            .map(|doc| E::from_document(&doc))
            .transpose()
    }

    /// Gets every entity in insertion order.
    pub fn get_all(&self) -> StoreResult<Vec<E>> {
        decode_all(self.txn.get_all(E::COLLECTION)?)
    }

    /// Gets every entity whose indexed field equals `key`.
    pub fn get_all_by_index(&self, index: &str, key: impl Into<IndexKey>) -> StoreResult<Vec<E>> {
        decode_all(self.txn.get_all_by_index(E::COLLECTION, index, key)?)
    }

    /// Counts the entities.
    pub fn count(&self) -> StoreResult<usize> {
        self.txn.count(E::COLLECTION)
    }

    /// Validates and inserts a new entity.
    pub fn add(&mut self, entity: &E) -> StoreResult<()> {
        let document = self.prepare(entity)?;
        self.txn.add(E::COLLECTION, document)?;
        Ok(())
    }

    /// Validates and inserts or replaces an entity.
    pub fn put(&mut self, entity: &E) -> StoreResult<()> {
        let document = self.prepare(entity)?;
        self.txn.put(E::COLLECTION, document)?;
        Ok(())
    }

    /// Deletes by key; returns whether the entity existed.
    pub fn delete(&mut self, key: &str) -> StoreResult<bool> {
        self.txn.delete(E::COLLECTION, key)
    }

    fn prepare(&self, entity: &E) -> StoreResult<ciborium::Value> {
        entity.validate()?;
        let document = entity.to_document()?;
        let stored = self.txn.key_of(E::COLLECTION, &document)?;
        if stored != entity.key() {
            return Err(StoreError::invalid_entity(
                E::COLLECTION,
                format!(
                    "key() returns {:?} but the key field holds {stored:?}",
                    entity.key()
                ),
            ));
        }
        Ok(document)
    }
}

fn decode_all<E: Entity>(documents: Vec<ciborium::Value>) -> StoreResult<Vec<E>> {
    documents.iter().map(E::from_document).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Schema, SchemaStep};
    use crate::store::Store;
    use crate::types::TransactionMode;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Label {
        id: String,
        text: String,
    }

    impl Entity for Label {
        const COLLECTION: &'static str = "labels";

        fn key(&self) -> &str {
            &self.id
        }
    }

    // Keyed by `text` although the collection's key path is `id`.
    #[derive(Debug, Serialize, Deserialize)]
    struct MiskeyedLabel {
        id: String,
        text: String,
    }

    impl Entity for MiskeyedLabel {
        const COLLECTION: &'static str = "labels";

        fn key(&self) -> &str {
            &self.text
        }
    }

    fn store() -> Store {
        let store = Store::open_in_memory().unwrap();
        let schema = Schema::new().step(SchemaStep::new(1).create_collection("labels", "id"));
        store.upgrade_schema(&schema, 1).unwrap();
        store
    }

    #[test]
    fn typed_writes_round_through_the_key_field() {
        let store = store();
        let label = Label {
            id: "l1".into(),
            text: "urgent".into(),
        };

        let mut txn = store.begin(&["labels"], TransactionMode::ReadWrite).unwrap();
        txn.collection::<Label>().add(&label).unwrap();
        assert_eq!(txn.collection::<Label>().get("l1").unwrap(), Some(label));
        store.commit(txn).unwrap();
    }

    #[test]
    fn key_disagreeing_with_key_field_is_rejected() {
        let store = store();
        let miskeyed = MiskeyedLabel {
            id: "l1".into(),
            text: "urgent".into(),
        };

        let mut txn = store.begin(&["labels"], TransactionMode::ReadWrite).unwrap();
        assert!(matches!(
            txn.collection::<MiskeyedLabel>().add(&miskeyed),
            Err(StoreError::InvalidEntity { .. })
        ));
        assert!(matches!(
            txn.collection::<MiskeyedLabel>().put(&miskeyed),
            Err(StoreError::InvalidEntity { .. })
        ));
        assert_eq!(txn.pending_writes(), 0);
        assert_eq!(store.commit(txn).unwrap(), None);
    }
}
