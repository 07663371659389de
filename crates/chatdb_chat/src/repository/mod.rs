//! Typed repositories over the transaction runner.
//!
//! Each call runs in its own transaction scope. Store failures are returned
//! as they are; nothing here retries.

mod friend_request;
mod message;
mod user;

pub use friend_request::FriendRequestRepository;
pub use message::MessageRepository;
pub use user::UserRepository;

use chatdb_core::{Entity, IndexKey, Store, StoreResult, TransactionMode, TransactionRunner};
use std::marker::PhantomData;

/// CRUD and indexed queries for one entity type.
#[derive(Debug)]
pub struct Repository<'s, E> {
    runner: TransactionRunner<'s>,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Repository<'_, E> {}

impl<'s, E: Entity> Repository<'s, E> {
    /// Creates a repository on `store`.
    #[must_use]
    pub fn new(store: &'s Store) -> Self {
        Self {
            runner: store.runner(),
            _marker: PhantomData,
        }
    }

    /// Returns the runner the repository uses.
    #[must_use]
    pub fn runner(&self) -> TransactionRunner<'s> {
        self.runner
    }

    /// Validates and inserts an entity; `DuplicateKey` if the id is taken.
    pub async fn add(&self, entity: &E) -> StoreResult<()> {
        self.runner
            .run(&[E::COLLECTION], TransactionMode::ReadWrite, |txn| {
                txn.collection::<E>().add(entity)
            })
            .await
    }

    /// Gets an entity by id.
    pub async fn get(&self, id: &str) -> StoreResult<Option<E>> {
        self.runner
            .run(&[E::COLLECTION], TransactionMode::ReadOnly, |txn| {
                txn.collection::<E>().get(id)
            })
            .await
    }

    /// Gets every entity in insertion order.
    pub async fn get_all(&self) -> StoreResult<Vec<E>> {
        self.runner
            .run(&[E::COLLECTION], TransactionMode::ReadOnly, |txn| {
                txn.collection::<E>().get_all()
            })
            .await
    }

    /// Gets every entity whose indexed field equals `key`.
    pub async fn get_all_by_index(
        &self,
        index: &str,
        key: impl Into<IndexKey>,
    ) -> StoreResult<Vec<E>> {
        let key = key.into();
        self.runner
            .run(&[E::COLLECTION], TransactionMode::ReadOnly, |txn| {
                txn.collection::<E>().get_all_by_index(index, key)
            })
            .await
    }

    /// Validates and inserts or replaces an entity.
    pub async fn put(&self, entity: &E) -> StoreResult<()> {
        self.runner
            .run(&[E::COLLECTION], TransactionMode::ReadWrite, |txn| {
                txn.collection::<E>().put(entity)
            })
            .await
    }

    /// Deletes by id; returns whether the entity existed.
    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.runner
            .run(&[E::COLLECTION], TransactionMode::ReadWrite, |txn| {
                txn.collection::<E>().delete(id)
            })
            .await
    }

    /// Counts the entities.
    pub async fn count(&self) -> StoreResult<usize> {
        self.runner
            .run(&[E::COLLECTION], TransactionMode::ReadOnly, |txn| {
                txn.collection::<E>().count()
            })
            .await
    }
}
