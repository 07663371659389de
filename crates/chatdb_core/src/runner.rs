//! Transaction runner.

use crate::error::StoreResult;
use crate::store::Store;
use crate::transaction::Transaction;
use crate::types::TransactionMode;

/// Runs operations inside transaction scopes.
///
/// `run` suspends the caller when the scope opens and again after it
/// completes; the operation itself runs to completion without yielding.
/// Nothing is atomic across two `run` calls.
#[derive(Debug, Clone, Copy)]
pub struct TransactionRunner<'s> {
    store: &'s Store,
}

impl<'s> TransactionRunner<'s> {
    /// Creates a runner for `store`.
    #[must_use]
    pub fn new(store: &'s Store) -> Self {
        Self { store }
    }

    /// Opens a scope on `collections`, runs `op`, and commits on `Ok`.
    ///
    /// On `Err` the staged writes are discarded and the error is returned
    /// unchanged.
    ///
    /// ```rust,ignore
    /// let count = store
    ///     .runner()
    ///     .run(&["users"], TransactionMode::ReadOnly, |txn| txn.count("users"))
    ///     .await?;
    /// ```
    pub async fn run<R, F>(
        &self,
        collections: &[&str],
        mode: TransactionMode,
        op: F,
    ) -> StoreResult<R>
    where
        F: FnOnce(&mut Transaction<'s>) -> StoreResult<R>,
    {
        tokio::task::yield_now().await;
        let mut txn = self.store.begin(collections, mode)?;

        match op(&mut txn) {
            Ok(value) => {
                self.store.commit(txn)?;
                tokio::task::yield_now().await;
                Ok(value)
            }
            Err(err) => {
                self.store.abort(txn);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::error::StoreError;
    use crate::schema::{Schema, SchemaManager, SchemaStep};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Task {
        id: String,
        owner_id: String,
        title: String,
    }

    impl Entity for Task {
        const COLLECTION: &'static str = "tasks";

        fn key(&self) -> &str {
            &self.id
        }

        fn validate(&self) -> StoreResult<()> {
            if self.title.is_empty() {
                return Err(StoreError::invalid_entity(Self::COLLECTION, "empty title"));
            }
            Ok(())
        }
    }

    fn task(id: &str, owner: &str) -> Task {
        Task {
            id: id.into(),
            owner_id: owner.into(),
            title: format!("task {id}"),
        }
    }

    async fn store() -> Store {
        let store = Store::open_in_memory().unwrap();
        let schema = Schema::new().step(
            SchemaStep::new(1)
                .create_collection("tasks", "id")
                .create_index("tasks", "ownerId", "ownerId"),
        );
        SchemaManager::new(schema)
            .ensure_schema(&store, 1)
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn ok_commits_and_err_discards() {
        let store = store().await;
        let runner = store.runner();

        runner
            .run(&["tasks"], TransactionMode::ReadWrite, |txn| {
                txn.collection::<Task>().add(&task("t1", "u1"))
            })
            .await
            .unwrap();

        let err = runner
            .run(&["tasks"], TransactionMode::ReadWrite, |txn| {
                txn.collection::<Task>().add(&task("t2", "u1"))?;
                txn.collection::<Task>().add(&task("t1", "u2"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));

        let all = runner
            .run(&["tasks"], TransactionMode::ReadOnly, |txn| {
                txn.collection::<Task>().get_all()
            })
            .await
            .unwrap();
        assert_eq!(all, vec![task("t1", "u1")]);
    }

    #[tokio::test]
    async fn typed_collection_round_trip() {
        let store = store().await;
        let runner = store.runner();

        runner
            .run(&["tasks"], TransactionMode::ReadWrite, |txn| {
                let mut tasks = txn.collection::<Task>();
                tasks.add(&task("t1", "u1"))?;
                tasks.add(&task("t2", "u2"))?;
                tasks.add(&task("t3", "u1"))?;
                let mut renamed = task("t2", "u1");
                renamed.title = "moved".into();
                tasks.put(&renamed)?;
                tasks.delete("t3")?;
                Ok(())
            })
            .await
            .unwrap();

        let (owned, count, missing) = runner
            .run(&["tasks"], TransactionMode::ReadOnly, |txn| {
                let tasks = txn.collection::<Task>();
                Ok((
                    tasks.get_all_by_index("ownerId", "u1")?,
                    tasks.count()?,
                    tasks.get("t3")?,
                ))
            })
            .await
            .unwrap();

        assert_eq!(owned.len(), 2);
        assert_eq!(owned[1].title, "moved");
        assert_eq!(count, 2);
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn validation_runs_before_staging() {
        let store = store().await;
        let mut bad = task("t1", "u1");
        bad.title.clear();

        let err = store
            .runner()
            .run(&["tasks"], TransactionMode::ReadWrite, |txn| {
                txn.collection::<Task>().add(&bad)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidEntity { .. }));
    }

    #[tokio::test]
    async fn unknown_collection_fails_before_op_runs() {
        let store = store().await;
        let mut ran = false;
        let err = store
            .runner()
            .run(&["nope"], TransactionMode::ReadOnly, |_| {
                ran = true;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CollectionNotFound { .. }));
        assert!(!ran);
    }
}
