//! Friend request queries.

use super::Repository;
use crate::model::FriendRequest;
use crate::schema::{FRIEND_REQUESTS, FROM_USER_INDEX, TO_USER_INDEX};
use chatdb_core::{StoreResult, TransactionMode};

/// Repository of [`FriendRequest`]s.
pub type FriendRequestRepository<'s> = Repository<'s, FriendRequest>;

impl Repository<'_, FriendRequest> {
    /// Pending requests addressed to `user_id`.
    pub async fn pending_for_recipient(&self, user_id: &str) -> StoreResult<Vec<FriendRequest>> {
        Ok(self
            .get_all_by_index(TO_USER_INDEX, user_id)
            .await?
            .into_iter()
            .filter(FriendRequest::is_pending)
            .collect())
    }

    /// Pending requests sent by `user_id`.
    pub async fn outgoing_for_sender(&self, user_id: &str) -> StoreResult<Vec<FriendRequest>> {
        Ok(self
            .get_all_by_index(FROM_USER_INDEX, user_id)
            .await?
            .into_iter()
            .filter(FriendRequest::is_pending)
            .collect())
    }

    /// Any request between `a` and `b`, in either direction.
    pub async fn find_between(&self, a: &str, b: &str) -> StoreResult<Option<FriendRequest>> {
        self.runner
            .run(&[FRIEND_REQUESTS], TransactionMode::ReadOnly, |txn| {
                let requests = txn.collection::<FriendRequest>();
                for sender in [a, b] {
                    let found = requests
                        .get_all_by_index(FROM_USER_INDEX, sender)?
                        .into_iter()
                        .find(|r| r.connects(a, b));
                    if found.is_some() {
                        return Ok(found);
                    }
                }
                Ok(None)
            })
            .await
    }

    /// Inserts a pending request from `from` to `to` unless the pair already
    /// has one. Check and insert share one scope.
    ///
    /// Returns the new request, or `None` when one already existed.
    pub async fn add_unless_connected(
        &self,
        from: &str,
        to: &str,
    ) -> StoreResult<Option<FriendRequest>> {
        self.runner
            .run(&[FRIEND_REQUESTS], TransactionMode::ReadWrite, |txn| {
                let mut requests = txn.collection::<FriendRequest>();
                let existing = requests
                    .get_all()?
                    .into_iter()
                    .any(|r| r.connects(from, to));
                if existing {
                    return Ok(None);
                }
                let request = FriendRequest::pending(from, to);
                requests.add(&request)?;
                Ok(Some(request))
            })
            .await
    }
}
