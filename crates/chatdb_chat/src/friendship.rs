//! Friend requests and accepted friendships.
//!
//! Accepting a request touches two user records and the request row. The
//! store has no scope spanning all three, so accept runs as a saga of three
//! independent scopes:
//!
//! 1. add the recipient to the sender's friends
//! 2. add the sender to the recipient's friends
//! 3. delete the request
//!
//! If step 2 fails after step 1 changed the sender, a compensating scope
//! removes what step 1 added. Only when that also fails, or when step 3
//! fails, does the caller see [`ChatError::PartialUpdateFailure`]. Steps are
//! idempotent, so retrying accept after any failure converges.

use crate::error::{ChatError, ChatResult, UpdateStage};
use crate::model::{FriendRequest, User};
use crate::repository::{FriendRequestRepository, UserRepository};
use crate::schema::USERS;
use chatdb_core::{Store, TransactionMode};
use tracing::{debug, error, info, warn};

/// Sequences the multi-record friendship updates.
#[derive(Debug, Clone, Copy)]
pub struct FriendshipCoordinator<'s> {
    users: UserRepository<'s>,
    requests: FriendRequestRepository<'s>,
}

impl<'s> FriendshipCoordinator<'s> {
    /// Creates a coordinator on `store`.
    #[must_use]
    pub fn new(store: &'s Store) -> Self {
        Self {
            users: UserRepository::new(store),
            requests: FriendRequestRepository::new(store),
        }
    }

    /// Sends a friend request from `from` to `to`.
    ///
    /// Does nothing if a request already exists between the two in either
    /// direction. Returns the created request, if any.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if `from == to`.
    pub async fn send_request(&self, from: &str, to: &str) -> ChatResult<Option<FriendRequest>> {
        if from == to {
            return Err(ChatError::invalid_request("cannot send a friend request to yourself"));
        }

        let created = self.requests.add_unless_connected(from, to).await?;
        match &created {
            Some(request) => debug!(request_id = %request.id, from, to, "friend request sent"),
            None => debug!(from, to, "friend request already exists"),
        }
        Ok(created)
    }

    /// Pending requests addressed to `user_id`.
    pub async fn pending_for_user(&self, user_id: &str) -> ChatResult<Vec<FriendRequest>> {
        Ok(self.requests.pending_for_recipient(user_id).await?)
    }

    /// Pending requests sent by `user_id`.
    pub async fn outgoing_for_user(&self, user_id: &str) -> ChatResult<Vec<FriendRequest>> {
        Ok(self.requests.outgoing_for_sender(user_id).await?)
    }

    /// Accepts a request, making both users friends and removing the request.
    ///
    /// Returns the accepted request, or `None` if no such request exists.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if either user is gone (after undoing step 1)
    /// - the step-2 failure itself, when step 1 was undone
    /// - `PartialUpdateFailure { stage: ToUser }` when step 1 could not be undone
    /// - `PartialUpdateFailure { stage: RequestDelete }` when the request
    ///   could not be removed; both friend lists are already updated
    pub async fn accept_request(&self, request_id: &str) -> ChatResult<Option<FriendRequest>> {
        let Some(request) = self.requests.get(request_id).await? else {
            debug!(request_id, "accept of unknown friend request ignored");
            return Ok(None);
        };
        let (from, to) = (request.from_user_id.as_str(), request.to_user_id.as_str());

        let from_changed = self.befriend(from, to).await?;

        if let Err(step_two) = self.befriend(to, from).await {
            if from_changed {
                warn!(
                    request_id,
                    error = %step_two,
                    "recipient update failed, undoing sender update"
                );
                if let Err(undo) = self.unfriend(from, to).await {
                    error!(request_id, error = %undo, "could not undo sender update");
                    return Err(ChatError::PartialUpdateFailure {
                        request_id: request.id.clone(),
                        stage: UpdateStage::ToUser,
                        source: Box::new(step_two),
                    });
                }
            }
            return Err(step_two);
        }

        if let Err(err) = self.requests.delete(&request.id).await {
            error!(request_id, error = %err, "friendship stored but request not removed");
            return Err(ChatError::PartialUpdateFailure {
                request_id: request.id.clone(),
                stage: UpdateStage::RequestDelete,
                source: Box::new(err.into()),
            });
        }

        info!(request_id, from, to, "friend request accepted");
        Ok(Some(request))
    }

    /// Resolves the friends of `user_id`, skipping ids that no longer exist.
    ///
    /// # Errors
    ///
    /// `UserNotFound` if `user_id` itself does not exist.
    pub async fn friends_of(&self, user_id: &str) -> ChatResult<Vec<User>> {
        let found = self
            .users
            .runner()
            .run(&[USERS], TransactionMode::ReadOnly, |txn| {
                let users = txn.collection::<User>();
                let Some(user) = users.get(user_id)? else {
                    return Ok(None);
                };
                let mut friends = Vec::with_capacity(user.friends.len());
                for id in &user.friends {
                    if let Some(friend) = users.get(id)? {
                        friends.push(friend);
                    }
                }
                Ok(Some(friends))
            })
            .await?;
        found.ok_or_else(|| ChatError::user_not_found(user_id))
    }

    /// Adds `friend_id` to `user_id`'s friends; returns whether it changed.
    async fn befriend(&self, user_id: &str, friend_id: &str) -> ChatResult<bool> {
        self.update_user(user_id, |user| user.add_friend(friend_id))
            .await
    }

    /// Removes `friend_id` from `user_id`'s friends; returns whether it changed.
    async fn unfriend(&self, user_id: &str, friend_id: &str) -> ChatResult<bool> {
        self.update_user(user_id, |user| user.remove_friend(friend_id))
            .await
    }

    /// Loads, edits and stores one user in one scope. Nothing is written
    /// when the edit reports no change.
    async fn update_user<F>(&self, user_id: &str, edit: F) -> ChatResult<bool>
    where
        F: FnOnce(&mut User) -> bool,
    {
        let changed = self
            .users
            .runner()
            .run(&[USERS], TransactionMode::ReadWrite, |txn| {
                let mut users = txn.collection::<User>();
                let Some(mut user) = users.get(user_id)? else {
                    return Ok(None);
                };
                let changed = edit(&mut user);
                if changed {
                    users.put(&user)?;
                }
                Ok(Some(changed))
            })
            .await?;
        changed.ok_or_else(|| ChatError::user_not_found(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ChatStore;

    async fn two_users(chat: &ChatStore) -> (User, User) {
        let alice = chat.create_user("alice").await.unwrap();
        let bob = chat.create_user("bob").await.unwrap();
        (alice, bob)
    }

    #[tokio::test]
    async fn self_request_is_invalid() {
        let chat = ChatStore::open_in_memory().await.unwrap();
        let err = chat.friendships().send_request("u1", "u1").await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn accept_links_both_users_and_removes_request() {
        let chat = ChatStore::open_in_memory().await.unwrap();
        let (alice, bob) = two_users(&chat).await;
        let friendships = chat.friendships();

        let request = friendships
            .send_request(&alice.id, &bob.id)
            .await
            .unwrap()
            .unwrap();
        let accepted = friendships.accept_request(&request.id).await.unwrap();
        assert_eq!(accepted.map(|r| r.id), Some(request.id));

        let alice_friends = friendships.friends_of(&alice.id).await.unwrap();
        let bob_friends = friendships.friends_of(&bob.id).await.unwrap();
        assert_eq!(alice_friends, vec![chat.get_user_by_id(&bob.id).await.unwrap().unwrap()]);
        assert_eq!(bob_friends[0].id, alice.id);
        assert!(friendships.pending_for_user(&bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn accept_twice_is_harmless() {
        let chat = ChatStore::open_in_memory().await.unwrap();
        let (alice, bob) = two_users(&chat).await;
        let friendships = chat.friendships();

        let request = friendships
            .send_request(&alice.id, &bob.id)
            .await
            .unwrap()
            .unwrap();
        friendships.accept_request(&request.id).await.unwrap();
        assert!(friendships.accept_request(&request.id).await.unwrap().is_none());

        let alice = chat.get_user_by_id(&alice.id).await.unwrap().unwrap();
        assert_eq!(alice.friends, vec![bob.id]);
    }

    #[tokio::test]
    async fn missing_sender_fails_before_any_write() {
        let chat = ChatStore::open_in_memory().await.unwrap();
        let bob = chat.create_user("bob").await.unwrap();
        let friendships = chat.friendships();

        let request = friendships
            .send_request("ghost", &bob.id)
            .await
            .unwrap()
            .unwrap();
        let err = friendships.accept_request(&request.id).await.unwrap_err();
        assert!(matches!(err, ChatError::UserNotFound { ref user_id } if user_id == "ghost"));

        let bob = chat.get_user_by_id(&bob.id).await.unwrap().unwrap();
        assert!(bob.friends.is_empty());
        assert_eq!(friendships.pending_for_user(&bob.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_recipient_undoes_sender_update() {
        let chat = ChatStore::open_in_memory().await.unwrap();
        let alice = chat.create_user("alice").await.unwrap();
        let friendships = chat.friendships();

        let request = friendships
            .send_request(&alice.id, "ghost")
            .await
            .unwrap()
            .unwrap();
        let err = friendships.accept_request(&request.id).await.unwrap_err();
        assert!(matches!(err, ChatError::UserNotFound { .. }));

        let alice = chat.get_user_by_id(&alice.id).await.unwrap().unwrap();
        assert!(alice.friends.is_empty());
    }

    #[tokio::test]
    async fn friends_of_unknown_user_is_an_error() {
        let chat = ChatStore::open_in_memory().await.unwrap();
        assert!(matches!(
            chat.friendships().friends_of("nobody").await,
            Err(ChatError::UserNotFound { .. })
        ));
    }
}
