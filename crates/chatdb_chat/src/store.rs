//! The chat store handle.

use crate::error::{ChatError, ChatResult};
use crate::friendship::FriendshipCoordinator;
use crate::model::{FriendRequest, Message, User};
use crate::repository::{FriendRequestRepository, MessageRepository, UserRepository};
use crate::schema::{chat_schema, SCHEMA_VERSION};
use chatdb_core::{SchemaManager, Store, StoreConfig, StoreResult, StoreStats};
use chatdb_storage::StorageBackend;
use tracing::{debug, info, warn};

/// An open chat store.
///
/// Open once, share by reference, close when done. Every operation runs in
/// one or more transaction scopes of the underlying [`Store`].
#[derive(Debug)]
pub struct ChatStore {
    store: Store,
}

impl ChatStore {
    /// Opens the store described by `config` and brings its schema up to
    /// date.
    ///
    /// # Errors
    ///
    /// `StorageUnavailable` if the location cannot be used, and any schema
    /// upgrade failure.
    pub async fn open(config: StoreConfig) -> ChatResult<Self> {
        let store = Store::open(config)?;
        Self::from_store(store).await
    }

    /// Like [`open`](Self::open), but falls back to an in-memory store when
    /// the configured location is unavailable. Nothing written then survives
    /// the process.
    pub async fn open_with_fallback(config: StoreConfig) -> ChatResult<Self> {
        match Store::open(config) {
            Ok(store) => Self::from_store(store).await,
            Err(err) if err.is_storage_unavailable() => {
                warn!(error = %err, "storage unavailable, running in memory");
                Self::open_in_memory().await
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Opens an empty in-memory store.
    pub async fn open_in_memory() -> ChatResult<Self> {
        Self::from_store(Store::open_in_memory()?).await
    }

    /// Opens a store journaling to `backend`, replaying what it holds.
    pub async fn open_with_backend(backend: Box<dyn StorageBackend>) -> ChatResult<Self> {
        let store = Store::open_with_backend(StoreConfig::new(), backend)?;
        Self::from_store(store).await
    }

    /// Wraps an already open store, upgrading it to the chat schema.
    ///
    /// # Errors
    ///
    /// `VersionDowngrade` if the store was written by a newer schema.
    pub async fn from_store(store: Store) -> ChatResult<Self> {
        let upgrade = SchemaManager::new(chat_schema())
            .ensure_schema(&store, SCHEMA_VERSION)
            .await?;
        debug!(from = upgrade.from, to = upgrade.to, "chat schema ready");
        Ok(Self { store })
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Message repository.
    #[must_use]
    pub fn messages(&self) -> MessageRepository<'_> {
        MessageRepository::new(&self.store)
    }

    /// User repository.
    #[must_use]
    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.store)
    }

    /// Friend request repository.
    #[must_use]
    pub fn friend_requests(&self) -> FriendRequestRepository<'_> {
        FriendRequestRepository::new(&self.store)
    }

    /// Friendship coordinator.
    #[must_use]
    pub fn friendships(&self) -> FriendshipCoordinator<'_> {
        FriendshipCoordinator::new(&self.store)
    }

    /// Stores a message and returns it.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` if the id is taken, `InvalidEntity` if the message is
    /// malformed (e.g. an image without a file URL).
    pub async fn add_message(&self, message: Message) -> ChatResult<Message> {
        self.messages().add(&message).await?;
        debug!(message_id = %message.id, channel = %message.channel, "message added");
        Ok(message)
    }

    /// Every message in insertion order. Sort by `timestamp` for display.
    pub async fn get_messages(&self) -> ChatResult<Vec<Message>> {
        Ok(self.messages().get_all().await?)
    }

    /// Messages of one channel, oldest first.
    pub async fn get_channel_messages(&self, channel: &str) -> ChatResult<Vec<Message>> {
        Ok(self.messages().in_channel(channel).await?)
    }

    /// Creates a user with a fresh id and passcode.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if the username is blank.
    pub async fn create_user(&self, username: &str) -> ChatResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ChatError::invalid_request("username must not be blank"));
        }
        let user = self
            .users()
            .add_with_fresh_passcode(User::new(username)?)
            .await?;
        info!(user_id = %user.id, username = %user.username, "user created");
        Ok(user)
    }

    /// The user with this username and passcode, if any.
    pub async fn verify_user(&self, username: &str, passcode: &str) -> ChatResult<Option<User>> {
        Ok(self
            .users()
            .find_by_username_and_passcode(username.trim(), passcode)
            .await?)
    }

    /// The user with this id, if any.
    pub async fn get_user_by_id(&self, id: &str) -> ChatResult<Option<User>> {
        Ok(self.users().get(id).await?)
    }

    /// First user whose username or passcode equals `query`, trimmed.
    pub async fn find_user_by_username_or_passcode(
        &self,
        query: &str,
    ) -> ChatResult<Option<User>> {
        Ok(self.users().find_by_username_or_passcode(query.trim()).await?)
    }

    /// Sends a friend request; a no-op if the pair is already connected.
    pub async fn send_friend_request(
        &self,
        from: &str,
        to: &str,
    ) -> ChatResult<Option<FriendRequest>> {
        self.friendships().send_request(from, to).await
    }

    /// Pending requests addressed to `user_id`.
    pub async fn get_pending_requests(&self, user_id: &str) -> ChatResult<Vec<FriendRequest>> {
        self.friendships().pending_for_user(user_id).await
    }

    /// Pending requests sent by `user_id`.
    pub async fn get_outgoing_requests(&self, user_id: &str) -> ChatResult<Vec<FriendRequest>> {
        self.friendships().outgoing_for_user(user_id).await
    }

    /// Accepts a request. See [`FriendshipCoordinator::accept_request`].
    pub async fn accept_friend_request(
        &self,
        request_id: &str,
    ) -> ChatResult<Option<FriendRequest>> {
        self.friendships().accept_request(request_id).await
    }

    /// The friends of `user_id`.
    pub async fn get_friends(&self, user_id: &str) -> ChatResult<Vec<User>> {
        self.friendships().friends_of(user_id).await
    }

    /// Row, index and journal statistics.
    pub fn stats(&self) -> StoreResult<StoreStats> {
        self.store.stats()
    }

    /// Returns true if the data lives on disk.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.store.is_persistent()
    }

    /// Flushes and closes the store. Later operations fail with
    /// `StoreClosed`.
    pub fn close(&self) -> ChatResult<()> {
        Ok(self.store.close()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MessageKind;
    use chatdb_core::StoreError;
    use tempfile::tempdir;

    #[tokio::test]
    async fn fresh_store_is_at_latest_schema() {
        let chat = ChatStore::open_in_memory().await.unwrap();
        assert_eq!(chat.store().schema_version(), SCHEMA_VERSION);
        assert!(!chat.is_persistent());
        assert_eq!(chat.stats().unwrap().collections.len(), 3);
    }

    #[tokio::test]
    async fn blank_username_is_rejected() {
        let chat = ChatStore::open_in_memory().await.unwrap();
        assert!(matches!(
            chat.create_user("   ").await,
            Err(ChatError::InvalidRequest { .. })
        ));
    }

    #[tokio::test]
    async fn verify_trims_username() {
        let chat = ChatStore::open_in_memory().await.unwrap();
        let alice = chat.create_user("  alice ").await.unwrap();
        assert_eq!(alice.username, "alice");

        let verified = chat.verify_user(" alice", &alice.passcode).await.unwrap();
        assert_eq!(verified, Some(alice.clone()));
        assert_eq!(chat.verify_user("alice", "000000").await.unwrap(), None);
    }

    #[tokio::test]
    async fn lookup_trims_query_like_verify() {
        let chat = ChatStore::open_in_memory().await.unwrap();
        let alice = chat.create_user("alice").await.unwrap();

        let by_name = chat.find_user_by_username_or_passcode(" alice\n").await.unwrap();
        assert_eq!(by_name, Some(alice.clone()));
        let padded = format!("  {} ", alice.passcode);
        let by_passcode = chat.find_user_by_username_or_passcode(&padded).await.unwrap();
        assert_eq!(by_passcode, Some(alice));
    }

    #[tokio::test]
    async fn invalid_message_is_not_stored() {
        let chat = ChatStore::open_in_memory().await.unwrap();
        let mut broken = Message::attachment("u1", MessageKind::Image, "blob:1");
        broken.file_url = None;

        let err = chat.add_message(broken).await.unwrap_err();
        assert!(matches!(err, ChatError::Store(StoreError::InvalidEntity { .. })));
        assert!(chat.get_messages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_message_id_is_rejected() {
        let chat = ChatStore::open_in_memory().await.unwrap();
        let message = chat.add_message(Message::text("u1", "hi")).await.unwrap();
        let err = chat.add_message(message).await.unwrap_err();
        assert!(matches!(err, ChatError::Store(StoreError::DuplicateKey { .. })));
    }

    #[tokio::test]
    async fn closed_store_refuses_work() {
        let chat = ChatStore::open_in_memory().await.unwrap();
        chat.close().unwrap();
        assert!(matches!(
            chat.get_messages().await,
            Err(ChatError::Store(StoreError::StoreClosed))
        ));
    }

    #[tokio::test]
    async fn fallback_opens_in_memory_when_persistence_is_off() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::at(dir.path()).persistence_enabled(false);

        assert!(ChatStore::open(config.clone()).await.unwrap_err().is_storage_unavailable());

        let chat = ChatStore::open_with_fallback(config).await.unwrap();
        assert!(!chat.is_persistent());
        chat.create_user("alice").await.unwrap();
    }
}
