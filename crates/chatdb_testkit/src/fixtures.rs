//! Test fixtures and store helpers.
//!
//! Provides convenience constructors for chat stores in the configurations
//! tests need: in memory, in a temporary directory, and over a
//! fault-injecting journal.

use crate::faults::{FaultPlan, FlakyBackend};
use chatdb_chat::{ChatStore, User};
use chatdb_core::StoreConfig;
use chatdb_storage::InMemoryBackend;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// A test chat store with automatic cleanup.
pub struct TestStore {
    /// The store.
    pub chat: ChatStore,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory store.
    pub async fn memory() -> Self {
        Self {
            chat: ChatStore::open_in_memory()
                .await
                .expect("Failed to open in-memory store"),
            temp_dir: None,
        }
    }

    /// Creates a new store in a temporary directory.
    pub async fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let chat = ChatStore::open(StoreConfig::at(temp_dir.path()))
            .await
            .expect("Failed to open file store");
        Self {
            chat,
            temp_dir: Some(temp_dir),
        }
    }

    /// Creates an in-memory store whose journal fails as `plan` says.
    pub async fn flaky() -> (Self, Arc<FaultPlan>) {
        let plan = FaultPlan::new();
        let backend = FlakyBackend::new(Box::new(InMemoryBackend::new()), Arc::clone(&plan));
        let chat = ChatStore::open_with_backend(Box::new(backend))
            .await
            .expect("Failed to open flaky store");
        (
            Self {
                chat,
                temp_dir: None,
            },
            plan,
        )
    }

    /// Returns the store directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Closes the store and opens the same directory again.
    ///
    /// # Panics
    ///
    /// Panics on in-memory stores, which cannot be reopened.
    pub async fn reopen(self) -> Self {
        let Self { chat, temp_dir } = self;
        let temp_dir = temp_dir.expect("Only file stores can be reopened");
        chat.close().expect("Failed to close store");
        drop(chat);

        let chat = ChatStore::open(StoreConfig::at(temp_dir.path()))
            .await
            .expect("Failed to reopen store");
        Self {
            chat,
            temp_dir: Some(temp_dir),
        }
    }
}

impl std::ops::Deref for TestStore {
    type Target = ChatStore;

    fn deref(&self) -> &Self::Target {
        &self.chat
    }
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates `names.len()` users, in order.
    pub async fn users(chat: &ChatStore, names: &[&str]) -> Vec<User> {
        let mut users = Vec::with_capacity(names.len());
        for name in names {
            users.push(chat.create_user(name).await.expect("Failed to create user"));
        }
        users
    }

    /// Makes `a` and `b` friends through a request and its acceptance.
    pub async fn befriend(chat: &ChatStore, a: &User, b: &User) {
        let request = chat
            .send_friend_request(&a.id, &b.id)
            .await
            .expect("Failed to send request")
            .expect("Users were already connected");
        chat.accept_friend_request(&request.id)
            .await
            .expect("Failed to accept request");
    }
}
