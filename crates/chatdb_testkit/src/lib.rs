//! # chatdb Testkit
//!
//! Test utilities for chatdb.
//!
//! This crate provides:
//! - Store fixtures (in-memory, on-disk, fault-injecting)
//! - A storage backend that fails chosen journal appends
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chatdb_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn accepts_survive_reopen() {
//!     let store = TestStore::file().await;
//!     let alice = store.create_user("alice").await.unwrap();
//!     let store = store.reopen().await;
//!     assert!(store.get_user_by_id(&alice.id).await.unwrap().is_some());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
