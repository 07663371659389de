//! # chatdb core
//!
//! Embedded transactional entity store.
//!
//! This crate provides:
//! - [`Store`]: an explicit store handle over a directory or memory
//! - a commit journal replayed on open, with torn-tail truncation
//! - named collections with non-unique secondary indexes
//! - [`SchemaManager`]: versioned, additive schema upgrades
//! - [`TransactionRunner`]: scoped read-only/read-write transactions
//! - [`Entity`] and [`Collection`]: typed access with serde records
//!
//! ```rust,ignore
//! let store = Store::open(StoreConfig::at("data"))?;
//! SchemaManager::new(schema).ensure_schema(&store, 1).await?;
//!
//! let notes = store
//!     .runner()
//!     .run(&["notes"], TransactionMode::ReadOnly, |txn| txn.collection::<Note>().get_all())
//!     .await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod config;
mod dir;
mod entity;
mod error;
mod index;
pub mod journal;
mod manifest;
mod runner;
mod schema;
mod state;
mod stats;
mod store;
mod transaction;
mod types;

pub use ciborium::Value;
pub use collection::Collection;
pub use config::{StoreConfig, StoreLocation};
pub use entity::Entity;
pub use error::{StoreError, StoreResult};
pub use index::{HashIndex, IndexKey};
pub use manifest::Manifest;
pub use runner::TransactionRunner;
pub use schema::{
    CollectionSpec, IndexSpec, Schema, SchemaChange, SchemaManager, SchemaStep, SchemaUpgrade,
};
pub use stats::{CollectionStats, IndexStats, StoreStats};
pub use store::Store;
pub use transaction::Transaction;
pub use types::{SchemaVersion, SequenceNumber, TransactionId, TransactionMode};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
