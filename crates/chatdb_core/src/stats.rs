//! Store statistics.

use crate::types::SchemaVersion;
use serde::Serialize;

/// Snapshot of a store's contents.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    /// Journal location (`memory` or a file path).
    pub location: String,
    /// Whether the store lives in a directory.
    pub persistent: bool,
    /// Current schema version.
    pub schema_version: SchemaVersion,
    /// Sequence of the last committed record.
    pub committed_seq: u64,
    /// Journal size in bytes.
    pub journal_bytes: u64,
    /// Per-collection figures, by name.
    pub collections: Vec<CollectionStats>,
}

/// Figures for one collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    /// Collection name.
    pub name: String,
    /// Primary key field.
    pub key_path: String,
    /// Number of rows.
    pub rows: usize,
    /// Secondary indexes.
    pub indexes: Vec<IndexStats>,
}

/// Figures for one index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    /// Index name.
    pub name: String,
    /// Indexed field.
    pub key_path: String,
    /// Number of indexed rows.
    pub entries: usize,
}

impl StoreStats {
    /// Total rows across collections.
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.collections.iter().map(|c| c.rows).sum()
    }

    /// Looks up one collection's figures.
    #[must_use]
    pub fn collection(&self, name: &str) -> Option<&CollectionStats> {
        self.collections.iter().find(|c| c.name == name)
    }
}
