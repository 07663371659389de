//! Error types for the chatdb store.

use crate::types::SchemaVersion;
use chatdb_storage::StorageError;
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
///
/// A missing entity is never an error: lookups return `None`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The host persistence facility could not be opened.
    ///
    /// Callers may recover by opening an in-memory store instead.
    #[error("storage unavailable at {location}: {reason}")]
    StorageUnavailable {
        /// Where the store was expected to live.
        location: String,
        /// Why it could not be opened.
        reason: String,
    },

    /// An `add` collided with an existing primary key.
    #[error("duplicate key {key:?} in collection {collection}")]
    DuplicateKey {
        /// Collection written to.
        collection: String,
        /// The colliding key.
        key: String,
    },

    /// The collection is not defined by the current schema.
    #[error("collection not found: {name}")]
    CollectionNotFound {
        /// Name of the collection.
        name: String,
    },

    /// The index is not defined on the collection.
    #[error("index {index} not found on collection {collection}")]
    IndexNotFound {
        /// Collection searched.
        collection: String,
        /// Missing index name.
        index: String,
    },

    /// The collection was not named when the scope was opened.
    #[error("collection {collection} is outside the transaction scope")]
    OutOfScope {
        /// Collection that was touched.
        collection: String,
    },

    /// A write was attempted in a read-only scope.
    #[error("cannot write to {collection} in a read-only transaction")]
    ReadOnlyTransaction {
        /// Collection that was written.
        collection: String,
    },

    /// The entity failed validation or has no usable key.
    #[error("invalid entity for {collection}: {message}")]
    InvalidEntity {
        /// Target collection.
        collection: String,
        /// What is wrong with it.
        message: String,
    },

    /// The stored schema is newer than the one requested.
    #[error("schema version {stored} is newer than requested version {target}")]
    VersionDowngrade {
        /// Version found in the store.
        stored: SchemaVersion,
        /// Version the caller asked for.
        target: SchemaVersion,
    },

    /// Persisted data is malformed.
    #[error("corruption: {message}")]
    Corruption {
        /// Description of the corruption.
        message: String,
    },

    /// Checksum mismatch detected.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Stored checksum.
        expected: u32,
        /// Computed checksum.
        actual: u32,
    },

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[source] StorageError),

    /// CBOR encoding or decoding failed.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store has been closed.
    #[error("store is closed")]
    StoreClosed,
}

impl StoreError {
    /// Creates a storage unavailable error.
    pub fn storage_unavailable(location: impl Into<String>, reason: impl ToString) -> Self {
        Self::StorageUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a collection not found error.
    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::CollectionNotFound { name: name.into() }
    }

    /// Creates an invalid entity error.
    pub fn invalid_entity(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEntity {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }

    /// Creates a codec error from any displayable failure.
    pub fn codec(err: impl std::fmt::Display) -> Self {
        Self::Codec {
            message: err.to_string(),
        }
    }

    /// Returns true if the host persistence facility could not be opened.
    #[must_use]
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }
}

impl From<StorageError> for StoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable { path, source } => {
                Self::storage_unavailable(path.display().to_string(), source)
            }
            other => Self::Storage(other),
        }
    }
}

impl From<ciborium::ser::Error<io::Error>> for StoreError {
    fn from(err: ciborium::ser::Error<io::Error>) -> Self {
        Self::codec(err)
    }
}

impl From<ciborium::de::Error<io::Error>> for StoreError {
    fn from(err: ciborium::de::Error<io::Error>) -> Self {
        Self::codec(err)
    }
}

impl From<ciborium::value::Error> for StoreError {
    fn from(err: ciborium::value::Error) -> Self {
        Self::codec(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn unavailable_backend_maps_to_storage_unavailable() {
        let err: StoreError = StorageError::Unavailable {
            path: PathBuf::from("/nowhere/journal.log"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        }
        .into();
        assert!(err.is_storage_unavailable());
        assert!(err.to_string().contains("/nowhere/journal.log"));
    }

    #[test]
    fn other_backend_errors_stay_storage() {
        let err: StoreError = StorageError::TruncateBeyondEnd {
            requested: 4,
            size: 2,
        }
        .into();
        assert!(matches!(err, StoreError::Storage(_)));
    }

    #[test]
    fn downgrade_message() {
        let err = StoreError::VersionDowngrade {
            stored: 3,
            target: 2,
        };
        assert_eq!(
            err.to_string(),
            "schema version 3 is newer than requested version 2"
        );
    }
}
