//! Core type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version number of a store schema.
pub type SchemaVersion = u32;

/// Identifier of a transaction scope.
///
/// Transaction IDs are monotonically increasing and never reused, including
/// across reopen (recovery resumes after the highest committed id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Position of a commit in the journal.
///
/// Only scopes that actually wrote something get a sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceNumber(pub u64);

impl SequenceNumber {
    /// Creates a new sequence number.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Returns the raw sequence value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next sequence number.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq:{}", self.0)
    }
}

/// Access mode of a transaction scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionMode {
    /// Reads only; any write fails with `ReadOnlyTransaction`.
    ReadOnly,
    /// Reads and staged writes, committed together.
    ReadWrite,
}

impl TransactionMode {
    /// Returns true for [`TransactionMode::ReadOnly`].
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::ReadOnly)
    }
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => f.write_str("readonly"),
            Self::ReadWrite => f.write_str("readwrite"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_id_ordering() {
        assert!(TransactionId::new(1) < TransactionId::new(2));
        assert_eq!(TransactionId::new(7).to_string(), "txn:7");
    }

    #[test]
    fn sequence_number_next() {
        assert_eq!(SequenceNumber::new(5).next().as_u64(), 6);
    }

    #[test]
    fn mode_display() {
        assert_eq!(TransactionMode::ReadOnly.to_string(), "readonly");
        assert!(!TransactionMode::ReadWrite.is_read_only());
    }
}
