//! Error types for chat operations.

use chatdb_core::StoreError;
use std::fmt;
use thiserror::Error;

/// Result type for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;

/// The write of a friend acceptance that was left applied when a later one failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    /// The recipient's friend list could not be updated and the sender's
    /// update could not be undone: the friendship is one-sided.
    ToUser,
    /// Both friend lists were updated but the request row could not be
    /// removed: the request dangles until accept is retried.
    RequestDelete,
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToUser => f.write_str("recipient update"),
            Self::RequestDelete => f.write_str("request delete"),
        }
    }
}

/// Errors that can occur in chat operations.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Store error, passed through unchanged.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The request makes no sense, e.g. befriending yourself.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// What is wrong.
        message: String,
    },

    /// A user referenced by the operation does not exist.
    #[error("user not found: {user_id}")]
    UserNotFound {
        /// The missing user.
        user_id: String,
    },

    /// A multi-step update stopped halfway and could not be rolled back.
    #[error("friend request {request_id} partially applied, failed at {stage}")]
    PartialUpdateFailure {
        /// Request being accepted.
        request_id: String,
        /// Where it stopped.
        stage: UpdateStage,
        /// The failure that stopped it.
        #[source]
        source: Box<ChatError>,
    },
}

impl ChatError {
    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a user not found error.
    pub fn user_not_found(user_id: impl Into<String>) -> Self {
        Self::UserNotFound {
            user_id: user_id.into(),
        }
    }

    /// Returns true if the store could not be opened at all.
    #[must_use]
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_storage_unavailable())
    }

    /// Returns the partial-failure stage, if this is a partial update.
    #[must_use]
    pub fn partial_stage(&self) -> Option<UpdateStage> {
        match self {
            Self::PartialUpdateFailure { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
