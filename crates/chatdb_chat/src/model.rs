//! Chat entity records.
//!
//! Field names are persisted in camelCase; the store's secondary indexes
//! (`username`, `passcode`, `toUserId`, `fromUserId`, `channel`) refer to
//! those names.

use crate::schema::{FRIEND_REQUESTS, MESSAGES, USERS};
use chatdb_core::{Entity, StoreError, StoreResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Channel a message lands in when none is given.
pub const DEFAULT_CHANNEL: &str = "general";

/// Number of digits in a passcode.
pub const PASSCODE_LEN: usize = 6;

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

/// Generates a fresh random id.
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a six-digit passcode in `100000..=999999`.
#[must_use]
pub fn generate_passcode() -> String {
    rand::thread_rng().gen_range(100_000..=999_999u32).to_string()
}

/// Returns true if `passcode` is exactly six ASCII digits.
#[must_use]
pub fn is_valid_passcode(passcode: &str) -> bool {
    passcode.len() == PASSCODE_LEN && passcode.bytes().all(|b| b.is_ascii_digit())
}

/// What a message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Plain text.
    Text,
    /// Image attachment.
    Image,
    /// Video attachment.
    Video,
    /// Voice note.
    Voice,
    /// Nothing in particular.
    #[default]
    None,
}

impl MessageKind {
    /// Returns true for kinds that must carry a `fileUrl`.
    #[must_use]
    pub const fn is_attachment(self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Voice)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Voice => "voice",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// A chat message. Created once, never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique id.
    pub id: String,
    /// Payload kind.
    #[serde(alias = "type")]
    pub file_type: MessageKind,
    /// Text content; may be empty for attachments.
    #[serde(default)]
    pub text: String,
    /// Attachment location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Author.
    pub sender_id: String,
    /// Direct-message recipient; `None` for channel messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    /// Channel name.
    #[serde(default = "default_channel")]
    pub channel: String,
}

fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

impl Message {
    /// A text message from `sender_id` in the default channel, stamped now.
    pub fn text(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            file_type: MessageKind::Text,
            text: text.into(),
            file_url: None,
            timestamp: now_millis(),
            sender_id: sender_id.into(),
            recipient_id: None,
            channel: default_channel(),
        }
    }

    /// An attachment message, stamped now.
    pub fn attachment(
        sender_id: impl Into<String>,
        kind: MessageKind,
        file_url: impl Into<String>,
    ) -> Self {
        Self {
            file_type: kind,
            file_url: Some(file_url.into()),
            ..Self::text(sender_id, "")
        }
    }

    /// Moves the message to `channel`.
    #[must_use]
    pub fn in_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Addresses the message to one user.
    #[must_use]
    pub fn to_recipient(mut self, recipient_id: impl Into<String>) -> Self {
        self.recipient_id = Some(recipient_id.into());
        self
    }

    /// Overrides the timestamp.
    #[must_use]
    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl Entity for Message {
    const COLLECTION: &'static str = MESSAGES;

    fn key(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> StoreResult<()> {
        let invalid = |message: &str| -> StoreResult<()> {
            Err(StoreError::invalid_entity(MESSAGES, message))
        };
        if self.id.is_empty() {
            return invalid("message id is empty");
        }
        if self.sender_id.is_empty() {
            return invalid("message has no sender");
        }
        let has_file = matches!(self.file_url.as_deref(), Some(url) if !url.is_empty());
        if self.file_type.is_attachment() && !has_file {
            return invalid("attachment message has no fileUrl");
        }
        if self.file_type == MessageKind::Text && self.text.is_empty() {
            return invalid("text message is empty");
        }
        Ok(())
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique id.
    pub id: String,
    /// Display name, trimmed. Not unique.
    pub username: String,
    /// Six-digit login passcode. Unique on a best-effort basis only.
    pub passcode: String,
    /// Ids of accepted friends, in acceptance order.
    #[serde(default)]
    pub friends: Vec<String>,
    /// Milliseconds since the Unix epoch.
    pub joined_at: i64,
}

impl User {
    /// A new user with a generated id and passcode.
    ///
    /// # Errors
    ///
    /// `InvalidEntity` if `username` is blank.
    pub fn new(username: &str) -> StoreResult<Self> {
        let user = Self {
            id: new_id(),
            username: username.trim().to_string(),
            passcode: generate_passcode(),
            friends: Vec::new(),
            joined_at: now_millis(),
        };
        user.validate()?;
        Ok(user)
    }

    /// Returns true if `user_id` is a friend.
    #[must_use]
    pub fn is_friend(&self, user_id: &str) -> bool {
        self.friends.iter().any(|f| f == user_id)
    }

    /// Adds a friend; returns false if already present.
    pub fn add_friend(&mut self, user_id: &str) -> bool {
        if self.is_friend(user_id) {
            return false;
        }
        self.friends.push(user_id.to_string());
        true
    }

    /// Removes a friend; returns false if absent.
    pub fn remove_friend(&mut self, user_id: &str) -> bool {
        let before = self.friends.len();
        self.friends.retain(|f| f != user_id);
        self.friends.len() != before
    }
}

impl Entity for User {
    const COLLECTION: &'static str = USERS;

    fn key(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> StoreResult<()> {
        if self.id.is_empty() {
            return Err(StoreError::invalid_entity(USERS, "user id is empty"));
        }
        if self.username.trim().is_empty() {
            return Err(StoreError::invalid_entity(USERS, "username is blank"));
        }
        if !is_valid_passcode(&self.passcode) {
            return Err(StoreError::invalid_entity(
                USERS,
                "passcode must be six digits",
            ));
        }
        Ok(())
    }
}

/// Lifecycle of a friend request. Resolved requests are deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Waiting for the recipient.
    Pending,
    /// Accepted.
    Resolved,
}

/// A friend request from one user to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    /// Unique id.
    pub id: String,
    /// Sender.
    pub from_user_id: String,
    /// Recipient.
    pub to_user_id: String,
    /// Current status.
    pub status: RequestStatus,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl FriendRequest {
    /// A new pending request, stamped now.
    pub fn pending(from_user_id: &str, to_user_id: &str) -> Self {
        Self {
            id: new_id(),
            from_user_id: from_user_id.to_string(),
            to_user_id: to_user_id.to_string(),
            status: RequestStatus::Pending,
            timestamp: now_millis(),
        }
    }

    /// Returns true while the request awaits acceptance.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    /// Returns true if the request connects `a` and `b`, in either direction.
    #[must_use]
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.from_user_id == a && self.to_user_id == b)
            || (self.from_user_id == b && self.to_user_id == a)
    }
}

impl Entity for FriendRequest {
    const COLLECTION: &'static str = FRIEND_REQUESTS;

    fn key(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> StoreResult<()> {
        if self.id.is_empty() || self.from_user_id.is_empty() || self.to_user_id.is_empty() {
            return Err(StoreError::invalid_entity(
                FRIEND_REQUESTS,
                "request id and both user ids are required",
            ));
        }
        Ok(())
    }
}
