//! Collections, indexes and schema versions of the chat store.

use chatdb_core::{Schema, SchemaStep, SchemaVersion};

/// Message log.
pub const MESSAGES: &str = "messages";
/// Registered users.
pub const USERS: &str = "users";
/// Pending friend requests.
pub const FRIEND_REQUESTS: &str = "friend_requests";

/// Users by username.
pub const USERNAME_INDEX: &str = "username";
/// Users by passcode.
pub const PASSCODE_INDEX: &str = "passcode";
/// Friend requests by recipient.
pub const TO_USER_INDEX: &str = "toUserId";
/// Friend requests by sender.
pub const FROM_USER_INDEX: &str = "fromUserId";
/// Messages by channel.
pub const CHANNEL_INDEX: &str = "channel";

/// Schema version a current build expects.
pub const SCHEMA_VERSION: SchemaVersion = 3;

/// The chat schema, version by version.
///
/// - v1: messages; users with `username` and `passcode` indexes
/// - v2: friend requests with `toUserId` and `fromUserId` indexes
/// - v3: `channel` index on messages
#[must_use]
pub fn chat_schema() -> Schema {
    Schema::new()
        .step(
            SchemaStep::new(1)
                .create_collection(MESSAGES, "id")
                .create_collection(USERS, "id")
                .create_index(USERS, USERNAME_INDEX, "username")
                .create_index(USERS, PASSCODE_INDEX, "passcode"),
        )
        .step(
            SchemaStep::new(2)
                .create_collection(FRIEND_REQUESTS, "id")
                .create_index(FRIEND_REQUESTS, TO_USER_INDEX, "toUserId")
                .create_index(FRIEND_REQUESTS, FROM_USER_INDEX, "fromUserId"),
        )
        .step(SchemaStep::new(3).create_index(MESSAGES, CHANNEL_INDEX, "channel"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_version_matches_constant() {
        assert_eq!(chat_schema().latest_version(), SCHEMA_VERSION);
    }
}
