//! Property-based test generators using proptest.
//!
//! Provides strategies for generating chat data that satisfies the
//! entity validation rules.

use chatdb_chat::{Message, MessageKind, DEFAULT_CHANNEL};
use proptest::prelude::*;

/// Strategy for generating usernames, possibly padded with spaces.
pub fn username_strategy() -> impl Strategy<Value = String> {
    (
        prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_ ]{0,15}").expect("Invalid regex"),
        " {0,2}",
    )
        .prop_map(|(name, pad)| format!("{pad}{name}{pad}"))
}

/// Strategy for generating well-formed passcodes.
pub fn passcode_strategy() -> impl Strategy<Value = String> {
    (100_000u32..=999_999).prop_map(|n| n.to_string())
}

/// Strategy for generating channel names, biased towards the default.
pub fn channel_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        2 => Just(DEFAULT_CHANNEL.to_string()),
        1 => prop::string::string_regex("[a-z]{1,8}").expect("Invalid regex"),
    ]
}

/// Strategy for generating valid messages from `sender_id`.
pub fn message_strategy(sender_id: String) -> impl Strategy<Value = Message> {
    let kind = prop_oneof![
        4 => Just(MessageKind::Text),
        1 => Just(MessageKind::Image),
        1 => Just(MessageKind::Video),
        1 => Just(MessageKind::Voice),
    ];
    (
        kind,
        "[ -~]{1,64}",
        channel_strategy(),
        0i64..4_000_000_000_000,
    )
        .prop_map(move |(kind, text, channel, timestamp)| {
            let message = if kind.is_attachment() {
                Message::attachment(sender_id.clone(), kind, format!("blob:{timestamp}"))
            } else {
                Message::text(sender_id.clone(), text)
            };
            message.in_channel(channel).at(timestamp)
        })
}

/// A high-level chat operation. User references are indexes into the
/// users created so far, taken modulo their number.
#[derive(Debug, Clone)]
pub enum ChatOperation {
    /// Create a user
    CreateUser {
        /// Username
        username: String,
    },
    /// Post a text message
    Post {
        /// Sender
        from: usize,
        /// Text
        text: String,
    },
    /// Send a friend request
    SendRequest {
        /// Sender
        from: usize,
        /// Recipient
        to: usize,
    },
    /// Accept one of the pending requests
    Accept {
        /// Request
        request: usize,
    },
}

/// Strategy for generating chat operations.
pub fn chat_operation_strategy() -> impl Strategy<Value = ChatOperation> {
    prop_oneof![
        2 => username_strategy().prop_map(|username| ChatOperation::CreateUser { username }),
        2 => (any::<usize>(), "[a-z ]{1,32}")
            .prop_map(|(from, text)| ChatOperation::Post { from, text }),
        3 => (any::<usize>(), any::<usize>())
            .prop_map(|(from, to)| ChatOperation::SendRequest { from, to }),
        2 => any::<usize>().prop_map(|request| ChatOperation::Accept { request }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<ChatOperation>> {
    prop::collection::vec(chat_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
