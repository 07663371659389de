//! # chatdb_chat
//!
//! Chat data on top of the chatdb store: messages, users with passcode
//! login, and friend requests.
//!
//! ```no_run
//! use chatdb_chat::{ChatStore, Message};
//!
//! # async fn demo() -> chatdb_chat::ChatResult<()> {
//! let chat = ChatStore::open_in_memory().await?;
//! let alice = chat.create_user("alice").await?;
//! let bob = chat.create_user("bob").await?;
//!
//! chat.add_message(Message::text(&alice.id, "hello")).await?;
//!
//! if let Some(request) = chat.send_friend_request(&alice.id, &bob.id).await? {
//!     chat.accept_friend_request(&request.id).await?;
//! }
//! assert_eq!(chat.get_friends(&bob.id).await?[0].id, alice.id);
//! # Ok(())
//! # }
//! ```

mod error;
mod friendship;
mod model;
mod repository;
mod schema;
mod store;

pub use error::{ChatError, ChatResult, UpdateStage};
pub use friendship::FriendshipCoordinator;
pub use model::{
    generate_passcode, is_valid_passcode, new_id, now_millis, FriendRequest, Message, MessageKind,
    RequestStatus, User, DEFAULT_CHANNEL, PASSCODE_LEN,
};
pub use repository::{FriendRequestRepository, MessageRepository, Repository, UserRepository};
pub use schema::{
    chat_schema, CHANNEL_INDEX, FRIEND_REQUESTS, FROM_USER_INDEX, MESSAGES, PASSCODE_INDEX,
    SCHEMA_VERSION, TO_USER_INDEX, USERNAME_INDEX, USERS,
};
pub use store::ChatStore;
