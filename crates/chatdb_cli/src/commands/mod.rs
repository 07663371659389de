//! CLI command implementations.

pub mod friends;
pub mod inspect;
pub mod journal;
pub mod messages;
pub mod users;
