//! Friendship commands.

use super::users::print_user;
use chatdb_chat::{ChatStore, FriendRequest};

/// Sends a friend request.
pub async fn befriend(
    chat: &ChatStore,
    from: &str,
    to: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    match chat.send_friend_request(from, to).await? {
        Some(request) => println!("Sent request {}", request.id),
        None => println!("A request between these users already exists"),
    }
    Ok(())
}

/// Lists pending requests, received or sent.
pub async fn requests(
    chat: &ChatStore,
    user: &str,
    outgoing: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let requests = if outgoing {
        chat.get_outgoing_requests(user).await?
    } else {
        chat.get_pending_requests(user).await?
    };

    for request in &requests {
        print_request(request);
    }
    println!("{} pending", requests.len());
    Ok(())
}

/// Accepts a request.
pub async fn accept(chat: &ChatStore, request: &str) -> Result<(), Box<dyn std::error::Error>> {
    match chat.accept_friend_request(request).await? {
        Some(request) => println!(
            "{} and {} are now friends",
            request.from_user_id, request.to_user_id
        ),
        None => println!("No request {request}"),
    }
    Ok(())
}

/// Lists friends.
pub async fn list(chat: &ChatStore, user: &str) -> Result<(), Box<dyn std::error::Error>> {
    let friends = chat.get_friends(user).await?;
    for friend in &friends {
        print_user(friend);
    }
    if friends.is_empty() {
        println!("No friends yet");
    }
    Ok(())
}

fn print_request(request: &FriendRequest) {
    println!(
        "{} {} -> {} at {}",
        request.id, request.from_user_id, request.to_user_id, request.timestamp
    );
}
