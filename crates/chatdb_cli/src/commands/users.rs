//! User commands: signup, login and lookup.

use chatdb_chat::{ChatStore, User};

/// Creates a user and prints its credentials.
pub async fn signup(chat: &ChatStore, username: &str) -> Result<(), Box<dyn std::error::Error>> {
    let user = chat.create_user(username).await?;
    println!("Created user {}", user.username);
    println!("  id:       {}", user.id);
    println!("  passcode: {}", user.passcode);
    if !chat.is_persistent() {
        println!("(in-memory store: nothing is saved)");
    }
    Ok(())
}

/// Checks credentials.
pub async fn login(
    chat: &ChatStore,
    username: &str,
    passcode: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    match chat.verify_user(username, passcode).await? {
        Some(user) => print_user(&user),
        None => return Err("Invalid username or passcode".into()),
    }
    Ok(())
}

/// Finds a user by exact username or passcode.
pub async fn find(chat: &ChatStore, query: &str) -> Result<(), Box<dyn std::error::Error>> {
    match chat.find_user_by_username_or_passcode(query).await? {
        Some(user) => print_user(&user),
        None => println!("No user matches {query:?}"),
    }
    Ok(())
}

pub(crate) fn print_user(user: &User) {
    println!(
        "{} ({}) {} friends",
        user.username,
        user.id,
        user.friends.len()
    );
}
