//! Message commands.

use chatdb_chat::{ChatStore, Message, MessageKind};

/// A message to post.
#[derive(Debug)]
pub struct Post {
    /// Sender id.
    pub from: String,
    /// Body text.
    pub text: String,
    /// Target channel.
    pub channel: String,
    /// Direct recipient.
    pub to: Option<String>,
    /// Attachment kind and URL.
    pub attachment: Option<(MessageKind, String)>,
}

/// Stores a message.
pub async fn post(chat: &ChatStore, post: Post) -> Result<(), Box<dyn std::error::Error>> {
    let mut message = match post.attachment {
        Some((kind, url)) => {
            let mut message = Message::attachment(post.from, kind, url);
            message.text = post.text;
            message
        }
        None => Message::text(post.from, post.text),
    }
    .in_channel(post.channel);
    if let Some(to) = post.to {
        message = message.to_recipient(to);
    }

    let message = chat.add_message(message).await?;
    println!("Posted {} to #{}", message.id, message.channel);
    Ok(())
}

/// Prints the newest `limit` messages, oldest first.
pub async fn list(
    chat: &ChatStore,
    channel: Option<&str>,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let messages = chat.messages().latest(channel, limit).await?;

    for message in messages.iter().rev() {
        print_message(message);
    }
    if messages.is_empty() {
        println!("No messages");
    }
    Ok(())
}

fn print_message(message: &Message) {
    let target = message
        .recipient_id
        .as_deref()
        .map_or_else(|| format!("#{}", message.channel), |to| format!("@{to}"));
    match &message.file_url {
        Some(url) if message.file_type.is_attachment() => println!(
            "[{}] {} -> {}: [{}] {} {}",
            message.timestamp, message.sender_id, target, message.file_type, url, message.text
        ),
        _ => println!(
            "[{}] {} -> {}: {}",
            message.timestamp, message.sender_id, target, message.text
        ),
    }
}
