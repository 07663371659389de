//! chatdb CLI
//!
//! Command-line client for chatdb stores.
//!
//! # Commands
//!
//! - `inspect` - Display schema, collection and index statistics
//! - `dump-journal` - Dump committed journal records for debugging
//! - `signup`, `login`, `find` - Create and look up users
//! - `post`, `messages` - Write and read messages
//! - `befriend`, `requests`, `accept`, `friends` - Manage friendships

mod commands;

use chatdb_chat::{ChatStore, MessageKind, DEFAULT_CHANNEL};
use chatdb_core::StoreConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// chatdb command-line client.
#[derive(Parser)]
#[command(name = "chatdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory (in-memory if omitted)
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display store statistics and schema
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Dump journal records for debugging
    DumpJournal {
        /// Maximum number of records to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Create a user and print its passcode
    Signup {
        /// Display name
        username: String,
    },

    /// Check a username and passcode
    Login {
        /// Display name
        username: String,
        /// Six-digit passcode
        passcode: String,
    },

    /// Find a user by exact username or passcode
    Find {
        /// Username or passcode
        query: String,
    },

    /// Post a message
    Post {
        /// Sender user id
        #[arg(long)]
        from: String,

        /// Message text
        text: String,

        /// Channel to post in
        #[arg(short, long, default_value = DEFAULT_CHANNEL)]
        channel: String,

        /// Direct message recipient
        #[arg(long)]
        to: Option<String>,

        /// Attachment kind (image, video, voice)
        #[arg(long, requires = "url")]
        kind: Option<String>,

        /// Attachment URL
        #[arg(long, requires = "kind")]
        url: Option<String>,
    },

    /// List messages, newest last
    Messages {
        /// Only this channel
        #[arg(short, long)]
        channel: Option<String>,

        /// Maximum number of messages
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Send a friend request
    Befriend {
        /// Sender user id
        from: String,
        /// Recipient user id
        to: String,
    },

    /// List friend requests of a user
    Requests {
        /// User id
        user: String,

        /// Show requests the user sent instead of received
        #[arg(long)]
        outgoing: bool,
    },

    /// Accept a friend request
    Accept {
        /// Request id
        request: String,
    },

    /// List a user's friends
    Friends {
        /// User id
        user: String,
    },

    /// Show version information
    Version,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // These two never open the store.
    match &cli.command {
        Commands::DumpJournal { limit, format } => {
            let path = cli.path.as_deref().ok_or("Store path required for dump-journal")?;
            return commands::journal::run(path, *limit, format);
        }
        Commands::Version => {
            println!("chatdb CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("chatdb core v{}", chatdb_core::VERSION);
            println!("chat schema v{}", chatdb_chat::SCHEMA_VERSION);
            return Ok(());
        }
        _ => {}
    }

    let config = match &cli.path {
        Some(path) => StoreConfig::at(path),
        None => StoreConfig::new(),
    };
    let chat = ChatStore::open_with_fallback(config).await?;
    debug!(persistent = chat.is_persistent(), "store ready");

    let result = dispatch(&chat, cli.command).await;
    chat.close()?;
    result
}

async fn dispatch(chat: &ChatStore, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Inspect { format } => commands::inspect::run(chat, &format)?,
        Commands::Signup { username } => commands::users::signup(chat, &username).await?,
        Commands::Login { username, passcode } => {
            commands::users::login(chat, &username, &passcode).await?;
        }
        Commands::Find { query } => commands::users::find(chat, &query).await?,
        Commands::Post {
            from,
            text,
            channel,
            to,
            kind,
            url,
        } => {
            let kind = kind.as_deref().map(parse_kind).transpose()?;
            let post = commands::messages::Post {
                from,
                text,
                channel,
                to,
                attachment: kind.zip(url),
            };
            commands::messages::post(chat, post).await?;
        }
        Commands::Messages { channel, limit } => {
            commands::messages::list(chat, channel.as_deref(), limit).await?;
        }
        Commands::Befriend { from, to } => commands::friends::befriend(chat, &from, &to).await?,
        Commands::Requests { user, outgoing } => {
            commands::friends::requests(chat, &user, outgoing).await?;
        }
        Commands::Accept { request } => commands::friends::accept(chat, &request).await?,
        Commands::Friends { user } => commands::friends::list(chat, &user).await?,
        Commands::DumpJournal { .. } | Commands::Version => {}
    }
    Ok(())
}

fn parse_kind(kind: &str) -> Result<MessageKind, String> {
    match kind {
        "image" => Ok(MessageKind::Image),
        "video" => Ok(MessageKind::Video),
        "voice" => Ok(MessageKind::Voice),
        other => Err(format!("unknown attachment kind: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("chatdb").chain(args.iter().copied()))
    }

    #[test]
    fn attachment_needs_kind_and_url() {
        assert!(parse(&["post", "--from", "u1", "hi", "--url", "blob:1"]).is_err());
        assert!(parse(&["post", "--from", "u1", "hi", "--kind", "image"]).is_err());

        let cli = parse(&["post", "--from", "u1", "hi", "--kind", "image", "--url", "blob:1"])
            .unwrap();
        match cli.command {
            Commands::Post { kind, url, .. } => {
                assert_eq!(kind.as_deref(), Some("image"));
                assert_eq!(url.as_deref(), Some("blob:1"));
            }
            _ => panic!("expected post"),
        }
    }

    #[test]
    fn plain_post_parses() {
        let cli = parse(&["--path", "data", "post", "--from", "u1", "hi"]).unwrap();
        assert_eq!(cli.path, Some(PathBuf::from("data")));
        assert!(matches!(
            cli.command,
            Commands::Post { kind: None, url: None, .. }
        ));
    }
}
