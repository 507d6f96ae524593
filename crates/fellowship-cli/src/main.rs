//! Fellowship CLI
//!
//! Thin wrapper around fellowship-core for command-line usage. The shared
//! public store is a redb database file; point `--store` at a shared
//! location (network mount, synced folder) to exercise multi-client flows.
//!
//! ## Usage
//!
//! ```bash
//! # Show the resolved identity
//! fellowship identity show
//!
//! # Host a session
//! fellowship session host "Psalm 23 Study" --category "Bible Study"
//!
//! # Browse the public directory
//! fellowship session list
//!
//! # Join a session
//! fellowship session join <session_id>
//!
//! # Chat
//! fellowship chat send <session_id> "Amen" --kind prayer
//! fellowship chat list <session_id>
//!
//! # Invitations
//! fellowship invite user <session_id> <user_id> <user_name>
//! fellowship invite email <session_id> ruth@example.com
//! fellowship invite list
//! fellowship invite accept <invitation_id>
//!
//! # Follow changes and re-fetch as notifications arrive
//! fellowship watch [--session <session_id>]
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use fellowship_core::{
    AccountIdentity, DeviceIdentity, DirectoryService, IdentityChain, InvitationStatus,
    MessageKind, RedbStore, SessionId, DEFAULT_DEVICE_NAME,
};

/// Fellowship - live study session directory
#[derive(Parser)]
#[command(name = "fellowship")]
#[command(version = "0.1.0")]
#[command(about = "Fellowship - live study session directory")]
#[command(
    long_about = "Publish live study sessions into a shared public directory, discover sessions hosted by other accounts, chat, and send invitations."
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Data directory (default: ~/.fellowship)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path to the shared public store database
    /// (default: <data_dir>/public.redb)
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// Account user id from the identity provider (falls back to the
    /// persisted device identity when omitted)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Account display name
    #[arg(long, global = true)]
    name: Option<String>,

    /// Account email (used for invitation addressing)
    #[arg(long, global = true)]
    email: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identity management
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },

    /// Session management
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Chat in a session
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },

    /// Invitation management
    Invite {
        #[command(subcommand)]
        action: InviteAction,
    },

    /// Follow change notifications and re-fetch as they arrive
    Watch {
        /// Also watch one session's chat messages
        #[arg(long)]
        session: Option<String>,
    },
}

#[derive(Subcommand)]
enum IdentityAction {
    /// Show the resolved user id and display name
    Show,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Host a new session
    Host {
        /// Session title
        title: String,
        /// Longer description
        #[arg(long, default_value = "")]
        details: String,
        /// Category label
        #[arg(long, default_value = "Bible Study")]
        category: String,
    },
    /// List all sessions in the public directory
    List,
    /// Join a session as the current user
    Join {
        /// Session id
        session_id: String,
    },
    /// Close a session you host
    Close {
        /// Session id
        session_id: String,
    },
}

#[derive(Subcommand)]
enum ChatAction {
    /// Send a message to a session
    Send {
        /// Session id
        session_id: String,
        /// Message text
        body: String,
        /// Message kind: text, prayer, scripture, or system
        #[arg(long, default_value = "text")]
        kind: String,
    },
    /// List a session's timeline
    List {
        /// Session id
        session_id: String,
    },
}

#[derive(Subcommand)]
enum InviteAction {
    /// Invite a known user to a session
    User {
        /// Session id
        session_id: String,
        /// Invited user's id
        user_id: String,
        /// Invited user's display name
        user_name: String,
    },
    /// Invite by email address
    Email {
        /// Session id
        session_id: String,
        /// Invited email
        email: String,
    },
    /// List invitations addressed to the current user
    List,
    /// Accept a pending invitation
    Accept {
        /// Invitation id
        invitation_id: String,
    },
    /// Decline a pending invitation
    Decline {
        /// Invitation id
        invitation_id: String,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

fn parse_session_id(s: &str) -> Result<SessionId> {
    SessionId::from_string(s).map_err(|e| anyhow::anyhow!("Invalid session id '{}': {}", s, e))
}

fn parse_message_kind(s: &str) -> Result<MessageKind> {
    MessageKind::from_str_opt(s)
        .ok_or_else(|| anyhow::anyhow!("Unknown message kind '{}' (expected text, prayer, scripture, or system)", s))
}

fn format_time(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let data_dir = cli.data_dir.unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".fellowship")
    });
    let store_path = cli
        .store
        .unwrap_or_else(|| data_dir.join("public.redb"));

    let device_name = std::env::var("USER").unwrap_or_else(|_| DEFAULT_DEVICE_NAME.to_string());
    let device = DeviceIdentity::load_or_generate(&data_dir, device_name)?;

    let mut identity = IdentityChain::new();
    if let Some(user) = cli.user.clone() {
        let mut account = AccountIdentity::new(user);
        if let Some(name) = cli.name {
            account = account.with_name(name);
        }
        if let Some(ref email) = cli.email {
            account = account.with_email(email.clone());
        }
        identity = identity.with_source(account);
    }
    let identity = identity.with_source(device);

    let store = Arc::new(RedbStore::open(&store_path)?);
    let directory = DirectoryService::new(store, identity);

    match cli.command {
        Commands::Identity { action } => match action {
            IdentityAction::Show => {
                println!("User ID:   {}", directory.identity().current_user_id());
                println!("User name: {}", directory.identity().current_user_name());
            }
        },

        Commands::Session { action } => match action {
            SessionAction::Host {
                title,
                details,
                category,
            } => {
                let session = directory.host_session(title, details, category).await?;
                println!("Hosting session: {}", session.title);
                println!("  ID: {}", session.id);
                println!("  Category: {}", session.category);
                println!("  Starts: {}", format_time(session.start_time));
            }

            SessionAction::List => {
                let sessions = directory.list_public_sessions().await?;
                if sessions.is_empty() {
                    println!("No sessions in the directory.");
                } else {
                    println!("Public sessions ({}):", sessions.len());
                    println!();
                    for session in sessions {
                        let state = if session.is_active { "active" } else { "ended" };
                        println!(
                            "  {} [{}] ({}/{} participants, {})",
                            session.title,
                            session.category,
                            session.current_participants,
                            session.max_participants,
                            state
                        );
                        println!("    ID: {}", session.id);
                        println!("    Host: {}", session.host_id);
                        println!("    Starts: {}", format_time(session.start_time));
                        if !session.tags.is_empty() {
                            println!("    Tags: {}", session.tags.join(", "));
                        }
                        println!();
                    }
                }
            }

            SessionAction::Join { session_id } => {
                let session_id = parse_session_id(&session_id)?;
                let sessions = directory.list_public_sessions().await?;
                let Some(session) = sessions.into_iter().find(|s| s.id == session_id) else {
                    anyhow::bail!("Session not found: {}", session_id);
                };
                if session.is_full() {
                    anyhow::bail!("Session is full: {}", session.title);
                }
                let participant = directory.join_session(&session).await?;
                println!("Joined session: {}", session.title);
                println!("  As: {}", participant.user_name);
            }

            SessionAction::Close { session_id } => {
                let session_id = parse_session_id(&session_id)?;
                let sessions = directory.list_public_sessions().await?;
                let Some(mut session) = sessions.into_iter().find(|s| s.id == session_id) else {
                    anyhow::bail!("Session not found: {}", session_id);
                };
                if session.host_id != directory.identity().current_user_id() {
                    anyhow::bail!("Only the host can close a session");
                }
                session.close();
                directory.publish_session(&session).await?;
                println!("Closed session: {}", session.title);
            }
        },

        Commands::Chat { action } => match action {
            ChatAction::Send {
                session_id,
                body,
                kind,
            } => {
                let session_id = parse_session_id(&session_id)?;
                let kind = parse_message_kind(&kind)?;
                let message = directory.send_message(session_id, body, kind).await?;
                println!("Sent {} message at {}", message.kind, format_time(message.timestamp));
            }

            ChatAction::List { session_id } => {
                let session_id = parse_session_id(&session_id)?;
                let messages = directory.fetch_messages(session_id).await?;
                if messages.is_empty() {
                    println!("No messages yet.");
                } else {
                    for message in messages {
                        println!(
                            "[{}] {} ({}): {}",
                            format_time(message.timestamp),
                            message.user_name,
                            message.kind,
                            message.body
                        );
                    }
                }
            }
        },

        Commands::Invite { action } => match action {
            InviteAction::User {
                session_id,
                user_id,
                user_name,
            } => {
                let session = find_session(&directory, &session_id).await?;
                let invitation = directory.invite_user(&session, user_id, user_name).await?;
                println!("Invitation sent for: {}", session.title);
                println!("  ID: {}", invitation.id);
                println!("  Code: {}", invitation.invite_code);
            }

            InviteAction::Email { session_id, email } => {
                let session = find_session(&directory, &session_id).await?;
                let invitation = directory.invite_by_email(&session, email).await?;
                println!("Invitation sent for: {}", session.title);
                println!("  ID: {}", invitation.id);
                println!("  Code: {}", invitation.invite_code);
            }

            InviteAction::List => {
                let user_id = directory.identity().current_user_id();
                let invitations = directory
                    .fetch_invitations(&user_id, cli.email.as_deref())
                    .await?;
                if invitations.is_empty() {
                    println!("No invitations.");
                } else {
                    let now = fellowship_core::now_ms();
                    println!("Invitations ({}):", invitations.len());
                    println!();
                    for invitation in invitations {
                        let status = if invitation.is_expired(now)
                            && invitation.status == InvitationStatus::Pending
                        {
                            // Expiry is derived at read time, never stored
                            InvitationStatus::Expired
                        } else {
                            invitation.status
                        };
                        println!(
                            "  {} from {} [{}]",
                            invitation.session_title, invitation.host_name, status
                        );
                        println!("    ID: {}", invitation.id);
                        println!("    Code: {}", invitation.invite_code);
                        if let Some(expires_at) = invitation.expires_at {
                            println!("    Expires: {}", format_time(expires_at));
                        }
                        println!();
                    }
                }
            }

            InviteAction::Accept { invitation_id } => {
                respond_to_invitation(&directory, cli.email.as_deref(), &invitation_id, true)
                    .await?;
            }

            InviteAction::Decline { invitation_id } => {
                respond_to_invitation(&directory, cli.email.as_deref(), &invitation_id, false)
                    .await?;
            }
        },

        Commands::Watch { session } => {
            directory.watch_sessions().await?;
            if let Some(ref session_id) = session {
                let session_id = parse_session_id(session_id)?;
                directory.watch_messages(session_id).await?;
            }
            let mut rx = directory.notifications();
            println!("Watching for changes (Ctrl-C to stop)...");

            loop {
                match rx.recv().await {
                    Ok(notification) => {
                        // The token carries no data; re-fetch to see what changed
                        println!(
                            "Change: {} ({:?})",
                            notification.subscription_id, notification.trigger
                        );
                        let sessions = directory.list_public_sessions().await?;
                        println!("  Directory now lists {} session(s)", sessions.len());
                        if let Some(ref session_id) = session {
                            let session_id = parse_session_id(session_id)?;
                            let messages = directory.fetch_messages(session_id).await?;
                            println!("  Session has {} message(s)", messages.len());
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        // At-least-once contract: a re-fetch covers the gap
                        println!("Missed {} notification(s); re-fetching", missed);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    Ok(())
}

async fn find_session(
    directory: &DirectoryService<RedbStore>,
    session_id: &str,
) -> Result<fellowship_core::LiveSession> {
    let session_id = parse_session_id(session_id)?;
    let sessions = directory.list_public_sessions().await?;
    sessions
        .into_iter()
        .find(|s| s.id == session_id)
        .ok_or_else(|| anyhow::anyhow!("Session not found: {}", session_id))
}

async fn respond_to_invitation(
    directory: &DirectoryService<RedbStore>,
    email: Option<&str>,
    invitation_id: &str,
    accept: bool,
) -> Result<()> {
    let user_id = directory.identity().current_user_id();
    let invitations = directory.fetch_invitations(&user_id, email).await?;
    let Some(mut invitation) = invitations
        .into_iter()
        .find(|i| i.id.to_string() == invitation_id)
    else {
        anyhow::bail!("Invitation not found: {}", invitation_id);
    };

    let now = fellowship_core::now_ms();
    if !invitation.is_valid(now) {
        anyhow::bail!(
            "Invitation can no longer be answered (status: {}, expired: {})",
            invitation.status,
            invitation.is_expired(now)
        );
    }

    if accept {
        invitation.accept(now);
    } else {
        invitation.decline(now);
    }
    directory.publish_invitation(&invitation).await?;
    println!(
        "{} invitation to: {}",
        if accept { "Accepted" } else { "Declined" },
        invitation.session_title
    );
    Ok(())
}
