//! Fellowship Core Library
//!
//! Cross-account public directory synchronization for live study sessions.
//!
//! ## Overview
//!
//! Fellowship mirrors locally created live-session entities (sessions,
//! rosters, chat messages, invitations) into a shared, multi-tenant public
//! store so that users on different accounts can discover, join, and
//! converse in the same session.
//!
//! ## Core Principles
//!
//! - **Flat wire schema**: every mirrored record is primitive key/value
//!   fields, keyed by the owning entity's identifier
//! - **Best-effort reads**: one malformed remote record is skipped, never
//!   allowed to block the rest of the directory
//! - **Last write wins**: upserts overwrite in place; no version checks,
//!   no merge strategy
//! - **Payload-less notifications**: a fired subscription only says
//!   "something changed, re-fetch"
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use fellowship_core::{
//!     AccountIdentity, DirectoryService, IdentityChain, MemoryStore, MessageKind,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let identity = IdentityChain::new()
//!         .with_source(AccountIdentity::new("userA").with_name("Naomi"));
//!     let directory = DirectoryService::new(store, identity);
//!
//!     // Host a session and chat in it
//!     let session = directory
//!         .host_session("Psalm 23 Study", "Evening walk-through", "Bible Study")
//!         .await?;
//!     directory
//!         .send_message(session.id, "Welcome!", MessageKind::Text)
//!         .await?;
//!
//!     // Other clients discover it
//!     for session in directory.list_public_sessions().await? {
//!         println!("{} ({})", session.title, session.category);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod directory;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod mapper;
pub mod query;
pub mod record;
pub mod store;
pub mod subscription;
pub mod types;

// Re-exports
pub use directory::DirectoryService;
pub use error::{SyncError, SyncResult};
pub use gateway::SyncGateway;
pub use identity::{
    AccountIdentity, DeviceIdentity, IdentityChain, IdentitySource, DEFAULT_DEVICE_NAME,
};
pub use mapper::{IdentityPolicy, Mirrored};
pub use query::{Direction, Predicate, Sort};
pub use record::{FieldValue, RecordKind, WireRecord};
pub use store::{
    ChangeNotification, ChangeTrigger, MemoryStore, PublicStore, RedbStore, Subscription,
    SubscriptionId, TriggerSet,
};
pub use subscription::{SubscriptionManager, SESSIONS_SUBSCRIPTION_ID};
pub use types::*;
