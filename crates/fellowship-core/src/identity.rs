//! Prioritized identity sources
//!
//! The directory needs a user id and display name for every push, but an
//! account may not be signed in. Rather than ad hoc fallbacks at call
//! sites, identity is resolved through one prioritized chain of
//! [`IdentitySource`]s: typically an account source (from the external
//! identity provider) first, then a stable per-device identity, with a
//! last-resort ephemeral id minted if every source abstains.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use ulid::Ulid;

use crate::error::SyncResult;

/// One place an identity can come from.
///
/// A source abstains with `None`; the chain then consults the next one.
pub trait IdentitySource: Send + Sync {
    /// Stable user identifier, if this source can provide one
    fn user_id(&self) -> Option<String>;

    /// Display name, if this source can provide one
    fn user_name(&self) -> Option<String>;
}

/// Identity provisioned by the external identity provider.
///
/// The display name derives from, in order: the explicit name, the email's
/// local part, or a `User {id prefix}` placeholder.
#[derive(Debug, Clone)]
pub struct AccountIdentity {
    user_id: String,
    name: Option<String>,
    email: Option<String>,
}

impl AccountIdentity {
    /// Create an account identity with the provider-assigned user id
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: None,
            email: None,
        }
    }

    /// Attach an explicit display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach the account email (used for display-name derivation and for
    /// invitation addressing)
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// The account email, if known
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

impl IdentitySource for AccountIdentity {
    fn user_id(&self) -> Option<String> {
        if self.user_id.is_empty() {
            None
        } else {
            Some(self.user_id.clone())
        }
    }

    fn user_name(&self) -> Option<String> {
        if let Some(ref name) = self.name {
            return Some(name.clone());
        }
        if let Some(ref email) = self.email {
            if let Some(local) = email.split('@').next() {
                if !local.is_empty() {
                    return Some(local.to_string());
                }
            }
        }
        if self.user_id.is_empty() {
            None
        } else {
            let prefix: String = self.user_id.chars().take(8).collect();
            Some(format!("User {prefix}"))
        }
    }
}

/// Display name used when nothing better is known
pub const DEFAULT_DEVICE_NAME: &str = "This Device";

/// Name of the file holding the persisted device identifier
const DEVICE_ID_FILE: &str = "device_id";

/// Stable per-device identity, generated once and persisted.
///
/// Lets the app work fully without an account: the same device keeps the
/// same directory identity across restarts.
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    device_id: String,
    device_name: String,
}

impl DeviceIdentity {
    /// Load the persisted device id from `data_dir`, generating and saving
    /// a new one on first use.
    pub fn load_or_generate(
        data_dir: impl AsRef<Path>,
        device_name: impl Into<String>,
    ) -> SyncResult<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        let path: PathBuf = data_dir.join(DEVICE_ID_FILE);

        let device_id = match std::fs::read_to_string(&path) {
            Ok(contents) if Ulid::from_string(contents.trim()).is_ok() => {
                contents.trim().to_string()
            }
            _ => {
                let id = Ulid::new().to_string();
                std::fs::write(&path, &id)?;
                info!(?path, "Generated new device identity");
                id
            }
        };

        Ok(Self {
            device_id,
            device_name: device_name.into(),
        })
    }

    /// The persisted device identifier
    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

impl IdentitySource for DeviceIdentity {
    fn user_id(&self) -> Option<String> {
        Some(self.device_id.clone())
    }

    fn user_name(&self) -> Option<String> {
        Some(self.device_name.clone())
    }
}

/// Prioritized chain of identity sources.
///
/// `current_user_id` never returns an empty string: if every source
/// abstains, a fresh id is minted per call (the caller should normally
/// include a [`DeviceIdentity`] so this last resort stays unused).
pub struct IdentityChain {
    sources: Vec<Box<dyn IdentitySource>>,
}

impl IdentityChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Append a source; earlier sources take priority
    pub fn with_source(mut self, source: impl IdentitySource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Resolve the current user id through the chain
    pub fn current_user_id(&self) -> String {
        for source in &self.sources {
            if let Some(id) = source.user_id() {
                return id;
            }
        }
        warn!("no identity source available, minting ephemeral id");
        Ulid::new().to_string()
    }

    /// Resolve the current display name through the chain
    pub fn current_user_name(&self) -> String {
        for source in &self.sources {
            if let Some(name) = source.user_name() {
                return name;
            }
        }
        DEFAULT_DEVICE_NAME.to_string()
    }
}

impl Default for IdentityChain {
    fn default() -> Self {
        Self::new()
    }
}
