//! Authenticated identity: who owns the transfers and which bearer token
//! authorizes them.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use fileshelf_protocol::EventName;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::FileApi;
use crate::events::{EventBus, EventPayload};

/// The current user and their bearer token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "userID")]
    pub user_id: u64,
    pub token: String,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Source of the authenticated identity.
///
/// Pipelines ask once per transfer and fail fast when it returns `None`.
pub trait IdentityProvider: Send + Sync {
    /// Returns the current identity, if any.
    fn identity(&self) -> Option<Identity>;
}

/// A fixed identity, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub Option<Identity>);

impl StaticIdentity {
    /// Creates a provider that always returns `identity`.
    pub fn new(user_id: u64, token: impl Into<String>) -> Self {
        Self(Some(Identity {
            user_id,
            token: token.into(),
        }))
    }

    /// Creates a provider with no identity.
    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn identity(&self) -> Option<Identity> {
        self.0.clone()
    }
}

/// Errors from credential persistence.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistent credentials for the signed-in user.
///
/// Cached in memory and persisted as a small JSON file.
pub struct CredentialStore {
    path: PathBuf,
    current: RwLock<Option<Identity>>,
}

impl CredentialStore {
    /// Opens the store, loading existing credentials from disk.
    pub fn open(path: PathBuf) -> Result<Self, CredentialError> {
        let current = load_identity(&path)?;
        Ok(Self {
            path,
            current: RwLock::new(current),
        })
    }

    /// Stores `identity` and announces the login on `bus`.
    pub fn login(&self, identity: Identity, bus: &EventBus) -> Result<(), CredentialError> {
        let user_id = identity.user_id;
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(identity);
        self.persist()?;
        info!(user_id, "logged in");
        bus.publish(EventName::UserLogin, &user_payload(Some(user_id)));
        Ok(())
    }

    /// Forgets the stored identity and announces the logout on `bus`.
    pub fn logout(&self, bus: &EventBus) -> Result<(), CredentialError> {
        let previous = self
            .current
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        info!("logged out");
        bus.publish(
            EventName::UserLogout,
            &user_payload(previous.map(|i| i.user_id)),
        );
        Ok(())
    }

    /// Path of the credentials file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), CredentialError> {
        let current = self.current.read().unwrap_or_else(|e| e.into_inner());
        let json = serde_json::to_string_pretty(&*current)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        debug!(path = %self.path.display(), "credentials persisted");
        Ok(())
    }
}

impl IdentityProvider for CredentialStore {
    fn identity(&self) -> Option<Identity> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

fn load_identity(path: &Path) -> Result<Option<Identity>, CredentialError> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    let identity: Option<Identity> = serde_json::from_str(&data)?;
    debug!(path = %path.display(), found = identity.is_some(), "credentials loaded");
    Ok(identity)
}

fn user_payload(user_id: Option<u64>) -> EventPayload {
    let mut payload = EventPayload::new();
    if let Some(id) = user_id {
        payload.insert("userID".into(), id.into());
    }
    payload
}

/// Returns the default credentials file path.
pub fn default_credentials_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("fileshelf").join("credentials.json"))
}

/// Returns the platform-specific config directory.
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

/// Asks the server whether the current identity is still valid.
///
/// Returns `false` without a request when there is no identity, and
/// `false` when the request fails. Publishes `user-login` on success and
/// `user-logout` otherwise.
pub async fn refresh_authentication(
    api: &FileApi,
    provider: &dyn IdentityProvider,
    bus: &EventBus,
) -> bool {
    let Some(identity) = provider.identity() else {
        debug!("no stored identity; not authenticated");
        bus.publish(EventName::UserLogout, &user_payload(None));
        return false;
    };

    let authenticated = match api
        .with_token(&identity.token)
        .auth_status(identity.user_id)
        .await
    {
        Ok(authenticated) => authenticated,
        Err(e) => {
            warn!(user_id = identity.user_id, error = %e, "auth status check failed");
            false
        }
    };

    let event = if authenticated {
        EventName::UserLogin
    } else {
        EventName::UserLogout
    };
    bus.publish(event, &user_payload(Some(identity.user_id)));
    authenticated
}
