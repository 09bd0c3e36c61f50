//! Remote repositories and the registry that orders them.
//!
//! A [`RepositoryDescriptor`] is the configured form (what the user typed or
//! what ships as a preset); a [`RemoteRepository`] is the handle resolvers
//! work with, carrying the snapshot policy of the active mode.

mod registry;

pub use registry::{RepositoryRegistry, preset_repositories};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::version::Version;

/// Id of the pseudo-repository standing for the local cache.
pub const LOCAL_REPOSITORY_ID: &str = "local";

/// Layout kind of every repository this crate can talk to.
pub const DEFAULT_LAYOUT: &str = "default";

/// Username and password for a repository.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Returns `None` unless both fields are non-empty.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Option<Self> {
        let username = username.into();
        let password = password.into();
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self { username, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configured repository, as stored in presets and settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    pub id: String,
    #[serde(rename = "type", default = "default_layout")]
    pub layout: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

fn default_layout() -> String {
    DEFAULT_LAYOUT.to_string()
}

impl RepositoryDescriptor {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            layout: default_layout(),
            url: url.into(),
            credentials: None,
        }
    }

    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Attaches credentials only when username and password are both non-empty.
    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Credentials::new(username, password);
        self
    }

    /// Whether the id marks a pre-release channel.
    pub fn is_snapshot_channel(&self) -> bool {
        self.id.to_uppercase().contains("SNAPSHOT")
    }
}

/// Repository handle used by the resolvers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepository {
    id: String,
    layout: String,
    url: String,
    credentials: Option<Credentials>,
    snapshots_enabled: bool,
}

impl RemoteRepository {
    pub fn new(descriptor: &RepositoryDescriptor, snapshots_enabled: bool) -> Self {
        // Descriptors deserialized from settings may carry half-filled credentials.
        let credentials = descriptor
            .credentials
            .as_ref()
            .and_then(|c| Credentials::new(c.username.clone(), c.password.clone()));

        Self {
            id: descriptor.id.clone(),
            layout: descriptor.layout.clone(),
            url: descriptor.url.trim_end_matches('/').to_string(),
            credentials,
            snapshots_enabled,
        }
    }

    /// The local cache seen as a repository. It has no URL and is never
    /// contacted over a transport.
    pub fn local() -> Self {
        Self {
            id: LOCAL_REPOSITORY_ID.to_string(),
            layout: DEFAULT_LAYOUT.to_string(),
            url: String::new(),
            credentials: None,
            snapshots_enabled: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn layout(&self) -> &str {
        &self.layout
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn snapshots_enabled(&self) -> bool {
        self.snapshots_enabled
    }

    pub fn is_local(&self) -> bool {
        self.id == LOCAL_REPOSITORY_ID && self.url.is_empty()
    }

    /// Whether versions like `version` may be served from this repository.
    pub fn accepts(&self, version: &Version) -> bool {
        self.snapshots_enabled || !version.is_snapshot()
    }

    /// Absolute URL of a repository-relative path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.url, path.trim_start_matches('/'))
    }
}

impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.url.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.id, self.url)
        }
    }
}
