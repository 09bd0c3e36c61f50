//! Ordered registry of presets and user repositories.

use anyhow::Result;
use log::debug;

use super::{RemoteRepository, RepositoryDescriptor};

/// Repositories every registry starts with, in lookup order.
pub fn preset_repositories() -> Vec<RepositoryDescriptor> {
    vec![
        RepositoryDescriptor::new("central", "https://repo.maven.apache.org/maven2"),
        RepositoryDescriptor::new(
            "gluon-nexus",
            "https://nexus.gluonhq.com/nexus/content/repositories/releases",
        ),
        RepositoryDescriptor::new(
            "sonatype-snapshots",
            "https://oss.sonatype.org/content/repositories/snapshots",
        ),
    ]
}

/// Presets followed by user repositories.
///
/// Ids are unique across both lists. The registry also remembers whether the
/// session runs in releases-only mode, which decides both the visible list
/// and the snapshot policy of every handle it builds.
#[derive(Debug, Clone)]
pub struct RepositoryRegistry {
    presets: Vec<RepositoryDescriptor>,
    user: Vec<RepositoryDescriptor>,
    releases_only: bool,
}

impl RepositoryRegistry {
    /// Registry over the built-in presets.
    pub fn new(releases_only: bool) -> Self {
        Self::with_presets(preset_repositories(), releases_only)
    }

    /// Registry over an explicit preset list.
    pub fn with_presets(presets: Vec<RepositoryDescriptor>, releases_only: bool) -> Self {
        Self {
            presets,
            user: Vec::new(),
            releases_only,
        }
    }

    pub fn releases_only(&self) -> bool {
        self.releases_only
    }

    pub fn user_repositories(&self) -> &[RepositoryDescriptor] {
        &self.user
    }

    /// Appends a user repository. Fails if the id is already taken.
    pub fn add(&mut self, descriptor: RepositoryDescriptor) -> Result<()> {
        if self.contains(&descriptor.id) {
            anyhow::bail!("Repository '{}' is already registered", descriptor.id);
        }
        debug!("Registering repository {} at {}", descriptor.id, descriptor.url);
        self.user.push(descriptor);
        Ok(())
    }

    /// Appends several user repositories, skipping ids already taken.
    pub fn extend(&mut self, descriptors: impl IntoIterator<Item = RepositoryDescriptor>) {
        for descriptor in descriptors {
            if let Err(e) = self.add(descriptor) {
                log::warn!("{}", e);
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.presets.iter().chain(&self.user).any(|d| d.id == id)
    }

    /// Presets first, then user repositories, each in declared order.
    ///
    /// With `releases_only`, repositories whose id names a snapshot channel
    /// are left out.
    pub fn list_repositories(&self, releases_only: bool) -> Vec<RepositoryDescriptor> {
        self.presets
            .iter()
            .chain(&self.user)
            .filter(|d| !releases_only || !d.is_snapshot_channel())
            .cloned()
            .collect()
    }

    /// Builds the handle for `descriptor` under the registry's mode.
    pub fn build_repository(&self, descriptor: &RepositoryDescriptor) -> RemoteRepository {
        RemoteRepository::new(descriptor, !self.releases_only)
    }

    /// Handles for every repository visible in the active mode.
    pub fn repositories(&self) -> Vec<RemoteRepository> {
        self.list_repositories(self.releases_only)
            .iter()
            .map(|d| self.build_repository(d))
            .collect()
    }

    /// Looks up a visible repository by id.
    pub fn find(&self, id: &str) -> Option<RemoteRepository> {
        self.list_repositories(self.releases_only)
            .iter()
            .find(|d| d.id == id)
            .map(|d| self.build_repository(d))
    }

    /// Maps an origin id back to a handle; unknown origins are served by the
    /// local cache.
    pub fn resolve_origin(&self, id: Option<&str>) -> RemoteRepository {
        id.and_then(|id| self.find(id))
            .unwrap_or_else(RemoteRepository::local)
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::new(false)
    }
}
