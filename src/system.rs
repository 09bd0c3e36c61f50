//! Entry point tying the registry, the cache and the transports together.

use log::{debug, info};
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::cache::LocalCache;
use crate::coordinate::ArtifactCoordinate;
use crate::error::{ResolveError, Result};
use crate::http::HttpClient;
use crate::listener::{LoggingListener, ResolutionListener};
use crate::pom::Exclusion;
use crate::repository::{RemoteRepository, RepositoryDescriptor, RepositoryRegistry};
use crate::resolver::{
    ArtifactFetcher, DependencyGraphResolver, RepositoryValidator, ResolutionContext,
    ResolvedVersionSet, VersionResolver,
};
use crate::runtime::Runtime;
use crate::settings::Settings;
use crate::transport::{Connector, HttpTransport};
use crate::version::{Version, VersionConstraint};

type LockTable = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Exclusive access to one `group:name` for the lifetime of a call.
///
/// On drop the table entry is removed once no other call holds or awaits it.
struct CoordinateGuard<'a> {
    key: String,
    locks: &'a LockTable,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for CoordinateGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(lock) = locks.get(&self.key)
            && Arc::strong_count(lock) == 1
        {
            locks.remove(&self.key);
        }
    }
}

/// Resolves artifacts for one local repository and one set of remote ones.
///
/// Calls touching the same `group:name` are serialized, since a version
/// query deletes cached metadata another call may be reading.
pub struct RepositorySystem<R: Runtime> {
    runtime: R,
    registry: RepositoryRegistry,
    local_repository: PathBuf,
    connector: Connector,
    listener: Box<dyn ResolutionListener>,
    locks: LockTable,
}

impl<R: Runtime> RepositorySystem<R> {
    /// Builds the system from settings. Fails only when the HTTP stack
    /// cannot be set up.
    pub fn new(runtime: R, settings: &Settings, local_repository: PathBuf) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("mavenkit/", env!("MAVENKIT_VERSION")))
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.timeout())
            .build()
            .map_err(|e| ResolveError::configuration("Cannot build the HTTP client", e))?;
        let http = HttpClient::with_retry_policy(client, settings.retry_policy());

        let mut registry = if settings.use_presets {
            RepositoryRegistry::new(settings.releases_only)
        } else {
            RepositoryRegistry::with_presets(Vec::new(), settings.releases_only)
        };
        registry.extend(settings.repositories.iter().cloned());

        debug!(
            "Local repository {:?}, {} remote repositories",
            local_repository,
            registry.repositories().len()
        );

        Ok(Self {
            runtime,
            registry,
            local_repository,
            connector: Connector::new(HttpTransport::new(http)),
            listener: Box::new(LoggingListener),
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_registry(mut self, registry: RepositoryRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_listener(mut self, listener: Box<dyn ResolutionListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn registry(&self) -> &RepositoryRegistry {
        &self.registry
    }

    pub fn local_repository(&self) -> &Path {
        &self.local_repository
    }

    /// Descriptors of the repositories in use, presets first.
    pub fn repositories(&self) -> Vec<RepositoryDescriptor> {
        self.registry.list_repositories(self.registry.releases_only())
    }

    /// The repository a candidate came from, or the local pseudo-repository.
    pub fn remote_repository(&self, versions: &ResolvedVersionSet, version: &Version) -> RemoteRepository {
        self.registry.resolve_origin(versions.repository_for(version))
    }

    fn context(&self) -> ResolutionContext<'_, R> {
        ResolutionContext::new(
            LocalCache::new(&self.runtime, self.local_repository.clone()),
            &self.connector,
            self.listener.as_ref(),
        )
    }

    async fn lock(&self, coordinate: &ArtifactCoordinate) -> CoordinateGuard<'_> {
        let key = format!("{}:{}", coordinate.group(), coordinate.name());
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(key.clone()).or_default().clone()
        };
        CoordinateGuard {
            key,
            locks: &self.locks,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Versions of `coordinate` within its range, with their origins.
    pub async fn versions(&self, coordinate: &ArtifactCoordinate) -> ResolvedVersionSet {
        let _guard = self.lock(coordinate).await;
        let context = self.context();
        let repositories = self.registry.repositories();
        VersionResolver::new(&context)
            .resolve_version_range(coordinate, &repositories)
            .await
    }

    /// Highest non-snapshot version within the range of `coordinate`.
    pub async fn latest_release(&self, coordinate: &ArtifactCoordinate) -> Option<Version> {
        let _guard = self.lock(coordinate).await;
        let context = self.context();
        let repositories = self.registry.repositories();
        VersionResolver::new(&context)
            .resolve_latest_release(coordinate, &repositories)
            .await
    }

    /// Repository to target for `coordinate`, and the coordinate with any
    /// range replaced by its highest version.
    async fn pin(
        &self,
        context: &ResolutionContext<'_, R>,
        coordinate: &ArtifactCoordinate,
        repository: Option<&str>,
        repositories: &[RemoteRepository],
    ) -> Option<(ArtifactCoordinate, Option<RemoteRepository>)> {
        let preferred = repository.map(|id| self.registry.resolve_origin(Some(id)));
        if matches!(
            coordinate.version().parse::<VersionConstraint>(),
            Ok(VersionConstraint::Soft(_))
        ) {
            return Some((coordinate.clone(), preferred));
        }

        let scope = match &preferred {
            Some(repository) => std::slice::from_ref(repository),
            None => repositories,
        };
        let versions = VersionResolver::new(context)
            .resolve_version_range(coordinate, scope)
            .await;
        let Some(version) = versions.highest() else {
            info!("No version of {} matches its range", coordinate);
            return None;
        };
        let origin = preferred.or_else(|| {
            versions
                .repository_for(version)
                .and_then(|id| self.registry.find(id))
        });
        Some((coordinate.with_version(version.as_str()), origin))
    }

    /// Fetches and installs `coordinates`, returning the absolute cached path
    /// of the first one or an empty string.
    ///
    /// `repository` restricts the search to one repository id; an unknown id
    /// leaves only the local cache. A range on the first coordinate is
    /// pinned to its highest version and the others follow that version.
    pub async fn fetch(&self, coordinates: &[ArtifactCoordinate], repository: Option<&str>) -> String {
        let Some(primary) = coordinates.first() else {
            return String::new();
        };
        let _guard = self.lock(primary).await;
        let context = self.context();
        let repositories = self.registry.repositories();

        let Some((pinned, preferred)) = self.pin(&context, primary, repository, &repositories).await
        else {
            return String::new();
        };
        let batch: Vec<ArtifactCoordinate> = coordinates
            .iter()
            .map(|c| {
                if c.version() == primary.version() {
                    c.with_version(pinned.version())
                } else {
                    c.clone()
                }
            })
            .collect();

        ArtifactFetcher::new(&context, &repositories)
            .resolve_and_install_batch(&batch, preferred.as_ref())
            .await
    }

    /// Runtime classpath of `coordinate`, without the artifact itself.
    ///
    /// Only `coordinate` is locked. Range queries for its dependencies
    /// invalidate their cached metadata without holding their locks, so a
    /// concurrent call on one of those dependencies may see its stale index
    /// disappear mid-query and fall through to the remote answer.
    pub async fn classpath(
        &self,
        coordinate: &ArtifactCoordinate,
        repository: Option<&str>,
        exclusions: &[Exclusion],
    ) -> Vec<PathBuf> {
        let _guard = self.lock(coordinate).await;
        let context = self.context();
        let repositories = self.registry.repositories();
        let preferred = repository.map(|id| self.registry.resolve_origin(Some(id)));

        let paths = DependencyGraphResolver::new(&context, &repositories)
            .resolve_classpath(coordinate, preferred.as_ref(), exclusions)
            .await;

        paths
            .into_iter()
            .filter_map(|p| self.runtime.absolute(&p).ok())
            .collect()
    }

    /// Probes `descriptor`; empty when it is usable, a diagnostic otherwise.
    pub async fn validate(&self, descriptor: &RepositoryDescriptor) -> String {
        let context = self.context();
        RepositoryValidator::new(&context)
            .validate(&self.registry, descriptor)
            .await
    }
}
