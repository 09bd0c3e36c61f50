//! Fetches single artifacts into the local cache and installs them.

use log::{debug, info, warn};
use std::path::PathBuf;

use super::ResolutionContext;
use crate::cache::{CHECKSUM_SUFFIX, CachedArtifact, parse_checksum, sha1_hex};
use crate::coordinate::ArtifactCoordinate;
use crate::error::{ResolveError, Result};
use crate::listener::ResolutionEvent;
use crate::repository::{LOCAL_REPOSITORY_ID, RemoteRepository};
use crate::runtime::Runtime;
use crate::version::VersionConstraint;

/// An artifact that is now in the local cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub coordinate: ArtifactCoordinate,
    pub path: PathBuf,
    /// Id of the repository it came from, `local` for cache hits.
    pub repository: String,
    /// Digest published next to the payload, already verified.
    pub checksum: Option<String>,
}

pub struct ArtifactFetcher<'a, R: Runtime> {
    context: &'a ResolutionContext<'a, R>,
    repositories: &'a [RemoteRepository],
    use_cache: bool,
}

impl<'a, R: Runtime> ArtifactFetcher<'a, R> {
    pub fn new(context: &'a ResolutionContext<'a, R>, repositories: &'a [RemoteRepository]) -> Self {
        Self {
            context,
            repositories,
            use_cache: true,
        }
    }

    /// Always asks the repositories, even for artifacts already cached.
    pub fn bypass_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    /// Puts `coordinate` into the local cache.
    ///
    /// The cache is checked first. Otherwise repositories are tried in
    /// order, or only `preferred` when given, and the first one that
    /// delivers a payload matching its published checksum wins.
    #[tracing::instrument(skip(self, coordinate, preferred), fields(coordinate = %coordinate))]
    pub async fn resolve(
        &self,
        coordinate: &ArtifactCoordinate,
        preferred: Option<&RemoteRepository>,
    ) -> Result<ResolvedArtifact> {
        coordinate.validate().map_err(|e| ResolveError::Parse {
            what: coordinate.to_string(),
            message: e.to_string(),
        })?;

        if self.use_cache
            && let Some(cached) = self.context.cache.find_artifact(coordinate)
        {
            debug!("{} found in the local cache", coordinate);
            return Ok(ResolvedArtifact {
                coordinate: coordinate.clone(),
                path: cached.local_path,
                repository: LOCAL_REPOSITORY_ID.to_string(),
                checksum: None,
            });
        }

        if !matches!(
            coordinate.version().parse::<VersionConstraint>(),
            Ok(VersionConstraint::Soft(_))
        ) {
            return Err(ResolveError::Parse {
                what: coordinate.to_string(),
                message: "artifacts can only be fetched for a concrete version".to_string(),
            });
        }

        let candidates: Vec<&RemoteRepository> = match preferred {
            Some(repository) => vec![repository],
            None => self.repositories.iter().collect(),
        };

        let mut first_error: Option<ResolveError> = None;
        for repository in candidates.into_iter().filter(|r| !r.is_local()) {
            if coordinate.is_snapshot() && !repository.snapshots_enabled() {
                debug!("{} does not serve snapshots, skipping", repository.id());
                continue;
            }

            match self.download(coordinate, repository).await {
                Ok(artifact) => return Ok(artifact),
                Err(e) if e.is_not_found() => debug!("{}", e),
                Err(e) => {
                    info!("{}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        Err(first_error.unwrap_or_else(|| {
            ResolveError::not_found(coordinate, preferred.map(RemoteRepository::id))
        }))
    }

    async fn download(
        &self,
        coordinate: &ArtifactCoordinate,
        repository: &RemoteRepository,
    ) -> Result<ResolvedArtifact> {
        let path = coordinate.repository_path();
        let payload = match self.context.transport.get(repository, &path).await {
            Ok(payload) => payload,
            Err(e) => {
                self.transfer_failed(repository, &path, &e);
                return Err(if e.is_not_found() {
                    ResolveError::not_found(coordinate, Some(repository.id()))
                } else {
                    e
                });
            }
        };
        self.context.emit(ResolutionEvent::TransferSucceeded {
            repository: repository.id().to_string(),
            path: path.clone(),
        });

        let checksum = self.remote_checksum(repository, &path).await;
        if let Some(expected) = &checksum {
            let actual = sha1_hex(&payload);
            if &actual != expected {
                let error = ResolveError::Checksum {
                    coordinate: coordinate.to_string(),
                    repository: repository.id().to_string(),
                    expected: expected.clone(),
                    actual,
                };
                self.transfer_failed(repository, &path, &error);
                return Err(error);
            }
        }

        let cached = self.context.cache.store_artifact(coordinate, &payload)?;
        self.context.emit(ResolutionEvent::ArtifactResolved {
            coordinate: coordinate.clone(),
            repository: repository.id().to_string(),
        });

        Ok(ResolvedArtifact {
            coordinate: coordinate.clone(),
            path: cached.local_path,
            repository: repository.id().to_string(),
            checksum,
        })
    }

    /// Digest from `<path>.sha1`, if the repository publishes a readable one.
    async fn remote_checksum(&self, repository: &RemoteRepository, path: &str) -> Option<String> {
        let sidecar = format!("{}{}", path, CHECKSUM_SUFFIX);
        match self.context.transport.get(repository, &sidecar).await {
            Ok(bytes) => {
                let digest = parse_checksum(&bytes);
                if digest.is_none() {
                    warn!("Ignoring unreadable checksum {} from {}", sidecar, repository.id());
                }
                digest
            }
            Err(e) => {
                debug!("No checksum for {} from {}: {}", path, repository.id(), e);
                None
            }
        }
    }

    fn transfer_failed(&self, repository: &RemoteRepository, path: &str, error: &ResolveError) {
        self.context.emit(ResolutionEvent::TransferFailed {
            repository: repository.id().to_string(),
            path: path.to_string(),
            message: error.to_string(),
        });
    }

    /// Writes the checksum sidecar next to a resolved artifact.
    pub fn install(&self, artifact: &ResolvedArtifact) -> Result<CachedArtifact> {
        let cached = self
            .context
            .cache
            .find_artifact(&artifact.coordinate)
            .ok_or_else(|| ResolveError::not_found(&artifact.coordinate, Some(LOCAL_REPOSITORY_ID)))?;

        let runtime = self.context.cache.runtime();
        let digest = match &artifact.checksum {
            Some(digest) => Some(digest.clone()),
            None if runtime.exists(&cached.checksum_path) => None,
            None => {
                let payload = runtime
                    .read(&cached.local_path)
                    .map_err(|e| ResolveError::cache_write(&cached.local_path, e))?;
                Some(sha1_hex(&payload))
            }
        };
        if let Some(digest) = digest {
            self.context.cache.write_checksum(&cached, &digest)?;
        }

        self.context.emit(ResolutionEvent::ArtifactInstalled {
            coordinate: artifact.coordinate.clone(),
            path: cached.local_path.clone(),
        });
        Ok(cached)
    }

    /// Resolves every coordinate, installs the ones that resolved, and
    /// returns the absolute cached path of the first coordinate.
    ///
    /// Unresolvable coordinates are logged and skipped. The result is empty
    /// when the first coordinate could not be resolved.
    #[tracing::instrument(skip(self, coordinates, preferred))]
    pub async fn resolve_and_install_batch(
        &self,
        coordinates: &[ArtifactCoordinate],
        preferred: Option<&RemoteRepository>,
    ) -> String {
        let mut resolved = Vec::with_capacity(coordinates.len());
        for coordinate in coordinates {
            match self.resolve(coordinate, preferred).await {
                Ok(artifact) => resolved.push(artifact),
                Err(e) => warn!("Skipping {}: {}", coordinate, e),
            }
        }

        for artifact in &resolved {
            if let Err(e) = self.install(artifact) {
                warn!("Failed to install {}: {}", artifact.coordinate, e);
            }
        }

        let Some(primary) = coordinates.first() else {
            return String::new();
        };
        let Some(cached) = self.context.cache.find_artifact(primary) else {
            info!("{} could not be resolved", primary);
            return String::new();
        };
        match self.context.cache.runtime().absolute(&cached.local_path) {
            Ok(path) => path.to_string_lossy().into_owned(),
            Err(e) => {
                warn!("Failed to make {:?} absolute: {:#}", cached.local_path, e);
                String::new()
            }
        }
    }
}
