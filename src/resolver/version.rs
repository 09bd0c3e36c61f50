//! Resolves version ranges against the version index of each repository.

use log::{debug, info, warn};
use std::collections::BTreeMap;

use super::ResolutionContext;
use crate::coordinate::{ArtifactCoordinate, check_component};
use crate::error::{ResolveError, Result};
use crate::listener::ResolutionEvent;
use crate::metadata::{METADATA_FILE, RepositoryMetadata};
use crate::repository::RemoteRepository;
use crate::runtime::Runtime;
use crate::version::{Version, VersionConstraint};

/// Candidate versions of one query and the repository each came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedVersionSet {
    origin: BTreeMap<Version, String>,
    candidates: Vec<Version>,
}

impl ResolvedVersionSet {
    /// Ascending, without duplicates.
    pub fn candidates(&self) -> &[Version] {
        &self.candidates
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Id of the repository that supplied `version`, if it came from one.
    pub fn repository_for(&self, version: &Version) -> Option<&str> {
        self.origin.get(version).map(String::as_str)
    }

    pub fn highest(&self) -> Option<&Version> {
        self.candidates.last()
    }

    /// Highest candidate that is not a snapshot.
    pub fn latest_release(&self) -> Option<&Version> {
        self.candidates.iter().rev().find(|v| !v.is_snapshot())
    }

    fn soft(version: Version) -> Self {
        Self {
            origin: BTreeMap::new(),
            candidates: vec![version],
        }
    }

    fn insert(&mut self, version: Version, repository: &str) {
        // Registry order decides: the first repository listing a version keeps it.
        if !self.origin.contains_key(&version) {
            self.origin.insert(version, repository.to_string());
        }
    }

    fn finish(mut self) -> Self {
        self.candidates = self.origin.keys().cloned().collect();
        self
    }
}

pub struct VersionResolver<'a, R: Runtime> {
    context: &'a ResolutionContext<'a, R>,
}

impl<'a, R: Runtime> VersionResolver<'a, R> {
    pub fn new(context: &'a ResolutionContext<'a, R>) -> Self {
        Self { context }
    }

    /// Every published version of `coordinate` inside its version range.
    ///
    /// Failures are logged and yield an empty set.
    #[tracing::instrument(skip(self, coordinate, repositories), fields(coordinate = %coordinate))]
    pub async fn resolve_version_range(
        &self,
        coordinate: &ArtifactCoordinate,
        repositories: &[RemoteRepository],
    ) -> ResolvedVersionSet {
        match self.query(coordinate, repositories).await {
            Ok(set) => set,
            Err(e) => {
                info!("Failed to resolve versions of {}: {}", coordinate, e);
                ResolvedVersionSet::default()
            }
        }
    }

    /// Highest non-snapshot version in the range, under Maven ordering.
    #[tracing::instrument(skip(self, coordinate, repositories), fields(coordinate = %coordinate))]
    pub async fn resolve_latest_release(
        &self,
        coordinate: &ArtifactCoordinate,
        repositories: &[RemoteRepository],
    ) -> Option<Version> {
        self.resolve_version_range(coordinate, repositories)
            .await
            .latest_release()
            .cloned()
    }

    /// Like [`Self::resolve_version_range`], but reports why nothing was found.
    pub async fn query(
        &self,
        coordinate: &ArtifactCoordinate,
        repositories: &[RemoteRepository],
    ) -> Result<ResolvedVersionSet> {
        let constraint: VersionConstraint = coordinate.version().parse().map_err(
            |e: anyhow::Error| ResolveError::Parse {
                what: coordinate.to_string(),
                message: e.to_string(),
            },
        )?;

        // A plain version is a soft requirement: it resolves to itself.
        if let VersionConstraint::Soft(version) = &constraint {
            return Ok(ResolvedVersionSet::soft(version.clone()));
        }

        let mut set = ResolvedVersionSet::default();
        let mut answered = false;
        let mut first_error = None;

        for repository in repositories.iter().filter(|r| !r.is_local()) {
            let metadata = match self.fetch_metadata(coordinate, repository).await {
                Ok(Some(metadata)) => metadata,
                Ok(None) => {
                    answered = true;
                    continue;
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                    continue;
                }
            };
            answered = true;

            for text in &metadata.versions {
                if let Err(e) = check_component("version", text) {
                    warn!("{} lists an unusable version for {}: {}", repository.id(), coordinate, e);
                    continue;
                }
                let version = Version::new(text.as_str());
                if !repository.accepts(&version) {
                    debug!("{} ignores snapshot {}", repository.id(), version);
                    continue;
                }
                if constraint.contains(&version) {
                    set.insert(version, repository.id());
                }
            }
        }

        if !answered {
            return Err(first_error.unwrap_or_else(|| ResolveError::not_found(coordinate, None)));
        }

        self.invalidate(coordinate, repositories);

        let set = set.finish();
        if set.is_empty() {
            debug!("No published version of {} is in range", coordinate);
        }
        Ok(set)
    }

    /// Index of one repository. `None` if the repository does not know the
    /// artifact; a cached copy stands in when the repository is unreachable.
    async fn fetch_metadata(
        &self,
        coordinate: &ArtifactCoordinate,
        repository: &RemoteRepository,
    ) -> Result<Option<RepositoryMetadata>> {
        let path = format!("{}/{}", coordinate.metadata_dir(), METADATA_FILE);
        let fetched = self.context.transport.get(repository, &path).await;

        let error = match fetched {
            Ok(bytes) => match RepositoryMetadata::from_bytes(&bytes) {
                Ok(metadata) => {
                    self.context.emit(ResolutionEvent::TransferSucceeded {
                        repository: repository.id().to_string(),
                        path,
                    });
                    return Ok(Some(metadata));
                }
                Err(e) => ResolveError::Parse {
                    what: repository.url_for(&path),
                    message: format!("{:#}", e),
                },
            },
            Err(e) if e.is_not_found() => {
                debug!("{} has no {}", repository.id(), path);
                return Ok(None);
            }
            Err(e) => e,
        };

        self.context.emit(ResolutionEvent::TransferFailed {
            repository: repository.id().to_string(),
            path: path.clone(),
            message: error.to_string(),
        });

        let cached = self.context.cache.read_metadata(
            coordinate.group(),
            coordinate.name(),
            repository.id(),
        );
        match cached.map(|bytes| RepositoryMetadata::from_bytes(&bytes)) {
            Some(Ok(metadata)) => {
                warn!(
                    "{}; using the cached version index of {} instead",
                    error,
                    repository.id()
                );
                Ok(Some(metadata))
            }
            _ => Err(error),
        }
    }

    fn invalidate(&self, coordinate: &ArtifactCoordinate, repositories: &[RemoteRepository]) {
        let removed = self.context.cache.invalidate_metadata(
            coordinate.group(),
            coordinate.name(),
            repositories,
        );
        for path in removed {
            self.context
                .emit(ResolutionEvent::MetadataInvalidated { path });
        }
    }
}
