//! On-disk layout of the local repository.
//!
//! ```text
//! <root>/<group path>/<name>/maven-metadata-<repo id>.xml[.sha1]
//! <root>/<group path>/<name>/<version>/<name>-<version>[-<classifier>].<ext>[.sha1]
//! ```

use anyhow::Context;
use log::{debug, warn};
use std::path::{Component, Path, PathBuf};

use super::CHECKSUM_SUFFIX;
use crate::coordinate::ArtifactCoordinate;
use crate::error::{ResolveError, Result};
use crate::repository::RemoteRepository;
use crate::runtime::Runtime;

/// An artifact present in the local repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtifact {
    pub coordinate: ArtifactCoordinate,
    pub local_path: PathBuf,
    pub checksum_path: PathBuf,
}

pub struct LocalCache<'a, R: Runtime> {
    runtime: &'a R,
    root: PathBuf,
}

impl<'a, R: Runtime> LocalCache<'a, R> {
    pub fn new(runtime: &'a R, root: PathBuf) -> Self {
        Self { runtime, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn runtime(&self) -> &'a R {
        self.runtime
    }

    /// Every segment must be a plain name, so the result stays under the root.
    fn join(&self, repository_path: &str) -> Result<PathBuf> {
        let mut path = self.root.clone();
        for segment in repository_path.split('/').filter(|s| !s.is_empty()) {
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(name)), None) if name == segment => path.push(name),
                _ => {
                    return Err(ResolveError::Parse {
                        what: repository_path.to_string(),
                        message: format!("'{}' would leave the local repository", segment),
                    });
                }
            }
        }
        Ok(path)
    }

    /// Returns: `<root>/<group path>/<name>/<version>/<file name>`
    pub fn artifact_path(&self, coordinate: &ArtifactCoordinate) -> Result<PathBuf> {
        self.join(&coordinate.repository_path())
    }

    /// Returns: `<root>/<group path>/<name>/maven-metadata-<repo id>.xml`
    pub fn metadata_path(&self, group: &str, name: &str, repository_id: &str) -> Result<PathBuf> {
        self.join(&format!(
            "{}/{}/maven-metadata-{}.xml",
            group.replace('.', "/"),
            name,
            repository_id
        ))
    }

    /// The coordinate stored at `path`, if `path` is an artifact location of
    /// this cache.
    pub fn coordinate_of(&self, path: &Path) -> Option<ArtifactCoordinate> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect::<Option<_>>()?;
        let [group @ .., name, version, file] = parts.as_slice() else {
            return None;
        };
        if group.is_empty() {
            return None;
        }

        let rest = file.strip_prefix(&format!("{}-{}", name, version))?;
        let (classifier, extension) = match rest.strip_prefix('-') {
            Some(tail) => {
                let (classifier, extension) = tail.rsplit_once('.')?;
                (Some(classifier), extension)
            }
            None => (None, rest.strip_prefix('.')?),
        };

        let coordinate = ArtifactCoordinate::new(group.join("."), *name, *version)
            .with_extension(extension)
            .with_classifier(classifier);
        coordinate.validate().ok()?;
        (self.artifact_path(&coordinate).ok()?.as_path() == path).then_some(coordinate)
    }

    /// `<path>.sha1`
    pub fn checksum_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(CHECKSUM_SUFFIX);
        PathBuf::from(name)
    }

    /// Deletes the cached version index of `group:name` for each repository,
    /// together with its checksum sidecar.
    ///
    /// Failures are logged and skipped; calling this again is a no-op.
    /// Returns the index files that were removed.
    #[tracing::instrument(skip(self, repositories))]
    pub fn invalidate_metadata(
        &self,
        group: &str,
        name: &str,
        repositories: &[RemoteRepository],
    ) -> Vec<PathBuf> {
        let mut removed = Vec::new();

        for repository in repositories {
            let metadata = match self.metadata_path(group, name, repository.id()) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("Not invalidating metadata: {}", e);
                    continue;
                }
            };
            if !self.runtime.exists(&metadata) {
                continue;
            }

            match self.runtime.remove_file(&metadata) {
                Ok(()) => {
                    debug!("Removed stale metadata {:?}", metadata);
                    removed.push(metadata.clone());
                }
                Err(e) => {
                    warn!("Failed to remove stale metadata {:?}: {:#}", metadata, e);
                    continue;
                }
            }

            let sidecar = Self::checksum_path(&metadata);
            if !self.runtime.exists(&sidecar) {
                debug!("No checksum sidecar next to {:?}", metadata);
                continue;
            }
            if let Err(e) = self.runtime.remove_file(&sidecar) {
                warn!("Failed to remove checksum sidecar {:?}: {:#}", sidecar, e);
            }
        }

        removed
    }

    /// Writes `payload` to the location of `coordinate`, replacing whatever
    /// is there through a temporary file and a rename.
    #[tracing::instrument(skip(self, coordinate, payload), fields(coordinate = %coordinate))]
    pub fn store_artifact(
        &self,
        coordinate: &ArtifactCoordinate,
        payload: &[u8],
    ) -> Result<CachedArtifact> {
        let path = self.artifact_path(coordinate)?;
        self.write_atomic(&path, payload)?;
        debug!("Stored {} at {:?}", coordinate, path);

        Ok(CachedArtifact {
            coordinate: coordinate.clone(),
            checksum_path: Self::checksum_path(&path),
            local_path: path,
        })
    }

    /// Writes the checksum sidecar of an artifact stored in this cache.
    pub fn write_checksum(&self, artifact: &CachedArtifact, digest: &str) -> Result<()> {
        self.write_atomic(&artifact.checksum_path, digest.as_bytes())
    }

    /// Local lookup only; never goes to the network.
    pub fn find_artifact(&self, coordinate: &ArtifactCoordinate) -> Option<CachedArtifact> {
        let path = self.artifact_path(coordinate).ok()?;
        if !self.runtime.is_file(&path) {
            return None;
        }
        Some(CachedArtifact {
            coordinate: coordinate.clone(),
            checksum_path: Self::checksum_path(&path),
            local_path: path,
        })
    }

    /// Contents of a cached artifact, if present and readable.
    pub fn read_artifact(&self, coordinate: &ArtifactCoordinate) -> Option<Vec<u8>> {
        let cached = self.find_artifact(coordinate)?;
        match self.runtime.read(&cached.local_path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Failed to read cached {}: {:#}", coordinate, e);
                None
            }
        }
    }

    /// The cached version index of `group:name` for one repository.
    pub fn read_metadata(&self, group: &str, name: &str, repository_id: &str) -> Option<Vec<u8>> {
        let path = self.metadata_path(group, name, repository_id).ok()?;
        if !self.runtime.is_file(&path) {
            return None;
        }
        self.runtime.read(&path).ok()
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let write = || -> anyhow::Result<()> {
            if let Some(parent) = path.parent()
                && !self.runtime.exists(parent)
            {
                self.runtime.create_dir_all(parent)?;
            }

            let mut temp = path.as_os_str().to_owned();
            temp.push(".part");
            let temp = PathBuf::from(temp);

            self.runtime.write(&temp, contents)?;
            self.runtime
                .rename(&temp, path)
                .with_context(|| format!("Failed to move {:?} into place", temp))
        };
        write().map_err(|e| ResolveError::cache_write(path, e))
    }
}
