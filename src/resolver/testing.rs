//! On-disk fake repositories for resolver tests.

use std::path::PathBuf;
use tempfile::TempDir;

use super::ResolutionContext;
use crate::cache::{LocalCache, sha1_hex};
use crate::coordinate::ArtifactCoordinate;
use crate::listener::RecordingListener;
use crate::repository::{RemoteRepository, RepositoryDescriptor};
use crate::runtime::RealRuntime;
use crate::transport::FileTransport;

/// A `file://` repository in a temporary directory.
pub(crate) struct FakeRepository {
    dir: TempDir,
    id: String,
}

impl FakeRepository {
    pub fn new(id: &str) -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            id: id.to_string(),
        }
    }

    pub fn descriptor(&self) -> RepositoryDescriptor {
        let url = reqwest::Url::from_directory_path(self.dir.path()).unwrap();
        RepositoryDescriptor::new(&self.id, url.as_str())
    }

    pub fn repository(&self) -> RemoteRepository {
        RemoteRepository::new(&self.descriptor(), true)
    }

    fn write(&self, path: &str, contents: &[u8]) -> PathBuf {
        let file = self.dir.path().join(path);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, contents).unwrap();
        file
    }

    pub fn publish_versions(&self, group: &str, name: &str, versions: &[&str]) {
        let listed: String = versions
            .iter()
            .map(|v| format!("<version>{}</version>", v))
            .collect();
        let xml = format!(
            "<metadata><groupId>{}</groupId><artifactId>{}</artifactId>\
             <versioning><versions>{}</versions></versioning></metadata>",
            group, name, listed
        );
        let path = format!("{}/{}/maven-metadata.xml", group.replace('.', "/"), name);
        self.write(&path, xml.as_bytes());
    }

    /// Publishes the payload and a matching `.sha1` sidecar.
    pub fn publish(&self, coordinate: &ArtifactCoordinate, payload: &[u8]) {
        self.publish_without_checksum(coordinate, payload);
        self.write(
            &format!("{}.sha1", coordinate.repository_path()),
            sha1_hex(payload).as_bytes(),
        );
    }

    pub fn publish_without_checksum(&self, coordinate: &ArtifactCoordinate, payload: &[u8]) {
        self.write(&coordinate.repository_path(), payload);
    }

    pub fn publish_with_checksum(&self, coordinate: &ArtifactCoordinate, payload: &[u8], digest: &str) {
        self.publish_without_checksum(coordinate, payload);
        self.write(&format!("{}.sha1", coordinate.repository_path()), digest.as_bytes());
    }

    /// Publishes a jar and a POM whose `<dependencies>` block is `dependencies`.
    pub fn publish_module(&self, coordinate: &ArtifactCoordinate, dependencies: &str) {
        let pom = format!(
            "<project><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version>\
             <dependencies>{}</dependencies></project>",
            coordinate.group(),
            coordinate.name(),
            coordinate.version(),
            dependencies
        );
        self.publish(&coordinate.pom(), pom.as_bytes());
        self.publish(coordinate, format!("jar of {}", coordinate).as_bytes());
    }
}

/// `<dependency>` element for [`FakeRepository::publish_module`].
pub(crate) fn dependency(coordinate: &str, extra: &str) -> String {
    let c: ArtifactCoordinate = coordinate.parse().unwrap();
    format!(
        "<dependency><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version>{}</dependency>",
        c.group(),
        c.name(),
        c.version(),
        extra
    )
}

/// Local cache, transport and listener for one test.
pub(crate) struct Fixture {
    pub runtime: RealRuntime,
    pub cache_dir: TempDir,
    pub transport: FileTransport,
    pub listener: RecordingListener,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            runtime: RealRuntime,
            cache_dir: tempfile::tempdir().unwrap(),
            transport: FileTransport,
            listener: RecordingListener::new(),
        }
    }

    pub fn context(&self) -> ResolutionContext<'_, RealRuntime> {
        ResolutionContext::new(
            LocalCache::new(&self.runtime, self.cache_dir.path().to_path_buf()),
            &self.transport,
            &self.listener,
        )
    }

    pub fn cache_path(&self, relative: &str) -> PathBuf {
        self.cache_dir.path().join(relative)
    }
}
