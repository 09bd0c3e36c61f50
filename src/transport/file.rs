//! Transport for `file://` repositories.

use async_trait::async_trait;
use std::io::ErrorKind;

use super::Transport;
use crate::error::{ResolveError, Result};
use crate::repository::RemoteRepository;

#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransport;

#[async_trait]
impl Transport for FileTransport {
    #[tracing::instrument(skip(self, repository), fields(repository = %repository.id()))]
    async fn get(&self, repository: &RemoteRepository, path: &str) -> Result<Vec<u8>> {
        let url = repository.url_for(path);
        let file = reqwest::Url::parse(&url)
            .ok()
            .and_then(|u| u.to_file_path().ok())
            .ok_or_else(|| ResolveError::Transport {
                repository: repository.id().to_string(),
                message: format!("'{}' is not a usable file URL", url),
                source: None,
            })?;

        match tokio::fs::read(&file).await {
            Ok(body) => Ok(body),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ResolveError::not_found(path, Some(repository.id())))
            }
            Err(e) => Err(ResolveError::transport(
                repository.id(),
                format!("Failed to read {:?}", file),
                e,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryDescriptor;

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let url = reqwest::Url::from_directory_path(dir.path()).unwrap();
        let repo = RemoteRepository::new(&RepositoryDescriptor::new("disk", url.as_str()), true);

        let err = FileTransport.get(&repo, "g/a/1.0/a-1.0.jar").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_malformed_url() {
        let repo = RemoteRepository::new(&RepositoryDescriptor::new("disk", "file://host:bad"), true);
        let err = FileTransport.get(&repo, "x").await.unwrap_err();
        assert!(matches!(err, ResolveError::Transport { .. }));
    }
}
