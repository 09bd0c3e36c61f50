//! Transports fetch repository-relative paths from a [`RemoteRepository`].
//!
//! - `http` - `http://` and `https://` repositories, with retries and basic auth
//! - `file` - `file://` repositories on a local or mounted disk
//!
//! [`Connector`] picks the transport from the repository URL scheme.

mod file;
mod http;

pub use file::FileTransport;
pub use http::HttpTransport;

use async_trait::async_trait;

use crate::error::{ResolveError, Result};
use crate::repository::RemoteRepository;

/// Reads one file out of a remote repository.
///
/// A path the repository does not have is reported as
/// [`ResolveError::NotFound`]; anything else that goes wrong is a
/// [`ResolveError::Transport`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, repository: &RemoteRepository, path: &str) -> Result<Vec<u8>>;
}

/// Dispatches to the transport matching the repository URL scheme.
pub struct Connector {
    http: HttpTransport,
    file: FileTransport,
}

impl Connector {
    pub fn new(http: HttpTransport) -> Self {
        Self {
            http,
            file: FileTransport,
        }
    }
}

#[async_trait]
impl Transport for Connector {
    async fn get(&self, repository: &RemoteRepository, path: &str) -> Result<Vec<u8>> {
        let url = repository.url();
        let scheme = url.split_once(':').map(|(s, _)| s.to_ascii_lowercase());
        match scheme.as_deref() {
            Some("http") | Some("https") => self.http.get(repository, path).await,
            Some("file") => self.file.get(repository, path).await,
            _ => Err(ResolveError::Transport {
                repository: repository.id().to_string(),
                message: format!("No transport available for '{}'", url),
                source: None,
            }),
        }
    }
}
