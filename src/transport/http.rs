//! HTTP(S) transport on top of the retrying [`HttpClient`].

use async_trait::async_trait;
use log::debug;

use super::Transport;
use crate::error::{ResolveError, Result};
use crate::http::{BasicAuth, HttpClient, NonRetryableError};
use crate::repository::RemoteRepository;

pub struct HttpTransport {
    client: HttpClient,
}

impl HttpTransport {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[tracing::instrument(skip(self, repository), fields(repository = %repository.id()))]
    async fn get(&self, repository: &RemoteRepository, path: &str) -> Result<Vec<u8>> {
        let url = repository.url_for(path);
        let auth = repository.credentials().map(|c| BasicAuth {
            username: &c.username,
            password: &c.password,
        });

        match self.client.get_bytes(&url, auth).await {
            Ok(body) => Ok(body),
            Err(e) if matches!(
                e.downcast_ref::<NonRetryableError>(),
                Some(NonRetryableError::NotFound(_))
            ) =>
            {
                debug!("{} not found in {}", path, repository.id());
                Err(ResolveError::not_found(path, Some(repository.id())))
            }
            Err(e) => Err(ResolveError::transport(
                repository.id(),
                format!("GET {} failed", url),
                e,
            )),
        }
    }
}
