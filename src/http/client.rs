//! HTTP client with built-in retry logic and error handling.

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::Client;

use super::retry::{NonRetryableError, RetryPolicy, check_retryable};

/// Username and password sent as HTTP basic authentication.
#[derive(Clone, Copy)]
pub struct BasicAuth<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// HTTP client with built-in retry logic for network operations.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self::with_retry_policy(client, RetryPolicy::default())
    }

    pub fn with_retry_policy(client: Client, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Performs a GET request and returns the whole body.
    /// Automatically retries on transient errors.
    #[tracing::instrument(skip(self, auth))]
    pub async fn get_bytes(&self, url: &str, auth: Option<BasicAuth<'_>>) -> Result<Vec<u8>> {
        debug!("GET {}...", url);

        self.with_retry("GET", || async { self.get_bytes_once(url, auth).await })
            .await
    }

    /// Single GET attempt without retry.
    async fn get_bytes_once(&self, url: &str, auth: Option<BasicAuth<'_>>) -> Result<Vec<u8>> {
        let mut request = self.client.get(url);
        if let Some(auth) = auth {
            request = request.basic_auth(auth.username, Some(auth.password));
        }

        let response = request.send().await.context("Failed to send request")?;
        let mut response = response.error_for_status().map_err(check_retryable)?;

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed to read chunk from response stream")?
        {
            body.extend_from_slice(&chunk);
        }

        debug!("Received {} bytes from {}", body.len(), url);
        Ok(body)
    }

    /// Executes an async operation with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let attempts = self.retry.max_attempts;
        let mut last_error = None;

        for attempt in 1..=attempts {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !is_retryable_error(&e) {
                        debug!("{}: non-retryable error: {}", operation_name, e);
                        return Err(e);
                    }

                    if attempt < attempts {
                        warn!(
                            "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                            operation_name,
                            attempt,
                            attempts,
                            e,
                            self.retry.delay.as_millis()
                        );
                        tokio::time::sleep(self.retry.delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            anyhow::anyhow!("{}: failed after {} attempts", operation_name, attempts)
        }))
    }
}

/// Checks if an anyhow::Error is retryable based on its content.
fn is_retryable_error(e: &anyhow::Error) -> bool {
    e.downcast_ref::<NonRetryableError>().is_none()
}
