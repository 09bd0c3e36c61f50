//! Which HTTP failures are worth another attempt.
//!
//! Server errors and broken connections are retried; a 4xx answer will not
//! change on retry and is reported as a [`NonRetryableError`].

use reqwest::StatusCode;
use std::time::Duration;

pub const MAX_RETRIES: usize = 3;

pub const RETRY_DELAY_MS: u64 = 1000;

/// How often and how patiently a request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            // A request is always attempted at least once
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Single attempt, no delay.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(MAX_RETRIES, Duration::from_millis(RETRY_DELAY_MS))
    }
}

/// A repository answered with a status that retrying will not fix.
///
/// Each variant carries the URL that was requested.
#[derive(Debug)]
pub enum NonRetryableError {
    /// 429
    RateLimitExceeded(String),
    /// 401
    AuthenticationFailed(String),
    /// 404
    NotFound(String),
    /// 403
    Forbidden(String),
    /// Any other 4xx, with its status
    ClientError(String),
}

impl std::fmt::Display for NonRetryableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NonRetryableError::RateLimitExceeded(url) => {
                write!(f, "Rate limit exceeded: {} returned 429. Try again later.", url)
            }
            NonRetryableError::AuthenticationFailed(url) => write!(
                f,
                "Authentication failed: {} returned 401. Check the repository credentials.",
                url
            ),
            NonRetryableError::NotFound(url) => write!(f, "Not found: {}", url),
            NonRetryableError::Forbidden(url) => {
                write!(f, "Access forbidden: {} returned 403.", url)
            }
            NonRetryableError::ClientError(detail) => write!(f, "Request error: {}", detail),
        }
    }
}

impl std::error::Error for NonRetryableError {}

/// `Ok(())` when `error` may go away on retry.
pub fn classify_error(error: &reqwest::Error) -> Result<(), NonRetryableError> {
    let Some(status) = error.status() else {
        // Connect failures and timeouts
        return Ok(());
    };
    let url = error
        .url()
        .map(|u| u.to_string())
        .unwrap_or_else(|| "request".to_string());

    let non_retryable = match status {
        StatusCode::UNAUTHORIZED => NonRetryableError::AuthenticationFailed(url),
        StatusCode::FORBIDDEN => NonRetryableError::Forbidden(url),
        StatusCode::TOO_MANY_REQUESTS => NonRetryableError::RateLimitExceeded(url),
        StatusCode::NOT_FOUND => NonRetryableError::NotFound(url),
        s if s.is_client_error() => {
            NonRetryableError::ClientError(format!("{} returned {}", url, s.as_u16()))
        }
        _ => return Ok(()),
    };
    Err(non_retryable)
}

/// Wraps a status error, as a [`NonRetryableError`] when retrying is pointless.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    match classify_error(&error) {
        Ok(()) => anyhow::Error::from(error),
        Err(non_retryable) => anyhow::Error::from(non_retryable),
    }
}
