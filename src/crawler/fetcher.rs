//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the mirror, including:
//! - Building HTTP clients with proper user agent strings
//! - Bounded retries with a fixed delay between attempts
//! - Content-Type checks for pages
//! - Error classification

use crate::config::UserAgentConfig;
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by a single fetch attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to read body of {url}: {source}")]
    Body { url: String, source: reqwest::Error },
}

impl FetchError {
    /// Short classification used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request { source, .. } if source.is_timeout() => "timeout",
            Self::Request { source, .. } if source.is_connect() => "connection refused",
            Self::Request { .. } => "request error",
            Self::Status { .. } => "http status",
            Self::Body { .. } => "body read error",
        }
    }
}

/// Retry policy shared by page and resource fetches
///
/// `max_attempts` counts every attempt, the first one included. The delay is
/// only slept between attempts, never after the last one, so a zero delay
/// makes retries instantaneous in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy; at least one attempt is always made
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// A policy with a single attempt and no delay
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Runs `operation` until it succeeds or the attempts are exhausted
    ///
    /// Returns the last error when every attempt failed.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts => {
                    tracing::warn!(
                        "Giving up on {} after {} attempt(s): {}",
                        label,
                        attempt,
                        e
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::debug!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt,
                        self.max_attempts,
                        label,
                        e
                    );
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// A successfully downloaded response body
#[derive(Debug, Clone)]
pub struct FetchedBody {
    /// Final URL after redirects
    pub final_url: String,
    /// Content-Type header value, if any
    pub content_type: Option<String>,
    /// Raw payload
    pub bytes: Vec<u8>,
}

/// Result of fetching a page
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched an HTML page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// Page body decoded as UTF-8 (lossy)
        body: String,
    },

    /// Page is not HTML (Content-Type mismatch)
    ContentMismatch {
        /// The actual Content-Type received
        content_type: String,
    },

    /// Every attempt failed
    Failed {
        /// Description of the last error
        error: String,
    },
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed with reqwest's default policy (at most 10 hops);
/// `timeout` bounds each request and feeds the retry policy.
///
/// # Example
///
/// ```no_run
/// use site_mirror::config::UserAgentConfig;
/// use site_mirror::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.to_string())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Performs a single GET and reads the whole body
///
/// Any non-2xx status is an error.
pub async fn fetch_once(client: &Client, url: &str) -> Result<FetchedBody, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = response.bytes().await.map_err(|source| FetchError::Body {
        url: url.to_string(),
        source,
    })?;

    Ok(FetchedBody {
        final_url,
        content_type,
        bytes: bytes.to_vec(),
    })
}

/// Fetches a URL, retrying according to `policy`
pub async fn fetch_with_retry(
    client: &Client,
    url: &str,
    policy: &RetryPolicy,
) -> Result<FetchedBody, FetchError> {
    policy.run(url, || fetch_once(client, url)).await
}

/// Returns true if the Content-Type denotes an HTML document
///
/// A missing header is treated as HTML, the same way browsers sniff it.
pub fn is_html_content_type(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(ct) => {
            let ct = ct.to_ascii_lowercase();
            ct.contains("text/html") || ct.contains("application/xhtml+xml")
        }
    }
}

/// Fetches a page with retries and classifies the outcome
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | Non-2xx status | Retry, then Failed |
/// | Timeout | Retry, then Failed |
/// | Connection refused | Retry, then Failed |
/// | Not HTML | Immediate → ContentMismatch |
pub async fn fetch_page(client: &Client, url: &str, policy: &RetryPolicy) -> FetchResult {
    match fetch_with_retry(client, url, policy).await {
        Ok(fetched) => {
            if !is_html_content_type(fetched.content_type.as_deref()) {
                return FetchResult::ContentMismatch {
                    content_type: fetched.content_type.unwrap_or_default(),
                };
            }

            FetchResult::Success {
                final_url: fetched.final_url,
                body: String::from_utf8_lossy(&fetched.bytes).into_owned(),
            }
        }
        Err(e) => FetchResult::Failed {
            error: format!("{} ({})", e, e.kind()),
        },
    }
}
