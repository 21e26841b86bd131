//! Authenticated HTTP client for the CourtListener REST API.
//!
//! This module provides the `ApiClient` struct through which every request in
//! the crate is funneled: it attaches the API token, applies the retry policy
//! to transient failures, and records one metrics update per attempt so the
//! final accounting reflects the true number of calls made.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use serde::de::DeserializeOwned;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::error::ApiError;
use super::metrics::MetricsRecorder;
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_error, parse_retry_after};
use crate::config::Config;

/// Default HTTP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default HTTP read timeout (60 seconds; covers opinion PDF bodies).
pub const READ_TIMEOUT_SECS: u64 = 60;

/// HTTP client for the fixed CourtListener API surface.
///
/// Designed to be created once and cloned into each component; clones share
/// the underlying connection pool and the metrics recorder.
///
/// # Example
///
/// ```no_run
/// use casefetch_core::api::{ApiClient, RetryPolicy};
/// use casefetch_core::config::Config;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::from_env()?;
/// let client = ApiClient::new(&config, RetryPolicy::default());
/// let response = client.get("/search/", &[("q", "habeas".to_string())]).await?;
/// println!("{} bytes in {:?}", response.bytes, response.elapsed);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
    retry_policy: RetryPolicy,
    metrics: Arc<MetricsRecorder>,
}

/// A buffered API response with its transfer accounting.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    url: String,
    /// HTTP status code of the final (successful) attempt.
    pub status: u16,
    body: Vec<u8>,
    /// Response body size in bytes.
    pub bytes: u64,
    /// Wall-clock time of the successful attempt.
    pub elapsed: Duration,
}

impl ApiResponse {
    /// Returns the raw response body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Deserializes the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Json`] if the body does not match the expected shape.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| ApiError::json(&self.url, e))
    }
}

impl ApiClient {
    /// Creates a new API client with default timeouts.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(config: &Config, retry_policy: RetryPolicy) -> Self {
        Self::with_timeouts(config, retry_policy, CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new API client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_timeouts(
        config: &Config,
        retry_policy: RetryPolicy,
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(default_user_agent())
            .build()
            .expect("failed to build HTTP client with static configuration");

        Self {
            client,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            token: config.token().to_string(),
            retry_policy,
            metrics: Arc::new(MetricsRecorder::new()),
        }
    }

    /// Returns the shared metrics recorder.
    #[must_use]
    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// Issues a GET request, retrying transient failures up to the policy bound.
    ///
    /// `path_or_url` is either an API path joined onto the configured base URL
    /// or an absolute `http(s)://` URL (pagination cursors come back absolute).
    /// Each attempt records one metrics update, success or failure.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on permanent failures immediately, and
    /// [`ApiError::RetriesExhausted`] when a retryable failure outlasts the
    /// attempt bound.
    #[instrument(skip(self, params), fields(path = %path_or_url))]
    pub async fn get(
        &self,
        path_or_url: &str,
        params: &[(&str, String)],
    ) -> Result<ApiResponse, ApiError> {
        let url = self.resolve_url(path_or_url)?;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(attempt, url = %url, "sending request");

            match self.attempt_get(&url, params).await {
                Ok(response) => return Ok(response),
                Err(error) => match self.next_retry_delay(&url, &error, attempt) {
                    Some(delay) => tokio::time::sleep(delay).await,
                    None => return Err(give_up(url.as_str(), attempt, error)),
                },
            }
        }
    }

    /// Downloads a binary body (an opinion or docket PDF) to `dest`, streaming
    /// chunks to disk. Retries transient failures like [`get`](Self::get); a
    /// failed attempt removes any partial file before retrying or giving up.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on permanent failures, retry exhaustion, or when
    /// writing to `dest` fails.
    #[instrument(skip(self), fields(path = %path_or_url, dest = %dest.display()))]
    pub async fn download_file(&self, path_or_url: &str, dest: &Path) -> Result<u64, ApiError> {
        let url = self.resolve_url(path_or_url)?;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(attempt, url = %url, "starting download");

            match self.attempt_download(&url, dest).await {
                Ok(bytes) => return Ok(bytes),
                Err(error) => match self.next_retry_delay(&url, &error, attempt) {
                    Some(delay) => tokio::time::sleep(delay).await,
                    None => return Err(give_up(url.as_str(), attempt, error)),
                },
            }
        }
    }

    /// One buffered GET attempt with its metrics update.
    async fn attempt_get(
        &self,
        url: &Url,
        params: &[(&str, String)],
    ) -> Result<ApiResponse, ApiError> {
        let started = Instant::now();
        let result = self.fetch_body(url, params).await;
        let elapsed = started.elapsed();

        match result {
            Ok((status, body)) => {
                let bytes = body.len() as u64;
                self.metrics.record(bytes, elapsed);
                Ok(ApiResponse {
                    url: url.to_string(),
                    status,
                    body,
                    bytes,
                    elapsed,
                })
            }
            Err(error) => {
                self.metrics.record(0, elapsed);
                Err(error)
            }
        }
    }

    /// One streaming download attempt with its metrics update. Partial output
    /// is removed on failure so a retry starts from a clean slate.
    async fn attempt_download(&self, url: &Url, dest: &Path) -> Result<u64, ApiError> {
        let started = Instant::now();
        let result = self.stream_to_file(url, dest).await;
        let elapsed = started.elapsed();

        match result {
            Ok(bytes) => {
                self.metrics.record(bytes, elapsed);
                Ok(bytes)
            }
            Err(error) => {
                self.metrics.record(0, elapsed);
                debug!(path = %dest.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(dest).await;
                Err(error)
            }
        }
    }

    async fn fetch_body(
        &self,
        url: &Url,
        params: &[(&str, String)],
    ) -> Result<(u16, Vec<u8>), ApiError> {
        let response = self.send_checked(url, params).await?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| body_error(url.as_str(), e))?;
        Ok((status, body.to_vec()))
    }

    async fn stream_to_file(&self, url: &Url, dest: &Path) -> Result<u64, ApiError> {
        let response = self.send_checked(url, &[]).await?;

        let file = File::create(dest)
            .await
            .map_err(|e| ApiError::io(dest, e))?;
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();
        let mut bytes_written: u64 = 0;

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| body_error(url.as_str(), e))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| ApiError::io(dest, e))?;
            bytes_written += chunk.len() as u64;
        }

        writer.flush().await.map_err(|e| ApiError::io(dest, e))?;
        Ok(bytes_written)
    }

    /// Sends an authenticated GET and converts failures into [`ApiError`].
    async fn send_checked(
        &self,
        url: &Url,
        params: &[(&str, String)],
    ) -> Result<reqwest::Response, ApiError> {
        let mut request = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, format!("Token {}", self.token));
        if !params.is_empty() {
            request = request.query(params);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::timeout(url.as_str())
            } else {
                ApiError::network(url.as_str(), e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(std::string::ToString::to_string);
            return Err(ApiError::http_status_with_retry_after(
                url.as_str(),
                status.as_u16(),
                retry_after,
            ));
        }

        Ok(response)
    }

    /// Decides whether a failed attempt is retried, and after how long.
    ///
    /// A server-supplied Retry-After delay takes precedence over the backoff
    /// schedule on rate-limited responses.
    fn next_retry_delay(&self, url: &Url, error: &ApiError, attempt: u32) -> Option<Duration> {
        let failure_type = classify_error(error);
        let retry_after = (failure_type == FailureType::RateLimited)
            .then(|| retry_after_delay(error))
            .flatten();

        match self.retry_policy.should_retry(failure_type, attempt) {
            RetryDecision::Retry {
                delay: backoff_delay,
                attempt: next_attempt,
            } => {
                let delay = retry_after.unwrap_or(backoff_delay);
                info!(
                    url = %url,
                    attempt = next_attempt,
                    max_attempts = self.retry_policy.max_attempts(),
                    delay_ms = delay.as_millis(),
                    using_retry_after = retry_after.is_some(),
                    error = %error,
                    "retrying request"
                );
                Some(delay)
            }
            RetryDecision::DoNotRetry { reason } => {
                debug!(url = %url, %reason, "not retrying request");
                None
            }
        }
    }

    /// Resolves an API path against the base URL; absolute URLs pass through.
    fn resolve_url(&self, path_or_url: &str) -> Result<Url, ApiError> {
        let full = if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            format!("{}{}", self.base_url, path_or_url)
        };
        Url::parse(&full).map_err(|_| ApiError::invalid_url(full))
    }
}

/// Maps a body-read failure, distinguishing timeouts from other network errors.
fn body_error(url: &str, error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::timeout(url)
    } else {
        ApiError::network(url, error)
    }
}

/// Extracts the parsed Retry-After delay from a rate-limited error, if any.
fn retry_after_delay(error: &ApiError) -> Option<Duration> {
    match error {
        ApiError::HttpStatus {
            retry_after: Some(value),
            ..
        } => parse_retry_after(value),
        _ => None,
    }
}

/// Final error for a request that will not be retried further: permanent
/// failures surface as-is, exhausted retryable failures are wrapped with the
/// attempt count.
fn give_up(url: &str, attempts: u32, error: ApiError) -> ApiError {
    if classify_error(&error) == FailureType::Permanent {
        error
    } else {
        ApiError::retries_exhausted(url, attempts, error)
    }
}

fn default_user_agent() -> String {
    format!("casefetch/{} (court-records-tool)", env!("CARGO_PKG_VERSION"))
}
