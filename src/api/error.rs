//! Error types for the API client.
//!
//! This module defines structured errors for all CourtListener API operations,
//! providing context-rich error messages for debugging and user feedback.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while talking to the API or persisting artifacts.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The Retry-After header value, if present (for 429 responses).
        retry_after: Option<String>,
    },

    /// The provided URL or path is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The response body could not be parsed as the expected JSON shape.
    #[error("malformed JSON from {url}: {source}")]
    Json {
        /// The URL whose response failed to parse.
        url: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// File system error while writing an artifact.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A retryable request kept failing until the attempt bound was reached.
    #[error("giving up on {url} after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// The URL that kept failing.
        url: String,
        /// Total attempts made (including the initial one).
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        source: Box<ApiError>,
    },
}

impl ApiError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after: None,
        }
    }

    /// Creates an HTTP status error with a Retry-After header value.
    pub fn http_status_with_retry_after(
        url: impl Into<String>,
        status: u16,
        retry_after: Option<String>,
    ) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a JSON parse error.
    pub fn json(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            url: url.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wraps the final attempt's error after the retry bound was reached.
    pub fn retries_exhausted(url: impl Into<String>, attempts: u32, source: ApiError) -> Self {
        Self::RetriesExhausted {
            url: url.into(),
            attempts,
            source: Box::new(source),
        }
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>` impls: every variant
// needs context (url, path) the source errors don't carry, so the helper
// constructors are the conversion points.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let error = ApiError::timeout("https://example.com/search/");
        assert!(error.to_string().contains("timeout"));
        assert!(error.to_string().contains("https://example.com/search/"));
    }

    #[test]
    fn test_http_status_display() {
        let error = ApiError::http_status("https://example.com/opinions/1/", 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(
            msg.contains("https://example.com/opinions/1/"),
            "Expected URL in: {msg}"
        );
    }

    #[test]
    fn test_io_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = ApiError::io(PathBuf::from("/tmp/12345.json"), io_error);
        let msg = error.to_string();
        assert!(msg.contains("/tmp/12345.json"), "Expected path in: {msg}");
    }

    #[test]
    fn test_invalid_url_display() {
        let error = ApiError::invalid_url("not a url");
        let msg = error.to_string();
        assert!(msg.contains("invalid URL"), "Expected 'invalid URL' in: {msg}");
    }

    #[test]
    fn test_retries_exhausted_display_includes_attempts_and_cause() {
        let inner = ApiError::http_status("https://example.com/search/", 503);
        let error = ApiError::retries_exhausted("https://example.com/search/", 3, inner);
        let msg = error.to_string();
        assert!(msg.contains("3 attempts"), "Expected attempt count in: {msg}");
        assert!(msg.contains("503"), "Expected final status in: {msg}");
    }
}
