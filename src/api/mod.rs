//! Authenticated access to the CourtListener API.
//!
//! Every HTTP request in the crate goes through [`ApiClient`], which attaches
//! the API token, retries transient failures per [`RetryPolicy`], and records
//! per-attempt accounting in [`MetricsRecorder`].

mod client;
mod error;
mod metrics;
mod retry;

pub use client::{ApiClient, ApiResponse, CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use error::ApiError;
pub use metrics::{MetricsRecorder, MetricsSnapshot};
pub use retry::{
    DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_error,
    parse_retry_after,
};
