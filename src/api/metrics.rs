//! Request accounting shared by every API call.
//!
//! Every HTTP attempt made through [`ApiClient`](super::ApiClient) records
//! exactly one update here, success or failure, so the final snapshot reflects
//! the true number of requests sent over the wire.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Accumulates call count, bytes transferred, and elapsed wall-clock time.
///
/// Counters only increase; a new run starts a new recorder. Atomic counters
/// keep the type safe to share should the batch loop ever run cases in
/// parallel.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    calls: AtomicU64,
    total_bytes: AtomicU64,
    elapsed_micros: AtomicU64,
}

/// Point-in-time read of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Number of HTTP attempts made (successful or not).
    pub calls: u64,
    /// Cumulative response bytes received.
    pub total_bytes: u64,
    /// Cumulative wall-clock time spent in requests.
    pub total_elapsed: Duration,
}

impl MetricsRecorder {
    /// Creates a recorder with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one HTTP attempt: response size (0 on failure) and elapsed time.
    pub fn record(&self, bytes: u64, elapsed: Duration) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.total_bytes.fetch_add(bytes, Ordering::SeqCst);
        self.elapsed_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::SeqCst);
    }

    /// Returns a point-in-time snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            calls: self.calls.load(Ordering::SeqCst),
            total_bytes: self.total_bytes.load(Ordering::SeqCst),
            total_elapsed: Duration::from_micros(self.elapsed_micros.load(Ordering::SeqCst)),
        }
    }
}
