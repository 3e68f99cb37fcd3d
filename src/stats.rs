//! Request outcome counters
//!
//! `StatsTracker` is owned by one engine and bumped by the request executor
//! once per physical HTTP attempt. `RunStats` is the serializable snapshot
//! that ends up in reports and checkpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the request counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Physical HTTP attempts made
    #[serde(default)]
    pub total_requests: u64,
    /// Attempts answered with 2xx and a parseable body
    #[serde(default)]
    pub successful: u64,
    /// Attempts answered with 429
    #[serde(default, alias = "rate_limited")]
    pub throttled: u64,
    /// Everything else: client, server, network and decode failures
    #[serde(default)]
    pub errors: u64,
}

impl RunStats {
    /// Percentage of successful attempts, `None` before the first request
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_requests == 0 {
            None
        } else {
            Some(self.successful as f64 / self.total_requests as f64 * 100.0)
        }
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total requests:    {}", self.total_requests)?;
        writeln!(f, "Successful:        {}", self.successful)?;
        writeln!(f, "Rate limited:      {}", self.throttled)?;
        write!(f, "Errors:            {}", self.errors)?;
        if let Some(rate) = self.success_rate() {
            write!(f, "\nSuccess rate:      {rate:.1}%")?;
        }
        Ok(())
    }
}

/// Monotonic in-process counters
#[derive(Debug, Default)]
pub struct StatsTracker {
    total_requests: AtomicU64,
    successful: AtomicU64,
    throttled: AtomicU64,
    errors: AtomicU64,
}

impl StatsTracker {
    /// Create a tracker with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an attempt that succeeded
    pub fn record_success(&self) {
        self.bump(&self.successful);
    }

    /// Count an attempt that was throttled
    pub fn record_throttled(&self) {
        self.bump(&self.throttled);
    }

    /// Count an attempt that failed for any other reason
    pub fn record_error(&self) {
        self.bump(&self.errors);
    }

    fn bump(&self, outcome: &AtomicU64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        outcome.fetch_add(1, Ordering::Relaxed);
    }

    /// Read the current counters
    pub fn snapshot(&self) -> RunStats {
        RunStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful: self.successful.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_starts_empty() {
        let tracker = StatsTracker::new();
        assert_eq!(tracker.snapshot(), RunStats::default());
        assert_eq!(tracker.snapshot().success_rate(), None);
    }

    #[test]
    fn test_every_outcome_counts_one_request() {
        let tracker = StatsTracker::new();
        tracker.record_success();
        tracker.record_success();
        tracker.record_throttled();
        tracker.record_error();

        let stats = tracker.snapshot();
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.successful, 2);
        assert_eq!(stats.throttled, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(
            stats.total_requests,
            stats.successful + stats.throttled + stats.errors
        );
        assert_eq!(stats.success_rate(), Some(50.0));
    }

    #[test]
    fn test_run_stats_serde_keys() {
        let stats = RunStats {
            total_requests: 3,
            successful: 2,
            throttled: 1,
            errors: 0,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["total_requests"], 3);
        assert_eq!(json["throttled"], 1);

        // older checkpoints used "rate_limited"
        let legacy: RunStats = serde_json::from_str(
            r#"{"total_requests": 5, "rate_limited": 2, "errors": 1, "successful": 2}"#,
        )
        .unwrap();
        assert_eq!(legacy.throttled, 2);
    }

    #[test]
    fn test_run_stats_display() {
        let stats = RunStats {
            total_requests: 4,
            successful: 3,
            throttled: 1,
            errors: 0,
        };
        let text = stats.to_string();
        assert!(text.contains("Total requests:    4"));
        assert!(text.contains("Rate limited:      1"));
        assert!(text.contains("Success rate:      75.0%"));
    }
}
