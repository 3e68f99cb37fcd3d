//! Engine types
//!
//! Job description and run report for the harvester.

use crate::stats::RunStats;
use crate::types::{QueryParams, Record};
use std::path::PathBuf;
use std::time::Duration;

/// Default label for checkpoints written by a job
pub const DEFAULT_LABEL: &str = "harvest";

/// One logical query: where to start, how far to go, how to name checkpoints
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestJob {
    /// Endpoint of the first page (relative to the base URL, or absolute)
    pub endpoint: String,
    /// Query parameters for the first request only
    pub params: QueryParams,
    /// Stop once this many new items have been collected
    pub max_results: Option<usize>,
    /// Checkpoint label; final and partial saves are prefixed
    pub label: String,
    /// Checkpoint to resume from
    pub resume_from: Option<PathBuf>,
    /// Drop new items whose value at this path already appeared among the
    /// resumed ones
    pub dedup_key: Option<String>,
}

impl HarvestJob {
    /// Create a job for an endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: Vec::new(),
            max_results: None,
            label: DEFAULT_LABEL.to_string(),
            resume_from: None,
            dedup_key: None,
        }
    }

    /// Replace the query parameters
    #[must_use]
    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    /// Append one query parameter
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Limit the number of new items
    #[must_use]
    pub fn with_max_results(mut self, max: Option<usize>) -> Self {
        self.max_results = max;
        self
    }

    /// Set the checkpoint label
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Resume from a checkpoint file
    #[must_use]
    pub fn resume_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.resume_from = Some(path.into());
        self
    }

    /// Enable dedup against resumed items
    #[must_use]
    pub fn with_dedup_key(mut self, key: impl Into<String>) -> Self {
        self.dedup_key = Some(key.into());
        self
    }
}

/// Outcome of a completed harvest
#[derive(Debug, Clone)]
pub struct HarvestReport {
    /// Resumed items followed by new ones, in collection order
    pub items: Vec<Record>,
    /// Request counters for this run
    pub stats: RunStats,
    /// Final checkpoint, if one was written
    pub checkpoint: Option<PathBuf>,
    /// Items carried over from the resume checkpoint
    pub resumed: usize,
    /// Items dropped by dedup
    pub duplicates: usize,
    /// Pages fetched
    pub pages: usize,
    /// Wall-clock duration
    pub elapsed: Duration,
}

impl HarvestReport {
    /// Total item count
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing was collected
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items collected by this run
    pub fn fresh(&self) -> usize {
        self.items.len().saturating_sub(self.resumed)
    }
}
