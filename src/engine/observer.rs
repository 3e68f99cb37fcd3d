//! Periodic checkpoint observer

use crate::pagination::{PageEvent, PageObserver};
use crate::state::CheckpointStore;
use crate::stats::StatsTracker;
use crate::types::Record;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Saves the accumulator each time its size crosses a multiple of `every`.
///
/// Save failures are logged and do not stop the harvest.
#[derive(Debug)]
pub struct PeriodicCheckpoint {
    store: CheckpointStore,
    stats: Arc<StatsTracker>,
    every: usize,
    label: String,
    last_bucket: AtomicUsize,
}

impl PeriodicCheckpoint {
    /// Create an observer; `already_collected` items do not trigger a save
    pub fn new(
        store: CheckpointStore,
        stats: Arc<StatsTracker>,
        every: usize,
        label: impl Into<String>,
        already_collected: usize,
    ) -> Self {
        let every = every.max(1);
        Self {
            store,
            stats,
            every,
            label: label.into(),
            last_bucket: AtomicUsize::new(already_collected / every),
        }
    }
}

#[async_trait]
impl PageObserver for PeriodicCheckpoint {
    async fn on_page(&self, _event: &PageEvent, collected: &[Record]) {
        let bucket = collected.len() / self.every;
        if bucket <= self.last_bucket.load(Ordering::Relaxed) {
            return;
        }
        self.last_bucket.store(bucket, Ordering::Relaxed);

        let stats = self.stats.snapshot();
        if let Err(e) = self.store.save(collected, &stats, &self.label).await {
            warn!("Periodic checkpoint failed: {e}");
        }
    }
}
