//! Execution engine module
//!
//! Runs one harvest job end to end: resume, collect, checkpoint.
//!
//! # Overview
//!
//! The engine module provides:
//! - `Harvester` - Owns the executor and checkpoint store for one logical query
//! - `HarvestJob` - What to fetch and how to label checkpoints
//! - `HarvestReport` - Items, stats and the final checkpoint path
//! - `PeriodicCheckpoint` - Page observer that saves every N items

mod observer;
mod types;

pub use observer::PeriodicCheckpoint;
pub use types::{HarvestJob, HarvestReport, DEFAULT_LABEL};

use crate::config::HarvestConfig;
use crate::error::{Error, Result};
use crate::http::RequestExecutor;
use crate::pagination::{CollectError, Paginator};
use crate::state::CheckpointStore;
use crate::stats::RunStats;
use crate::types::{value_at_path, JsonValue, Record};
use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Harvester for a single logical query.
///
/// Engines share nothing; run several independently if needed.
#[derive(Debug)]
pub struct Harvester {
    config: HarvestConfig,
    executor: RequestExecutor,
    store: CheckpointStore,
}

impl Harvester {
    /// Validate the config and build the executor and checkpoint store
    pub fn new(config: HarvestConfig) -> Result<Self> {
        config.validate()?;
        let executor = RequestExecutor::new(&config)?;
        let store = CheckpointStore::new(&config.checkpoint);

        if !config.is_authenticated() {
            warn!("No API token configured; unauthenticated requests are throttled more aggressively");
        }

        Ok(Self {
            config,
            executor,
            store,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Get the request executor
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Get the checkpoint store
    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Snapshot of the request counters
    pub fn stats(&self) -> RunStats {
        self.executor.stats()
    }

    fn paginator(&self, label: &str, already_collected: usize) -> Paginator<'_> {
        let paginator = Paginator::new(&self.executor, self.config.page.clone());
        match self.config.checkpoint.every {
            Some(every) => paginator.with_observer(Arc::new(PeriodicCheckpoint::new(
                self.store.clone(),
                Arc::clone(self.executor.tracker()),
                every,
                format!("checkpoint_{label}"),
                already_collected,
            ))),
            None => paginator,
        }
    }

    /// Collect items without resume or final checkpointing.
    ///
    /// Periodic checkpoints still apply when configured.
    pub async fn collect(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        max_results: Option<usize>,
    ) -> std::result::Result<Vec<Record>, CollectError> {
        self.paginator(DEFAULT_LABEL, 0)
            .collect(endpoint, params, max_results)
            .await
    }

    /// Fetch a single resource through the same executor
    pub async fn get(&self, path: &str) -> Result<JsonValue> {
        self.executor.execute_json(path, None).await
    }

    /// Run a job to completion
    pub async fn run(&self, job: &HarvestJob) -> Result<HarvestReport> {
        self.run_until(job, std::future::pending::<()>()).await
    }

    /// Run a job until it completes, fails, or `shutdown` resolves.
    ///
    /// On failure or shutdown whatever was collected is saved as
    /// `partial_<label>` and reported through [`Error::Interrupted`].
    pub async fn run_until<F>(&self, job: &HarvestJob, shutdown: F) -> Result<HarvestReport>
    where
        F: Future<Output = ()>,
    {
        let started = Instant::now();

        let mut items = match &job.resume_from {
            Some(path) => self.store.load(path).await,
            None => Vec::new(),
        };
        let resumed = items.len();
        if resumed > 0 {
            info!("Resuming with {resumed} results from checkpoint");
        }

        let outcome = {
            let paginator = self.paginator(&job.label, resumed);
            let collect =
                paginator.collect_into(&job.endpoint, &job.params, job.max_results, &mut items);
            tokio::select! {
                result = collect => result,
                () = shutdown => {
                    warn!("Shutdown requested, stopping harvest");
                    Err(Error::Cancelled)
                }
            }
        };

        let duplicates = match job.dedup_key.as_deref() {
            Some(key) => drop_resumed_duplicates(&mut items, resumed, key),
            None => 0,
        };
        if duplicates > 0 {
            info!("Dropped {duplicates} results already present in the checkpoint");
        }

        let stats = self.executor.stats();

        match outcome {
            Ok(pages) => {
                let checkpoint = self
                    .save_quietly(&items, &stats, &format!("final_{}", job.label))
                    .await;

                info!(
                    "Harvest complete: {} results ({} new) in {:.1}s",
                    items.len(),
                    items.len() - resumed,
                    started.elapsed().as_secs_f64()
                );

                Ok(HarvestReport {
                    items,
                    stats,
                    checkpoint,
                    resumed,
                    duplicates,
                    pages,
                    elapsed: started.elapsed(),
                })
            }
            Err(source) => {
                error!("Harvest stopped: {source}");
                let checkpoint = self
                    .save_quietly(&items, &stats, &format!("partial_{}", job.label))
                    .await;
                if let Some(path) = &checkpoint {
                    info!("Resume with the checkpoint at {}", path.display());
                }

                Err(Error::Interrupted {
                    collected: items.len(),
                    checkpoint: checkpoint.map(|p| p.display().to_string()),
                    source: Box::new(source),
                })
            }
        }
    }

    /// Save unless there is nothing to save; failures are logged
    async fn save_quietly(
        &self,
        items: &[Record],
        stats: &RunStats,
        label: &str,
    ) -> Option<PathBuf> {
        if items.is_empty() {
            return None;
        }
        match self.store.save(items, stats, label).await {
            Ok(path) => Some(path),
            Err(e) => {
                error!("Failed to save checkpoint '{label}': {e}");
                None
            }
        }
    }
}

/// Remove items after `resumed` whose `key` value appears in the first
/// `resumed` items. Items without the key are kept.
fn drop_resumed_duplicates(items: &mut Vec<Record>, resumed: usize, key: &str) -> usize {
    if resumed == 0 || items.len() <= resumed {
        return 0;
    }

    let seen: HashSet<String> = items[..resumed]
        .iter()
        .filter_map(|item| value_at_path(item, key))
        .map(JsonValue::to_string)
        .collect();

    let fresh = items.split_off(resumed);
    let before = fresh.len();
    items.extend(fresh.into_iter().filter(|item| {
        value_at_path(item, key).map_or(true, |value| !seen.contains(&value.to_string()))
    }));
    before - (items.len() - resumed)
}
