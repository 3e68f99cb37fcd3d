// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # pagewise
//!
//! Polite, resumable retrieval of paginated and rate-limited JSON APIs.
//!
//! ## Features
//!
//! - **Pacing**: A minimum spacing between consecutive requests
//! - **Retries**: Exponential backoff with jitter, honouring `Retry-After`
//! - **Pagination**: Follows next-page URLs or cursor tokens in order
//! - **Checkpoints**: Periodic, final and partial JSON checkpoints for resuming
//! - **Statistics**: Per-run request counters
//! - **Export**: JSON or flattened CSV
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pagewise::{HarvestConfig, HarvestJob, Harvester, SearchOptions, SEARCH_ENDPOINT};
//!
//! #[tokio::main]
//! async fn main() -> pagewise::Result<()> {
//!     let config = HarvestConfig::default().with_api_token("...");
//!     let harvester = Harvester::new(config)?;
//!
//!     let options = SearchOptions::new("roman bust").downloadable(true);
//!     let job = HarvestJob::new(SEARCH_ENDPOINT)
//!         .with_params(options.to_params()?)
//!         .with_max_results(Some(200));
//!
//!     let report = harvester.run(&job).await?;
//!     println!("{} results, {}", report.len(), report.stats);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Harvester (engine)                      │
//! │   resume → collect → final / partial checkpoint          │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────┬──────────────┴──────────┬──────────────────┐
//! │  Paginator  │    RequestExecutor      │ CheckpointStore  │
//! ├─────────────┼─────────────────────────┼──────────────────┤
//! │ Next URL    │ RateLimiter (governor)  │ Atomic writes    │
//! │ Cursor      │ Backoff + jitter        │ Lenient resume   │
//! │ Observers   │ StatsTracker            │                  │
//! └─────────────┴─────────────────────────┴──────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Request counters
pub mod stats;

/// Harvester configuration
pub mod config;

/// HTTP executor with pacing, backoff and retries
pub mod http;

/// Continuation-following pagination
pub mod pagination;

/// Checkpoint persistence
pub mod state;

/// Main execution engine
pub mod engine;

/// Model search filters
pub mod search;

/// JSON and CSV export
pub mod output;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{CheckpointConfig, HarvestConfig};
pub use engine::{HarvestJob, HarvestReport, Harvester};
pub use error::{Error, Result};
pub use http::{RequestExecutor, RequestOutcome};
pub use pagination::{ContinuationStyle, PageFormat, Paginator};
pub use search::{SearchOptions, SortOrder, SEARCH_ENDPOINT};
pub use state::{Checkpoint, CheckpointStore};
pub use stats::{RunStats, StatsTracker};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
