//! Checkpoint module
//!
//! Persists collected items together with the run statistics so an
//! interrupted harvest can be resumed.
//!
//! # Overview
//!
//! The checkpoint module provides:
//! - `Checkpoint` - The on-disk document `{timestamp, stats, data, count}`
//! - `CheckpointStore` - File-based persistence with atomic replacement
//! - Lenient loading for resume, strict loading for inspection

mod store;
mod types;

pub use store::CheckpointStore;
pub use types::Checkpoint;
