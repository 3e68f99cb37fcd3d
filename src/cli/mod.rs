//! CLI module
//!
//! Command-line interface for harvesting.
//!
//! # Commands
//!
//! - `search` - Search models with filters
//! - `fetch` - Harvest any paginated endpoint
//! - `get` - Fetch a single resource
//! - `inspect` - Summarize a checkpoint
//! - `export` - Convert a checkpoint to JSON or CSV

mod commands;
mod runner;

pub use commands::{parse_key_val, Cli, Commands, OutputArgs, RunArgs};
pub use runner::{Runner, TOKEN_ENV};
