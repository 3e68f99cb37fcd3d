//! Output module
//!
//! Exports collected records as JSON or CSV.
//!
//! # Overview
//!
//! This module provides utilities for:
//! - Flattening nested JSON records into dotted columns
//! - Writing CSV with a header built from every record's columns
//! - Writing a pretty-printed JSON array

mod flatten;
mod writer;

pub use flatten::flatten_record;
pub use writer::{export, write_csv, write_json, ExportFormat};
