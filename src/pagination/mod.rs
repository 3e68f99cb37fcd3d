//! Pagination module
//!
//! Follows server-provided continuation references until the server stops
//! returning one or enough items have been collected.
//!
//! # Overview
//!
//! A [`PageFormat`] says where items and the continuation live in a response
//! body and how the continuation is turned into the next request (a full URL
//! or a cursor query parameter). The [`Paginator`] drives the executor page
//! by page and notifies [`PageObserver`]s after each page.

mod paginator;
mod types;

pub use paginator::{CollectError, Paginator};
pub use types::{ContinuationStyle, LogObserver, PageEvent, PageFormat, PageObserver, PageResult};
