//! Continuation-following paginator
//!
//! Drives the request executor page by page, strictly in continuation order.

use super::types::{
    ContinuationStyle, LogObserver, PageEvent, PageFormat, PageObserver, PageResult,
};
use crate::error::{Error, Result};
use crate::http::RequestExecutor;
use crate::types::Record;
use std::sync::Arc;
use tracing::info;

/// A collection that failed part-way.
///
/// Carries every item gathered before the failure so the caller can
/// checkpoint it.
#[derive(Debug, thiserror::Error)]
#[error("collection aborted after {} items: {source}", .partial.len())]
pub struct CollectError {
    /// Items collected before the failure, in order
    pub partial: Vec<Record>,
    /// What stopped the collection
    #[source]
    pub source: Error,
}

impl CollectError {
    /// Split into the partial items and the cause
    pub fn into_parts(self) -> (Vec<Record>, Error) {
        (self.partial, self.source)
    }
}

impl From<CollectError> for Error {
    fn from(err: CollectError) -> Self {
        err.source
    }
}

/// Follows continuation references until the server runs out of pages or
/// enough items have been collected
pub struct Paginator<'a> {
    executor: &'a RequestExecutor,
    format: PageFormat,
    observers: Vec<Arc<dyn PageObserver>>,
}

impl<'a> Paginator<'a> {
    /// Create a paginator that logs one line per page
    pub fn new(executor: &'a RequestExecutor, format: PageFormat) -> Self {
        Self {
            executor,
            format,
            observers: vec![Arc::new(LogObserver)],
        }
    }

    /// Drop all observers, including the default logger
    #[must_use]
    pub fn without_observers(mut self) -> Self {
        self.observers.clear();
        self
    }

    /// Register an additional observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PageObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// The page layout in use
    pub fn format(&self) -> &PageFormat {
        &self.format
    }

    /// Fetch and parse a single page
    pub async fn fetch_page(
        &self,
        reference: &str,
        params: Option<&[(String, String)]>,
    ) -> Result<PageResult> {
        let body = self.executor.execute_json(reference, params).await?;
        PageResult::from_body(body, &self.format)
    }

    async fn fetch_continuation(&self, endpoint: &str, continuation: &str) -> Result<PageResult> {
        match &self.format.continuation {
            ContinuationStyle::NextUrl => self.fetch_page(continuation, None).await,
            ContinuationStyle::CursorParam { param } => {
                let params = [(param.clone(), continuation.to_string())];
                self.fetch_page(endpoint, Some(&params)).await
            }
        }
    }

    /// Collect up to `max_results` items.
    ///
    /// On failure the items gathered so far come back inside the error.
    pub async fn collect(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        max_results: Option<usize>,
    ) -> std::result::Result<Vec<Record>, CollectError> {
        let mut items = Vec::new();
        match self
            .collect_into(endpoint, params, max_results, &mut items)
            .await
        {
            Ok(_) => Ok(items),
            Err(source) => Err(CollectError {
                partial: items,
                source,
            }),
        }
    }

    /// Collect into a caller-owned accumulator and return the page count.
    ///
    /// Items already in `acc` are kept and do not count toward
    /// `max_results`. Whatever was appended before an error (or before the
    /// future is dropped) stays in `acc`.
    pub async fn collect_into(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        max_results: Option<usize>,
        acc: &mut Vec<Record>,
    ) -> Result<usize> {
        if max_results == Some(0) {
            return Ok(0);
        }

        info!("Starting pagination for endpoint: {endpoint}");

        let start = acc.len();
        let mut continuation: Option<String> = None;
        let mut page = 0;

        loop {
            let result = match continuation.as_deref() {
                None => self.fetch_page(endpoint, Some(params)).await?,
                Some(reference) => self.fetch_continuation(endpoint, reference).await?,
            };
            page += 1;

            let fetched = result.items.len();
            acc.extend(result.items);

            let limit_reached = match max_results {
                Some(max) if acc.len() - start >= max => {
                    acc.truncate(start + max);
                    true
                }
                _ => false,
            };

            let event = PageEvent {
                page,
                fetched,
                total: acc.len() - start,
            };
            for observer in &self.observers {
                observer.on_page(&event, acc).await;
            }

            if limit_reached {
                info!(
                    "Reached max_results limit: {}",
                    max_results.unwrap_or_default()
                );
                break;
            }

            match result.continuation {
                Some(next) => continuation = Some(next),
                None => {
                    info!("No more pages available");
                    break;
                }
            }
        }

        info!("Pagination complete. Total results: {}", acc.len() - start);
        Ok(page)
    }
}

impl std::fmt::Debug for Paginator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("format", &self.format)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}
