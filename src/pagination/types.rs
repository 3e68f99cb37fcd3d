//! Pagination types and traits
//!
//! Defines the page layout, the parsed page and the per-page notification
//! hook used by the paginator.

use crate::error::{Error, Result};
use crate::types::{take_at_path, JsonValue, Record};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// How the continuation reference is turned into the next request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContinuationStyle {
    /// The continuation is a URL requested as-is
    #[default]
    NextUrl,
    /// The continuation is an opaque token sent as the only query parameter
    CursorParam {
        /// Query parameter carrying the token
        param: String,
    },
}

/// Where items and the continuation live in a response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageFormat {
    /// Dotted path to the items array
    pub items_path: String,
    /// Dotted path to the continuation field
    pub continuation_path: String,
    /// How to follow the continuation
    pub continuation: ContinuationStyle,
}

impl Default for PageFormat {
    fn default() -> Self {
        Self {
            items_path: "results".to_string(),
            continuation_path: "next".to_string(),
            continuation: ContinuationStyle::NextUrl,
        }
    }
}

impl PageFormat {
    /// Create a next-URL page format
    pub fn next_url(items_path: impl Into<String>, continuation_path: impl Into<String>) -> Self {
        Self {
            items_path: items_path.into(),
            continuation_path: continuation_path.into(),
            continuation: ContinuationStyle::NextUrl,
        }
    }

    /// Create a cursor-token page format
    pub fn cursor(
        items_path: impl Into<String>,
        continuation_path: impl Into<String>,
        param: impl Into<String>,
    ) -> Self {
        Self {
            items_path: items_path.into(),
            continuation_path: continuation_path.into(),
            continuation: ContinuationStyle::CursorParam {
                param: param.into(),
            },
        }
    }

    /// Reject layouts that cannot be followed
    pub fn validate(&self) -> Result<()> {
        if self.items_path.trim().is_empty() {
            return Err(Error::invalid_value("page.items_path", "must not be empty"));
        }
        if self.continuation_path.trim().is_empty() {
            return Err(Error::invalid_value(
                "page.continuation_path",
                "must not be empty",
            ));
        }
        if self.items_path == self.continuation_path {
            return Err(Error::invalid_value(
                "page.continuation_path",
                "must differ from page.items_path",
            ));
        }
        if let ContinuationStyle::CursorParam { param } = &self.continuation {
            if param.trim().is_empty() {
                return Err(Error::invalid_value(
                    "page.continuation.param",
                    "must not be empty",
                ));
            }
        }
        Ok(())
    }
}

/// One parsed page
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    /// Records in server order
    pub items: Vec<Record>,
    /// Reference to the next page, used verbatim
    pub continuation: Option<String>,
}

impl PageResult {
    /// Split a response body into items and continuation.
    ///
    /// A missing or null items field is an empty page. A null, missing or
    /// blank continuation ends pagination; numeric tokens are kept as text.
    pub fn from_body(mut body: JsonValue, format: &PageFormat) -> Result<Self> {
        let items = match take_at_path(&mut body, &format.items_path) {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(JsonValue::Array(items)) => items,
            Some(other) => {
                return Err(Error::decode(format!(
                    "expected an array at '{}', found {}",
                    format.items_path,
                    json_kind(&other)
                )))
            }
        };

        let continuation = match take_at_path(&mut body, &format.continuation_path) {
            Some(JsonValue::String(reference)) if !reference.trim().is_empty() => Some(reference),
            Some(JsonValue::Number(token)) => Some(token.to_string()),
            _ => None,
        };

        Ok(Self {
            items,
            continuation,
        })
    }

    /// Check if another page follows
    pub fn has_next(&self) -> bool {
        self.continuation.is_some()
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

/// Per-page progress notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEvent {
    /// 1-based page index
    pub page: usize,
    /// Items on this page as returned by the server
    pub fetched: usize,
    /// Items collected by this run so far, after truncation
    pub total: usize,
}

/// Receives one event per fetched page.
///
/// Observers cannot influence pagination.
#[async_trait]
pub trait PageObserver: Send + Sync {
    /// Called after a page has been appended to the accumulator
    async fn on_page(&self, event: &PageEvent, collected: &[Record]);
}

/// Observer that reports progress through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

#[async_trait]
impl PageObserver for LogObserver {
    async fn on_page(&self, event: &PageEvent, _collected: &[Record]) {
        info!(
            page = event.page,
            "Fetched {} results (Total: {})",
            event.fetched,
            event.total
        );
    }
}
