//! Request outcomes and rate-limit metadata
//!
//! Every physical attempt is classified into a [`RequestOutcome`]; callers
//! switch on the variant instead of matching on status codes.

use crate::error::{Error, Result};
use crate::types::JsonValue;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;

/// Classified result of a single HTTP attempt
#[derive(Debug)]
pub enum RequestOutcome {
    /// 2xx with a JSON body
    Success(JsonValue),
    /// 429, with the server's `Retry-After` hint if any
    Throttled {
        /// How long the server asked us to wait
        retry_after: Option<Duration>,
    },
    /// 5xx
    ServerError {
        /// Status code
        status: u16,
    },
    /// 4xx other than 429 (and anything else that is neither 2xx nor 5xx)
    ClientError {
        /// Status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },
    /// No usable response: connect failure, timeout, broken body
    NetworkError(reqwest::Error),
}

/// Status classes the executor branches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx
    Success,
    /// 429
    Throttled,
    /// 5xx
    ServerError,
    /// Everything else
    ClientError,
}

impl StatusClass {
    /// Classify a status code
    pub fn of(status: StatusCode) -> Self {
        if status.is_success() {
            Self::Success
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            Self::Throttled
        } else if status.is_server_error() {
            Self::ServerError
        } else {
            Self::ClientError
        }
    }
}

impl RequestOutcome {
    /// Check if this is a success
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Whether the executor may retry this outcome
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled { .. } | Self::ServerError { .. })
    }

    /// Short name for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Throttled { .. } => "throttled",
            Self::ServerError { .. } => "server_error",
            Self::ClientError { .. } => "client_error",
            Self::NetworkError(_) => "network_error",
        }
    }

    /// Turn a final outcome into the response body or a typed error
    pub fn into_body(self) -> Result<JsonValue> {
        match self {
            Self::Success(body) => Ok(body),
            // only reachable when the caller bypasses the executor's retry loop
            Self::Throttled { .. } => Err(Error::RateLimitExhausted { attempts: 1 }),
            Self::ServerError { status } => Err(Error::ServerError { status }),
            Self::ClientError { status, body } => Err(Error::ClientError { status, body }),
            Self::NetworkError(e) => Err(Error::Http(e)),
        }
    }
}

// ============================================================================
// Rate-limit metadata
// ============================================================================

const LIMIT_HEADERS: &[&str] = &["x-ratelimit-limit", "ratelimit-limit"];
const REMAINING_HEADERS: &[&str] = &["x-ratelimit-remaining", "ratelimit-remaining"];
const RESET_HEADERS: &[&str] = &["x-ratelimit-reset", "ratelimit-reset"];
const RETRY_AFTER_HEADERS: &[&str] = &["retry-after", "x-ratelimit-retry-after"];

/// Longest `Retry-After` wait honoured; larger hints are clamped to this
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Server-supplied hints about the remaining request budget
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RateLimitState {
    /// Request ceiling for the current window
    pub limit: Option<u64>,
    /// Requests left in the current window
    pub remaining: Option<u64>,
    /// Reset time as sent by the server (epoch or seconds, API dependent)
    pub reset: Option<u64>,
    /// Seconds the server asked us to wait
    pub retry_after: Option<u64>,
}

impl RateLimitState {
    /// Merge whatever rate-limit headers the response carries.
    ///
    /// For each field the first alias present wins. Fields without a
    /// parseable header keep their previous value.
    pub fn update_from_headers(&mut self, headers: &HeaderMap) {
        update_field(&mut self.limit, headers, LIMIT_HEADERS, parse_number);
        update_field(&mut self.remaining, headers, REMAINING_HEADERS, parse_number);
        update_field(&mut self.reset, headers, RESET_HEADERS, parse_number);
        update_field(&mut self.retry_after, headers, RETRY_AFTER_HEADERS, |raw| {
            parse_retry_after(raw).map(|d| d.as_secs())
        });
    }

    /// Check if no field has been seen yet
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn update_field(
    field: &mut Option<u64>,
    headers: &HeaderMap,
    aliases: &[&str],
    parse: impl Fn(&str) -> Option<u64>,
) {
    let found = aliases
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok());

    if let Some(parsed) = found.and_then(parse) {
        *field = Some(parsed);
    }
}

fn parse_number(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0 && *v < u64::MAX as f64)
            .map(|v| v as u64)
    })
}

/// Extract the `Retry-After` hint of a response
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after)
}

/// Parse a `Retry-After` value: delta-seconds or an HTTP-date.
///
/// Waits longer than [`MAX_RETRY_AFTER`] are clamped to it.
pub fn parse_retry_after(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<f64>() {
        if !(secs.is_finite() && secs >= 0.0) {
            return None;
        }
        let wait = Duration::try_from_secs_f64(secs).unwrap_or(MAX_RETRY_AFTER);
        return Some(wait.min(MAX_RETRY_AFTER));
    }

    let at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
    let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    Some(wait.min(MAX_RETRY_AFTER))
}
