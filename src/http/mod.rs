//! HTTP module
//!
//! Provides the sequential request executor with pacing, backoff and retries.
//!
//! # Features
//!
//! - **Rate Limiting**: Minimum spacing between requests using governor
//! - **Backoff**: Exponential backoff with jitter, capped at five minutes
//! - **Outcome Classification**: Success, throttled, server, client and network errors
//! - **Rate-limit Metadata**: Opportunistic parsing of the common header aliases

mod backoff;
mod executor;
mod outcome;
mod rate_limit;

pub use backoff::{compute_delay, BackoffController, JITTER_RATIO, MAX_BACKOFF};
pub use executor::{RequestExecutor, MAX_SERVER_ERROR_RETRIES};
pub use outcome::{
    parse_retry_after, RateLimitState, RequestOutcome, StatusClass, MAX_RETRY_AFTER,
};
pub use rate_limit::RateLimiter;

#[cfg(test)]
mod tests;
