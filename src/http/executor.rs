//! Sequential request executor with pacing and retries
//!
//! Handles:
//! - Pacing every physical attempt through the rate limiter
//! - Exponential backoff on throttling, bounded by `max_retries`
//! - A small fixed retry budget for 5xx responses
//! - Rate-limit header tracking and per-attempt statistics

use super::backoff::BackoffController;
use super::outcome::{retry_after, RateLimitState, RequestOutcome, StatusClass};
use super::rate_limit::RateLimiter;
use crate::config::HarvestConfig;
use crate::error::{Error, Result};
use crate::stats::{RunStats, StatsTracker};
use crate::types::JsonValue;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Hard ceiling for the server-error retry budget
pub const MAX_SERVER_ERROR_RETRIES: u32 = 3;

/// Issues GET requests one at a time and absorbs transient failures
pub struct RequestExecutor {
    client: Client,
    base_url: String,
    limiter: RateLimiter,
    backoff: BackoffController,
    max_retries: u32,
    server_error_retries: u32,
    stats: Arc<StatsTracker>,
    rate_limit: Mutex<RateLimitState>,
}

impl RequestExecutor {
    /// Build an executor from configuration
    pub fn new(config: &HarvestConfig) -> Result<Self> {
        Self::with_stats(config, Arc::new(StatsTracker::new()))
    }

    /// Build an executor that reports into an existing tracker
    pub fn with_stats(config: &HarvestConfig, stats: Arc<StatsTracker>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = config.api_token.as_deref() {
            let value = format!("{} {}", config.auth_scheme, token);
            let mut value = HeaderValue::from_str(&value)
                .map_err(|_| Error::invalid_value("api_token", "not a valid header value"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()?;

        let delay = config.request_delay();

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            limiter: RateLimiter::new(delay),
            backoff: BackoffController::new(delay),
            max_retries: config.max_retries,
            server_error_retries: config.server_error_retries.min(MAX_SERVER_ERROR_RETRIES),
            stats,
            rate_limit: Mutex::new(RateLimitState::default()),
        })
    }

    /// Shared handle to the statistics tracker
    pub fn tracker(&self) -> &Arc<StatsTracker> {
        &self.stats
    }

    /// Current request statistics
    pub fn stats(&self) -> RunStats {
        self.stats.snapshot()
    }

    /// Latest rate-limit metadata seen in any response
    pub fn rate_limit_state(&self) -> RateLimitState {
        *self.rate_limit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Throttling retry budget
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Resolve an endpoint path or continuation reference to a full URL.
    ///
    /// Absolute references are returned untouched.
    pub fn build_url(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return reference.to_string();
        }

        let base = self.base_url.trim_end_matches('/');
        let path = reference.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Execute a GET with retries and return the final outcome.
    ///
    /// Throttling and server errors are retried here; every other outcome
    /// is returned as soon as it is seen. Running out of throttling retries
    /// is an error of its own.
    pub async fn execute(
        &self,
        reference: &str,
        params: Option<&[(String, String)]>,
    ) -> Result<RequestOutcome> {
        let url = self.build_url(reference);
        let mut attempts: u32 = 0;
        let mut throttle_retries: u32 = 0;
        let mut server_retries: u32 = 0;

        loop {
            attempts += 1;
            let outcome = self.send_once(&url, params).await?;

            match outcome {
                RequestOutcome::Throttled { retry_after } => {
                    warn!(
                        "Rate limit hit (429), attempt {}/{}",
                        throttle_retries + 1,
                        self.max_retries + 1
                    );

                    if let Some(wait) = retry_after {
                        info!("Server says Retry-After: {:.1}s", wait.as_secs_f64());
                        tokio::time::sleep(wait).await;
                    }

                    if throttle_retries >= self.max_retries {
                        error!("Max retries ({}) exceeded", self.max_retries);
                        return Err(Error::RateLimitExhausted { attempts });
                    }

                    throttle_retries += 1;
                    self.back_off(attempts).await;
                }
                RequestOutcome::ServerError { status } => {
                    if server_retries >= self.server_error_retries {
                        error!("Server error {status} persisted after {attempts} attempts");
                        return Ok(outcome);
                    }

                    warn!(
                        "Server error {status}, retry {}/{}",
                        server_retries + 1,
                        self.server_error_retries
                    );
                    server_retries += 1;
                    self.back_off(attempts).await;
                }
                other => return Ok(other),
            }
        }
    }

    /// Execute a GET with retries and return the JSON body
    pub async fn execute_json(
        &self,
        reference: &str,
        params: Option<&[(String, String)]>,
    ) -> Result<JsonValue> {
        self.execute(reference, params).await?.into_body()
    }

    /// Perform exactly one physical attempt.
    ///
    /// Waits for the rate limiter, sends the request, records rate-limit
    /// headers and statistics, and classifies the result. The only error
    /// returned is a 2xx body that is not JSON.
    pub async fn send_once(
        &self,
        url: &str,
        params: Option<&[(String, String)]>,
    ) -> Result<RequestOutcome> {
        self.limiter.enforce().await;

        let mut req = self.client.get(url);
        if let Some(params) = params.filter(|p| !p.is_empty()) {
            req = req.query(params);
        }

        debug!("Request {}: {}", self.stats.snapshot().total_requests + 1, url);

        let response = match req.send().await {
            Ok(response) => response,
            Err(e) => {
                self.stats.record_error();
                error!("Request failed: {e}");
                return Ok(RequestOutcome::NetworkError(e));
            }
        };

        let rate_limit = self.record_rate_limit(response.headers());
        if let Some(remaining) = rate_limit.remaining {
            debug!("Rate limit remaining: {remaining}");
        }

        let status = response.status();
        match StatusClass::of(status) {
            StatusClass::Success => {
                let text = match response.text().await {
                    Ok(text) => text,
                    Err(e) => {
                        self.stats.record_error();
                        error!("Failed to read response body: {e}");
                        return Ok(RequestOutcome::NetworkError(e));
                    }
                };
                match serde_json::from_str(&text) {
                    Ok(body) => {
                        self.stats.record_success();
                        Ok(RequestOutcome::Success(body))
                    }
                    Err(e) => {
                        self.stats.record_error();
                        Err(Error::decode(format!("response from {url} is not JSON: {e}")))
                    }
                }
            }
            StatusClass::Throttled => {
                self.stats.record_throttled();
                Ok(RequestOutcome::Throttled {
                    retry_after: retry_after(response.headers()),
                })
            }
            StatusClass::ServerError => {
                self.stats.record_error();
                Ok(RequestOutcome::ServerError {
                    status: status.as_u16(),
                })
            }
            StatusClass::ClientError => {
                self.stats.record_error();
                if status == reqwest::StatusCode::FORBIDDEN {
                    error!("403 Forbidden - check API token or permissions");
                } else {
                    error!("HTTP error {}", status.as_u16());
                }
                let body = response.text().await.unwrap_or_default();
                Ok(RequestOutcome::ClientError {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    fn record_rate_limit(&self, headers: &HeaderMap) -> RateLimitState {
        let mut state = self.rate_limit.lock().unwrap_or_else(PoisonError::into_inner);
        state.update_from_headers(headers);
        *state
    }

    async fn back_off(&self, attempt: u32) {
        let delay: Duration = self.backoff.compute_delay(attempt);
        if delay.is_zero() {
            return;
        }
        info!(
            "Waiting {:.2}s before next request (retry: {attempt})",
            delay.as_secs_f64()
        );
        tokio::time::sleep(delay).await;
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("base_url", &self.base_url)
            .field("limiter", &self.limiter)
            .field("backoff", &self.backoff)
            .field("max_retries", &self.max_retries)
            .field("server_error_retries", &self.server_error_retries)
            .finish_non_exhaustive()
    }
}
