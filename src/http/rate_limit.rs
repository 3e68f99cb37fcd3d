//! Request pacing
//!
//! Uses the governor crate with a burst of one, so consecutive requests are
//! spaced by at least the configured delay and idle time never builds up
//! credit for a later burst.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Minimum-spacing rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    delay: Duration,
    limiter: Option<Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>>,
}

impl RateLimiter {
    /// Create a limiter that lets one request through every `delay`.
    ///
    /// A zero delay disables pacing.
    pub fn new(delay: Duration) -> Self {
        let limiter = Quota::with_period(delay)
            .map(|quota| Arc::new(Governor::direct(quota.allow_burst(NonZeroU32::MIN))));

        Self { delay, limiter }
    }

    /// Create a limiter from a delay in (fractional) seconds
    pub fn from_secs_f64(secs: f64) -> Self {
        Self::new(Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::ZERO))
    }

    /// Create a limiter that never waits
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Wait until the next request may be sent
    pub async fn enforce(&self) {
        if let Some(ref limiter) = self.limiter {
            limiter.until_ready().await;
        }
    }

    /// The configured spacing
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether pacing is active
    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}
