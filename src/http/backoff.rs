//! Exponential backoff with jitter
//!
//! `delay(k) = min(cap, base * 2^k) + U[0, 0.1 * min(cap, base * 2^k))`

use rand::Rng;
use std::time::Duration;

/// Upper bound for the exponential part of a retry delay
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Jitter as a fraction of the (capped) exponential delay
pub const JITTER_RATIO: f64 = 0.1;

/// Computes retry delays from an attempt number
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffController {
    base: Duration,
    cap: Duration,
}

impl BackoffController {
    /// Create a controller around a base delay, capped at [`MAX_BACKOFF`]
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            cap: MAX_BACKOFF,
        }
    }

    /// Override the cap
    #[must_use]
    pub fn with_cap(mut self, cap: Duration) -> Self {
        self.cap = cap;
        self
    }

    /// The base delay
    pub fn base(&self) -> Duration {
        self.base
    }

    /// The cap
    pub fn cap(&self) -> Duration {
        self.cap
    }

    /// The exponential part of the delay for `attempt`, without jitter
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(64) as i32;
        let secs = self.base.as_secs_f64() * 2f64.powi(exponent);
        let capped = secs.min(self.cap.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Full delay for `attempt` (starting at 1), jitter included
    pub fn compute_delay(&self, attempt: u32) -> Duration {
        let delay = self.base_delay(attempt);
        let upper = delay.as_secs_f64() * JITTER_RATIO;
        if upper <= 0.0 {
            return delay;
        }
        let jitter = rand::thread_rng().gen_range(0.0..upper);
        delay + Duration::from_secs_f64(jitter)
    }
}

/// Shorthand for `BackoffController::new(base).compute_delay(attempt)`
pub fn compute_delay(attempt: u32, base: Duration) -> Duration {
    BackoffController::new(base).compute_delay(attempt)
}
