//! Retry policy for provider calls.
//!
//! Rate limits (429), server errors (5xx) and transport failures are retried
//! with exponential backoff. A provider supplied `Retry-After` value takes
//! precedence over the computed delay.

use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts allowed after the first one (0 = fail on the first error).
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each later retry.
    pub backoff_base: Duration,
    /// Upper bound for computed delays. `Retry-After` is not capped.
    pub max_delay: Duration,
    /// Scale computed delays by a random factor in `[0.5, 1.0)`.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: false,
        }
    }
}

impl RetryConfig {
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// No waiting between attempts. Handy for tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff_base: Duration::ZERO,
            ..Default::default()
        }
    }

    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retrying after the given attempt (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(delay) = retry_after {
            return delay;
        }

        let exponent = attempt.saturating_sub(1).min(31) as i32;
        let base = self.backoff_base.as_secs_f64() * 2f64.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());

        if self.jitter && capped > 0.0 {
            let factor = rand::thread_rng().gen_range(0.5..1.0);
            Duration::from_secs_f64(capped * factor)
        } else {
            Duration::from_secs_f64(capped)
        }
    }
}

/// Parse a `Retry-After` header given in seconds. HTTP-date values and
/// anything negative, non-finite or too large for a `Duration` are ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let seconds: f64 = value.trim().parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}
