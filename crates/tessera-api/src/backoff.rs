//! When to try a collaborator request again.
//!
//! Handlers degrade a failed call to a placeholder, so the default is a single
//! attempt. Deployments with a flaky model server can opt into retries.

use std::time::Duration;

use rand::Rng;
use tessera_types::CollaboratorError;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Extra attempts after the first (0 = fail fast).
    pub max_retries: u32,
    /// Wait before the first retry; doubles after each one.
    pub base_delay: Duration,
    /// Upper bound on any single wait, including a server's `Retry-After`.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub(crate) fn schedule(&self) -> Backoff {
        Backoff {
            remaining: self.max_retries,
            next: self.base_delay.min(self.max_delay),
            max: self.max_delay,
        }
    }
}

/// Retry budget for one request.
#[derive(Debug)]
pub(crate) struct Backoff {
    remaining: u32,
    next: Duration,
    max: Duration,
}

impl Backoff {
    /// How long to wait before retrying after `error`, or `None` to give up.
    ///
    /// A rate limit with `Retry-After` waits exactly that long (capped). Other
    /// transient errors wait a random time between half and all of the
    /// current step.
    pub(crate) fn next_delay(&mut self, error: &CollaboratorError) -> Option<Duration> {
        if self.remaining == 0 || !error.is_transient() {
            return None;
        }
        self.remaining -= 1;

        let delay = match error {
            CollaboratorError::RateLimited {
                retry_after_ms: Some(ms),
            } => Duration::from_millis(*ms),
            _ => self.next.mul_f64(rand::rng().random_range(0.5..=1.0)),
        };
        self.next = self.next.saturating_mul(2).min(self.max);
        Some(delay.min(self.max))
    }
}
