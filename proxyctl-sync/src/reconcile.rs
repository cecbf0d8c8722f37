//! Read-after-write reconciliation.
//!
//! The proxy's writes are not immediately visible to its reads. After a
//! mutation, [`reconcile`] re-reads until the entity shows up: a read that
//! fails as not-found is retried with exponential backoff, any other failure
//! ends the loop at once.
//!
//! The delay before attempt `i + 1` is `min(initial * 2^(i-1), max)`.

use std::time::{Duration, Instant};

use proxyctl_core::{ProxyError, RetrySettings};

/// Retry budget for one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total reads, including the first. Zero behaves as one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Wall-clock budget, checked between attempts.
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            initial_delay: settings.initial_delay(),
            max_delay: settings.max_delay(),
            deadline: None,
        }
    }
}

impl RetryPolicy {
    /// Same budget, no waiting. For tests and callers that poll elsewhere.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Per-call retry bookkeeping. Never outlives one [`reconcile_with`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    pub attempt: u32,
    pub delay: Duration,
    pub max_delay: Duration,
}

impl RetryState {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            delay: policy.initial_delay.min(policy.max_delay),
            max_delay: policy.max_delay,
        }
    }

    /// The delay to wait now; doubles the next one up to the ceiling.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.delay;
        self.delay = self.delay.saturating_mul(2).min(self.max_delay);
        current
    }
}

/// [`reconcile_with`] sleeping on the current thread.
pub fn reconcile<T, R>(policy: &RetryPolicy, read: R) -> Result<T, ProxyError>
where
    R: FnMut() -> Result<T, ProxyError>,
{
    reconcile_with(policy, read, std::thread::sleep)
}

/// Run `read` until it succeeds, fails with anything other than not-found,
/// or the budget runs out. On exhaustion the last not-found error is
/// returned. A first-read success never calls `sleep`.
pub fn reconcile_with<T, R, S>(policy: &RetryPolicy, mut read: R, mut sleep: S) -> Result<T, ProxyError>
where
    R: FnMut() -> Result<T, ProxyError>,
    S: FnMut(Duration),
{
    let max_attempts = policy.max_attempts.max(1);
    let started = Instant::now();
    let mut state = RetryState::new(policy);

    loop {
        state.attempt += 1;
        let err = match read() {
            Ok(value) => {
                if state.attempt > 1 {
                    tracing::debug!("visible after {} reads", state.attempt);
                }
                return Ok(value);
            }
            Err(err) if err.is_not_found() => err,
            Err(err) => return Err(err),
        };

        if state.attempt >= max_attempts {
            tracing::debug!("still not visible after {} reads: {err}", state.attempt);
            return Err(err);
        }
        if let Some(deadline) = policy.deadline {
            if started.elapsed() >= deadline {
                tracing::debug!("deadline reached after {} reads: {err}", state.attempt);
                return Err(err);
            }
        }

        let delay = state.next_delay();
        tracing::debug!(
            "not visible yet (read {}/{max_attempts}), retrying in {delay:?}",
            state.attempt
        );
        sleep(delay);
    }
}
