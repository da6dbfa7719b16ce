//! Circuit breaker for provider rate limiting and IP bans.
//!
//! HTTP 403 trips the breaker at once; repeated 429s or server errors trip it
//! after a threshold. While open, every request is refused until the cooldown
//! (default 30 minutes) has elapsed.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// State of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Requests are allowed.
    Closed,
    /// Requests are refused until the cooldown expires.
    Open { tripped_at: Instant },
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
}

/// Shared breaker guarding one provider.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    cooldown: Duration,
    failure_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
            }),
            cooldown,
            failure_threshold: 3,
        }
    }

    /// 30-minute cooldown, trips after 3 consecutive failures.
    pub fn default_provider() -> Self {
        Self::new(Duration::from_secs(30 * 60))
    }

    // The guarded data is two plain values, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    /// Whether a request may be sent now. Closes the breaker once the cooldown
    /// has run out.
    pub fn is_allowed(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open { tripped_at } if tripped_at.elapsed() >= self.cooldown => {
                info!("circuit breaker cooldown expired, closing");
                inner.state = BreakerState::Closed;
                inner.consecutive_failures = 0;
                true
            }
            BreakerState::Open { .. } => false,
        }
    }

    pub fn record_success(&self) {
        self.lock().consecutive_failures = 0;
    }

    /// Count a failure; trips the breaker at the threshold.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.failure_threshold
            && inner.state == BreakerState::Closed
        {
            warn!(
                failures = inner.consecutive_failures,
                cooldown_secs = self.cooldown.as_secs(),
                "circuit breaker tripped"
            );
            inner.state = BreakerState::Open {
                tripped_at: Instant::now(),
            };
        }
    }

    /// Trip immediately (403 Forbidden).
    pub fn trip(&self) {
        warn!(cooldown_secs = self.cooldown.as_secs(), "circuit breaker tripped by provider ban");
        self.lock().state = BreakerState::Open {
            tripped_at: Instant::now(),
        };
    }

    /// Remaining cooldown, zero when closed.
    pub fn remaining_cooldown(&self) -> Duration {
        match self.lock().state {
            BreakerState::Closed => Duration::ZERO,
            BreakerState::Open { tripped_at } => self.cooldown.saturating_sub(tripped_at.elapsed()),
        }
    }
}
