//! Bounded exponential backoff for generation requests.
//!
//! [`RetryPolicy`] is the fixed configuration; [`RetryState`] is the state
//! machine the request client walks through for a single `generate` call:
//!
//! ```text
//! Attempting(k) --ok--------------------> Succeeded
//! Attempting(k) --err, k < max---------> Waiting(k) --delay--> Attempting(k + 1)
//! Attempting(max) --err-----------------> Exhausted
//! ```

use crate::error::{InternMatchError, Result};
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(1000);
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Retry configuration, fixed for the lifetime of a client
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    multiplier: f64,
    max_backoff: Option<Duration>,
}

impl RetryPolicy {
    /// Create a validated policy.
    ///
    /// `max_attempts` is the total number of attempts, including the first.
    pub fn new(max_attempts: u32, initial_backoff: Duration, multiplier: f64) -> Result<Self> {
        if max_attempts == 0 {
            return Err(InternMatchError::Config(
                "max retries must allow at least one attempt".to_string(),
            ));
        }
        if initial_backoff.is_zero() {
            return Err(InternMatchError::Config("initial backoff must be positive".to_string()));
        }
        if !multiplier.is_finite() || multiplier <= 1.0 {
            return Err(InternMatchError::Config(format!(
                "backoff multiplier must be greater than 1, got {multiplier}"
            )));
        }

        Ok(Self {
            max_attempts,
            initial_backoff,
            multiplier,
            max_backoff: None,
        })
    }

    /// Cap every computed delay at `max_backoff`.
    ///
    /// The cap may not undercut `initial_backoff`, so every retry still waits.
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Result<Self> {
        if max_backoff < self.initial_backoff {
            return Err(InternMatchError::Config(format!(
                "max backoff {max_backoff:?} is below initial backoff {:?}",
                self.initial_backoff
            )));
        }
        self.max_backoff = Some(max_backoff);
        Ok(self)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn max_backoff(&self) -> Option<Duration> {
        self.max_backoff
    }

    /// Delay before the `k`-th retry (1-based): `initial * multiplier^(k-1)`.
    pub fn delay_for_retry(&self, k: u32) -> Duration {
        let exponent = i32::try_from(k.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);

        match self.max_backoff {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_backoff: None,
        }
    }
}

/// Where a single `generate` call is in its retry budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Attempt `k` (1-based) is in flight
    Attempting(u32),
    /// Attempt `k` failed; sleeping before attempt `k + 1`
    Waiting(u32),
    Succeeded,
    Exhausted,
}

impl RetryState {
    pub fn start() -> Self {
        RetryState::Attempting(1)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RetryState::Succeeded | RetryState::Exhausted)
    }

    /// The current attempt succeeded.
    pub fn succeed(self) -> Self {
        match self {
            RetryState::Attempting(_) => RetryState::Succeeded,
            other => other,
        }
    }

    /// The current attempt failed.
    pub fn fail(self, policy: &RetryPolicy) -> Self {
        match self {
            RetryState::Attempting(k) if k < policy.max_attempts() => RetryState::Waiting(k),
            RetryState::Attempting(_) => RetryState::Exhausted,
            other => other,
        }
    }

    /// The backoff delay elapsed.
    pub fn resume(self) -> Self {
        match self {
            RetryState::Waiting(k) => RetryState::Attempting(k + 1),
            other => other,
        }
    }
}
