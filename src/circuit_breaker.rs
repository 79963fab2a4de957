//! # Circuit Breaker Module
//!
//! This module implements the circuit breaker pattern for calls to the recipe
//! directory. Once the remote has failed repeatedly, further calls fail fast
//! until the reset timeout has elapsed.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::RecoveryConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

/// Circuit breaker for recipe directory requests
///
/// # State Machine
///
/// - **Closed**: Normal operation, requests pass through
/// - **Open**: Failure threshold reached, requests fail fast
/// - **Reset**: Reset timeout elapsed since the last failure, the count is
///   cleared and requests pass through again
///
/// # Configuration
///
/// Uses `RecoveryConfig` for:
/// - `circuit_breaker_threshold`: Failures before opening (default: 5)
/// - `circuit_breaker_reset_secs`: Time before attempting reset (default: 60s)
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    threshold: u32,
    reset_after: Duration,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    ///
    /// ```rust
    /// use recipes::circuit_breaker::CircuitBreaker;
    /// use recipes::config::RecoveryConfig;
    ///
    /// let breaker = CircuitBreaker::new(&RecoveryConfig::default());
    /// assert!(!breaker.is_open());
    /// ```
    pub fn new(config: &RecoveryConfig) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            threshold: config.circuit_breaker_threshold,
            reset_after: Duration::from_secs(config.circuit_breaker_reset_secs),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // The state is two plain counters, a poisoned guard is still consistent
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check if the circuit is open (blocking requests)
    ///
    /// A threshold of zero disables the breaker. An open circuit closes again
    /// by itself once `circuit_breaker_reset_secs` have passed since the last
    /// recorded failure.
    pub fn is_open(&self) -> bool {
        if self.threshold == 0 {
            return false;
        }

        let mut state = self.lock();
        if state.failure_count < self.threshold {
            return false;
        }

        match state.last_failure_time {
            Some(last_time) if last_time.elapsed() < self.reset_after => true,
            _ => {
                *state = BreakerState::default();
                false
            }
        }
    }

    /// Record a failed request
    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.failure_count = state.failure_count.saturating_add(1);
        state.last_failure_time = Some(Instant::now());
    }

    /// Record a successful request, closing the circuit
    pub fn record_success(&self) {
        *self.lock() = BreakerState::default();
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, reset_secs: u64) -> CircuitBreaker {
        CircuitBreaker::new(&RecoveryConfig {
            circuit_breaker_threshold: threshold,
            circuit_breaker_reset_secs: reset_secs,
            ..Default::default()
        })
    }

    #[test]
    fn test_opens_after_threshold() {
        let breaker = breaker(2, 60);
        assert!(!breaker.is_open());

        breaker.record_failure();
        assert!(!breaker.is_open());

        breaker.record_failure();
        assert!(breaker.is_open());
    }

    #[test]
    fn test_success_closes_circuit() {
        let breaker = breaker(1, 60);
        breaker.record_failure();
        assert!(breaker.is_open());

        breaker.record_success();
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn test_resets_after_timeout() {
        let breaker = breaker(1, 0);
        breaker.record_failure();

        // Zero reset timeout: the circuit closes again immediately
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn test_zero_threshold_disables_breaker() {
        let breaker = breaker(0, 60);
        for _ in 0..10 {
            breaker.record_failure();
        }
        assert!(!breaker.is_open());
    }
}
