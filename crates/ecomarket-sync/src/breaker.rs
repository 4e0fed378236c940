//! Concurrent circuit breaker.
//!
//! Thin wrapper that puts the pure [`BreakerCore`] behind a mutex and
//! feeds it real clock readings. One instance guards the branch's HTTP
//! channel to the center; dispatch tasks share it through an `Arc`.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use ecomarket_core::{Admission, BreakerCore, CircuitState};

/// Shared circuit breaker for the HTTP delivery modes.
#[derive(Debug)]
pub struct CircuitBreaker {
    core: Mutex<BreakerCore>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        CircuitBreaker {
            core: Mutex::new(BreakerCore::new(failure_threshold, recovery_timeout)),
        }
    }

    /// Asks whether a call may be attempted right now.
    pub fn admit(&self) -> Admission {
        self.core
            .lock()
            .expect("breaker poisoned")
            .try_admit(Instant::now())
    }

    /// Records a successful delivery.
    pub fn record_success(&self) {
        self.core.lock().expect("breaker poisoned").on_success();
    }

    /// Records a failed delivery attempt.
    pub fn record_failure(&self) {
        self.core
            .lock()
            .expect("breaker poisoned")
            .on_failure(Instant::now());
    }

    pub fn state(&self) -> CircuitState {
        self.core.lock().expect("breaker poisoned").state()
    }

    pub fn failure_count(&self) -> u32 {
        self.core.lock().expect("breaker poisoned").failure_count()
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        CircuitBreaker {
            core: Mutex::new(BreakerCore::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapper_mirrors_core_transitions() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.admit(), Admission::Rejected);
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }
}
