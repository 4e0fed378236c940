//! # Circuit Breaker State Machine
//!
//! Pure state machine gating HTTP delivery attempts from a branch to the
//! center. All transitions are driven by injected `Instant`s, so the
//! machine is fully testable without timers or network calls.
//!
//! ## State Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Circuit Breaker States                             │
//! │                                                                         │
//! │                  failure_count >= threshold                             │
//! │   ┌────────┐ ─────────────────────────────────► ┌────────┐             │
//! │   │ CLOSED │                                    │  OPEN  │             │
//! │   └────────┘ ◄──────────────┐                   └───┬────┘             │
//! │        ▲                    │                       │                   │
//! │        │ success            │          recovery_timeout elapsed         │
//! │        │                    │                       │                   │
//! │        │              ┌─────┴─────┐                 ▼                   │
//! │        └───────────── │ HALF_OPEN │ ◄───────── (single probe)          │
//! │                       └─────┬─────┘                                     │
//! │                             │ failure                                   │
//! │                             └──────► OPEN (recovery window resets)     │
//! │                                                                         │
//! │  While OPEN and inside the recovery window, calls are rejected          │
//! │  immediately - no network attempt is made (fail fast).                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::{Duration, Instant};

// =============================================================================
// States
// =============================================================================

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation; calls pass through.
    Closed,
    /// Failing fast; calls are rejected until the recovery window elapses.
    Open,
    /// One probe call is in flight; its outcome decides the next state.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Outcome of asking the breaker to admit a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Circuit closed; proceed normally.
    Allowed,
    /// Circuit was open and the recovery window elapsed; this single call
    /// is admitted as a probe (state is now HALF_OPEN).
    Probe,
    /// Circuit open and inside the recovery window; do not attempt the call.
    Rejected,
}

// =============================================================================
// State Machine
// =============================================================================

/// Pure circuit breaker core.
///
/// One instance guards one branch-to-center HTTP channel. Wrap in a mutex
/// for concurrent use (see `ecomarket-sync::breaker::CircuitBreaker`).
#[derive(Debug, Clone)]
pub struct BreakerCore {
    /// Consecutive failures before the circuit opens.
    failure_threshold: u32,

    /// How long the circuit stays open before admitting a probe.
    recovery_timeout: Duration,

    /// Consecutive failure count. Reset to zero on any success.
    failure_count: u32,

    /// When the last failure was recorded.
    last_failure_at: Option<Instant>,

    /// Current state.
    state: CircuitState,
}

impl BreakerCore {
    /// Creates a breaker with the given threshold and recovery window.
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        BreakerCore {
            failure_threshold,
            recovery_timeout,
            failure_count: 0,
            last_failure_at: None,
            state: CircuitState::Closed,
        }
    }

    /// Current state.
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Consecutive failure count.
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Decides whether a call may be attempted at `now`.
    ///
    /// An `Open` circuit admits exactly one probe per elapsed recovery
    /// window: admission transitions the machine to `HalfOpen`, so a second
    /// caller arriving before the probe resolves is also admitted as
    /// half-open traffic (matching the reference behavior of a single
    /// state flag rather than a token).
    pub fn try_admit(&mut self, now: Instant) -> Admission {
        match self.state {
            CircuitState::Open => {
                let elapsed = self
                    .last_failure_at
                    .map(|at| now.duration_since(at) >= self.recovery_timeout)
                    .unwrap_or(false);
                if elapsed {
                    self.state = CircuitState::HalfOpen;
                    Admission::Probe
                } else {
                    Admission::Rejected
                }
            }
            CircuitState::HalfOpen | CircuitState::Closed => Admission::Allowed,
        }
    }

    /// Records a successful call: the circuit closes and the failure count
    /// resets, from any state.
    pub fn on_success(&mut self) {
        self.failure_count = 0;
        self.state = CircuitState::Closed;
    }

    /// Records a failed call at `now`.
    ///
    /// Reaching the threshold opens the circuit; a failure while half-open
    /// re-opens it and restarts the recovery window.
    pub fn on_failure(&mut self, now: Instant) {
        self.failure_count += 1;
        self.last_failure_at = Some(now);
        if self.state == CircuitState::HalfOpen || self.failure_count >= self.failure_threshold {
            self.state = CircuitState::Open;
        }
    }
}

impl Default for BreakerCore {
    /// Threshold 3, recovery 60s: the production defaults for the
    /// branch-to-center channel.
    fn default() -> Self {
        BreakerCore::new(3, Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECOVERY: Duration = Duration::from_secs(30);

    fn breaker() -> BreakerCore {
        BreakerCore::new(3, RECOVERY)
    }

    #[test]
    fn test_starts_closed() {
        let mut b = breaker();
        assert_eq!(b.state(), CircuitState::Closed);
        assert_eq!(b.try_admit(Instant::now()), Admission::Allowed);
    }

    #[test]
    fn test_opens_after_threshold_failures() {
        let mut b = breaker();
        let now = Instant::now();
        b.on_failure(now);
        b.on_failure(now);
        assert_eq!(b.state(), CircuitState::Closed);
        b.on_failure(now);
        assert_eq!(b.state(), CircuitState::Open);
        assert_eq!(b.failure_count(), 3);
    }

    #[test]
    fn test_rejects_inside_recovery_window() {
        // Scenario: 3 failures open the circuit; a 4th attempt inside the
        // window is rejected with no call made.
        let mut b = breaker();
        let now = Instant::now();
        for _ in 0..3 {
            b.on_failure(now);
        }
        assert_eq!(b.try_admit(now + Duration::from_secs(5)), Admission::Rejected);
        assert_eq!(b.state(), CircuitState::Open);
    }

    #[test]
    fn test_admits_probe_after_recovery_window() {
        let mut b = breaker();
        let now = Instant::now();
        for _ in 0..3 {
            b.on_failure(now);
        }
        assert_eq!(b.try_admit(now + RECOVERY), Admission::Probe);
        assert_eq!(b.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn test_probe_success_closes_and_resets() {
        let mut b = breaker();
        let now = Instant::now();
        for _ in 0..3 {
            b.on_failure(now);
        }
        assert_eq!(b.try_admit(now + RECOVERY), Admission::Probe);
        b.on_success();
        assert_eq!(b.state(), CircuitState::Closed);
        assert_eq!(b.failure_count(), 0);
    }

    #[test]
    fn test_probe_failure_reopens_and_resets_window() {
        let mut b = breaker();
        let start = Instant::now();
        for _ in 0..3 {
            b.on_failure(start);
        }
        let probe_at = start + RECOVERY;
        assert_eq!(b.try_admit(probe_at), Admission::Probe);
        b.on_failure(probe_at);
        assert_eq!(b.state(), CircuitState::Open);

        // Window restarts from the probe failure, not the original one.
        assert_eq!(
            b.try_admit(probe_at + RECOVERY - Duration::from_secs(1)),
            Admission::Rejected
        );
        assert_eq!(b.try_admit(probe_at + RECOVERY), Admission::Probe);
    }

    #[test]
    fn test_success_resets_consecutive_failures() {
        let mut b = breaker();
        let now = Instant::now();
        b.on_failure(now);
        b.on_failure(now);
        b.on_success();
        b.on_failure(now);
        b.on_failure(now);
        assert_eq!(b.state(), CircuitState::Closed);
    }
}
