//! Exponential backoff delay math.
//!
//! Kept pure so the monotonicity property is testable without timers:
//! successive delays strictly increase (`base * 2^attempt`).

use std::time::Duration;

/// Delay before retry `attempt` (zero-based): `base * 2^attempt`.
///
/// Saturates rather than overflowing for absurd attempt counts.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_per_attempt() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 4), Duration::from_secs(16));
    }

    #[test]
    fn test_delays_strictly_increase() {
        let base = Duration::from_millis(250);
        let mut previous = Duration::ZERO;
        for attempt in 0..8 {
            let delay = backoff_delay(base, attempt);
            assert!(delay > previous, "attempt {attempt} did not increase");
            previous = delay;
        }
    }

    #[test]
    fn test_saturation_instead_of_overflow() {
        let huge = backoff_delay(Duration::from_secs(u64::MAX / 2), 40);
        assert!(huge >= Duration::from_secs(u64::MAX / 2));
    }
}
