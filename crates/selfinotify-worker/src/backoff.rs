//! Exponential backoff policy for transient delivery failures.

use std::time::Duration;

/// Delay before the next attempt after `attempt` failed attempts.
///
/// Doubles per attempt starting at the base: attempt 1 waits the base delay,
/// attempt 2 waits twice that, and so on. `attempt` is 1-based (the attempt
/// that just failed).
pub fn retry_delay(base_ms: u64, attempt: i32) -> Duration {
    let exponent = attempt.max(1) as u32 - 1;
    let factor = 2u64.saturating_pow(exponent);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_per_attempt() {
        assert_eq!(retry_delay(2000, 1), Duration::from_millis(2000));
        assert_eq!(retry_delay(2000, 2), Duration::from_millis(4000));
        assert_eq!(retry_delay(2000, 3), Duration::from_millis(8000));
    }

    #[test]
    fn delay_is_monotonic() {
        for attempt in 1..10 {
            assert!(retry_delay(500, attempt + 1) > retry_delay(500, attempt));
        }
    }

    #[test]
    fn zero_attempt_is_clamped_to_base() {
        assert_eq!(retry_delay(2000, 0), Duration::from_millis(2000));
    }

    #[test]
    fn large_attempt_saturates_instead_of_overflowing() {
        let delay = retry_delay(u64::MAX, 64);
        assert_eq!(delay, Duration::from_millis(u64::MAX));
    }
}
