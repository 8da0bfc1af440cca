//! Fixed-delay retry policy applied when Zoho rejects the bearer token.
//!
//! Only authentication failures are retried; anything else is returned to the
//! caller on the first attempt.

use std::time::Duration;

/// Default number of attempts (including the first one).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default wait between attempts (5 minutes).
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration, next_attempt: u32 },
    GiveUp,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// `attempt` is 1-based: the attempt that just failed.
    pub fn after_auth_failure(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry {
                delay: self.delay,
                next_attempt: attempt + 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(300));
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert_eq!(
            policy.after_auth_failure(1),
            RetryDecision::Retry {
                delay: Duration::from_secs(1),
                next_attempt: 2
            }
        );
        assert!(matches!(policy.after_auth_failure(2), RetryDecision::Retry { .. }));
        assert_eq!(policy.after_auth_failure(3), RetryDecision::GiveUp);
    }

    #[test]
    fn test_zero_attempts_means_single_try() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.after_auth_failure(1), RetryDecision::GiveUp);
    }
}
