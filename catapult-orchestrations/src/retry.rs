//! Backoff policy for rate-limited remote calls
//!
//! Only the clients retry, and only on rate limiting. The orchestrator never
//! retries a failed step.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    Fixed {
        delay: Duration,
    },
    Linear {
        base: Duration,
        max: Duration,
    },
    Exponential {
        base: Duration,
        multiplier: f64,
        max: Duration,
    },
}

impl BackoffStrategy {
    fn max_delay(&self) -> Duration {
        match self {
            Self::Fixed { delay } => *delay,
            Self::Linear { max, .. } | Self::Exponential { max, .. } => *max,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(4).with_backoff(BackoffStrategy::Exponential {
            base: Duration::from_secs(1),
            multiplier: 2.0,
            max: Duration::from_secs(30),
        })
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: BackoffStrategy::Fixed {
                delay: Duration::from_secs(1),
            },
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(1)
    }

    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before the attempt following `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match &self.backoff {
            BackoffStrategy::Fixed { delay } => *delay,
            BackoffStrategy::Linear { base, max } => base.saturating_mul(attempt).min(*max),
            BackoffStrategy::Exponential {
                base,
                multiplier,
                max,
            } => {
                let factor = multiplier.powi(attempt as i32 - 1);
                let secs = base.as_secs_f64() * factor;
                if !secs.is_finite() || secs >= max.as_secs_f64() {
                    *max
                } else {
                    Duration::from_secs_f64(secs)
                }
            }
        }
    }

    /// Delay honouring a server-provided hint such as `Retry-After`,
    /// capped by the strategy's maximum.
    pub fn delay_with_hint(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        match hint {
            Some(hint) => hint.min(self.backoff.max_delay()),
            None => self.delay_for(attempt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = RetryPolicy::new(5).with_backoff(BackoffStrategy::Exponential {
            base: Duration::from_secs(2),
            multiplier: 2.0,
            max: Duration::from_secs(10),
        });
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(4), Duration::from_secs(10));
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::new(5).with_backoff(BackoffStrategy::Linear {
            base: Duration::from_secs(2),
            max: Duration::from_secs(5),
        });
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(5));
    }

    #[test]
    fn test_retry_after_hint_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_with_hint(1, Some(Duration::from_secs(3600))),
            Duration::from_secs(30)
        );
        assert_eq!(
            policy.delay_with_hint(1, Some(Duration::from_secs(3))),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn test_attempt_budget() {
        let policy = RetryPolicy::new(3);
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert!(!RetryPolicy::none().should_retry(1));
    }
}
