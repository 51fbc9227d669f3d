//! Retry Policy
//!
//! Attempt budget and inter-attempt delays for one fetch sequence.

use std::time::Duration;

use crate::config::SyncConfig;
use crate::error::ProviderError;

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep, then try again
    Retry(Duration),
    /// Stop the loop and surface the error
    Abort,
}

/// Retry policy for a fetch sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    error_delay: Duration,
    transport_base: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self::from_config(&SyncConfig {
            max_attempts,
            extended_retries: false,
            ..SyncConfig::default()
        })
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            max_attempts: config.attempt_budget(),
            error_delay: config.error_retry_delay,
            transport_base: config.transport_backoff_base,
            max_backoff: config.max_backoff,
        }
    }

    /// Inspected attempts; one unconditional attempt follows them
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before attempt `attempt + 1` after an empty response.
    ///
    /// `75 + 50*i` ms, plus `100*(i-9)` ms once `i > 9`.
    pub fn empty_result_delay(&self, attempt: u32) -> Duration {
        let attempt = u64::from(attempt);
        let mut ms = 75 + 50 * attempt;
        if attempt > 9 {
            ms += 100 * (attempt - 9);
        }
        Duration::from_millis(ms).min(self.max_backoff)
    }

    /// Delay before attempt `attempt + 1` after a retryable error.
    ///
    /// Transport errors back off as `base * 2^i`; everything else waits the
    /// flat error delay.
    pub fn error_delay(&self, attempt: u32, error: &ProviderError) -> Duration {
        if error.is_transport() {
            let factor = 1u32 << attempt.min(16);
            self.transport_base.saturating_mul(factor).min(self.max_backoff)
        } else {
            self.error_delay.min(self.max_backoff)
        }
    }

    pub fn on_error(&self, attempt: u32, error: &ProviderError) -> RetryDecision {
        if error.is_terminal() {
            RetryDecision::Abort
        } else {
            RetryDecision::Retry(self.error_delay(attempt, error))
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.empty_result_delay(0), Duration::from_millis(75));
        assert_eq!(policy.empty_result_delay(1), Duration::from_millis(125));
        assert_eq!(policy.empty_result_delay(9), Duration::from_millis(525));
        assert_eq!(policy.empty_result_delay(10), Duration::from_millis(675));
        assert_eq!(policy.empty_result_delay(12), Duration::from_millis(975));
    }

    #[test]
    fn test_transport_backoff_is_exponential_and_capped() {
        let policy = RetryPolicy::default();
        let timeout = ProviderError::TransportTimeout;
        assert_eq!(policy.error_delay(0, &timeout), Duration::from_millis(100));
        assert_eq!(policy.error_delay(3, &timeout), Duration::from_millis(800));
        assert_eq!(policy.error_delay(12, &timeout), Duration::from_secs(5));
    }

    #[test]
    fn test_flat_delay_for_other_errors() {
        let policy = RetryPolicy::default();
        let other = ProviderError::Other("busy".into());
        assert_eq!(policy.error_delay(0, &other), Duration::from_millis(200));
        assert_eq!(policy.error_delay(5, &other), Duration::from_millis(200));
    }

    #[test]
    fn test_terminal_aborts() {
        let policy = RetryPolicy::new(8);
        assert_eq!(
            policy.on_error(0, &ProviderError::TargetNotFound("Node not found".into())),
            RetryDecision::Abort
        );
        assert!(matches!(
            policy.on_error(0, &ProviderError::TransportDisconnected("gone".into())),
            RetryDecision::Retry(_)
        ));
        assert_eq!(policy.max_attempts(), 8);
    }
}
