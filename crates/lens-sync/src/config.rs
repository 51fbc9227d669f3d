//! Engine configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Synchronization engine configuration.
///
/// Durations (de)serialize as integer milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Per-attempt provider timeout
    #[serde(with = "millis")]
    pub provider_timeout: Duration,
    /// Standard retry budget
    pub max_attempts: u32,
    /// Retry budget in extended mode
    pub extended_max_attempts: u32,
    /// Use the extended budget
    pub extended_retries: bool,
    /// Flat delay after a retryable non-transport error
    #[serde(with = "millis")]
    pub error_retry_delay: Duration,
    /// Base of the exponential backoff after transport errors
    #[serde(with = "millis")]
    pub transport_backoff_base: Duration,
    /// Upper bound for any computed delay
    #[serde(with = "millis")]
    pub max_backoff: Duration,
    /// Quiet period before a mutation-driven re-fetch
    #[serde(with = "millis")]
    pub mutation_debounce: Duration,
    /// Quiet period before following an `aria-activedescendant` change
    #[serde(with = "millis")]
    pub active_descendant_debounce: Duration,
    /// Delay before the loading presentation
    #[serde(with = "millis")]
    pub loading_delay: Duration,
    /// Provider can reach into shadow trees
    pub shadow_bridge: bool,
    /// Initial state of the enable toggle
    pub enabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(5),
            max_attempts: 8,
            extended_max_attempts: 20,
            extended_retries: false,
            error_retry_delay: Duration::from_millis(200),
            transport_backoff_base: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            mutation_debounce: Duration::from_millis(150),
            active_descendant_debounce: Duration::from_millis(120),
            loading_delay: Duration::from_millis(100),
            shadow_bridge: false,
            enabled: true,
        }
    }
}

impl SyncConfig {
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Attempt budget for the configured mode
    pub fn attempt_budget(&self) -> u32 {
        if self.extended_retries {
            self.extended_max_attempts
        } else {
            self.max_attempts
        }
    }
}

/// Builder for [`SyncConfig`]
#[derive(Debug, Default)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.config.provider_timeout = timeout;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn extended_retries(mut self, extended: bool) -> Self {
        self.config.extended_retries = extended;
        self
    }

    pub fn error_retry_delay(mut self, delay: Duration) -> Self {
        self.config.error_retry_delay = delay;
        self
    }

    pub fn transport_backoff_base(mut self, base: Duration) -> Self {
        self.config.transport_backoff_base = base;
        self
    }

    pub fn max_backoff(mut self, max: Duration) -> Self {
        self.config.max_backoff = max;
        self
    }

    pub fn mutation_debounce(mut self, debounce: Duration) -> Self {
        self.config.mutation_debounce = debounce;
        self
    }

    pub fn active_descendant_debounce(mut self, debounce: Duration) -> Self {
        self.config.active_descendant_debounce = debounce;
        self
    }

    pub fn loading_delay(mut self, delay: Duration) -> Self {
        self.config.loading_delay = delay;
        self
    }

    pub fn shadow_bridge(mut self, bridge: bool) -> Self {
        self.config.shadow_bridge = bridge;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    pub fn build(self) -> SyncConfig {
        self.config
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.attempt_budget(), 8);
        assert_eq!(config.mutation_debounce, Duration::from_millis(150));
        assert_eq!(config.provider_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_extended_budget() {
        let config = SyncConfig::builder().extended_retries(true).build();
        assert_eq!(config.attempt_budget(), 20);
    }
}
