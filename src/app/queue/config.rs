//! Download queue configuration
//!
//! Retry policy and tick cadence for [`DownloadQueue`](super::DownloadQueue),
//! with a builder and presets for the usual cases.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::queue as defaults;
use crate::errors::{ConfigError, ConfigResult};

/// Behaviour of the download queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Progress tick cadence
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    /// Automatic retries of a failed transfer
    pub max_retries: u32,
    /// Base delay before the first automatic retry, doubled per failure
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
    /// Random spread added to retry delays (0.0-1.0)
    pub retry_jitter: f64,
    /// Samples kept for throughput calculation
    pub rate_window: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        ConfigPresets::production()
    }
}

impl QueueConfig {
    /// Check that values are usable
    pub fn validate(&self) -> ConfigResult<()> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "queue.tick_interval".to_string(),
                value: format!("{:?}", self.tick_interval),
                reason: "Tick interval must be greater than zero".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.retry_jitter) {
            return Err(ConfigError::InvalidValue {
                field: "queue.retry_jitter".to_string(),
                value: self.retry_jitter.to_string(),
                reason: "Jitter must be between 0.0 and 1.0".to_string(),
            });
        }
        if self.rate_window < 2 {
            return Err(ConfigError::InvalidValue {
                field: "queue.rate_window".to_string(),
                value: self.rate_window.to_string(),
                reason: "At least two samples are needed to compute a rate".to_string(),
            });
        }
        Ok(())
    }

    /// Delay before the automatic retry following the `failures`-th failure
    ///
    /// `retry_delay * 2^(failures-1)`, without jitter.
    pub fn backoff_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        self.retry_delay.saturating_mul(1 << exponent)
    }

    /// [`backoff_for`](Self::backoff_for) plus random jitter
    pub fn jittered_backoff_for(&self, failures: u32) -> Duration {
        let base = self.backoff_for(failures);
        base + base.mul_f64(self.retry_jitter * fastrand::f64())
    }
}

/// Builder for [`QueueConfig`]
#[derive(Debug, Clone, Default)]
pub struct QueueConfigBuilder {
    tick_interval: Option<Duration>,
    max_retries: Option<u32>,
    retry_delay: Option<Duration>,
    retry_jitter: Option<f64>,
    rate_window: Option<usize>,
}

impl QueueConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    pub fn retry_jitter(mut self, jitter: f64) -> Self {
        self.retry_jitter = Some(jitter);
        self
    }

    pub fn rate_window(mut self, window: usize) -> Self {
        self.rate_window = Some(window);
        self
    }

    pub fn build(self) -> QueueConfig {
        QueueConfig {
            tick_interval: self.tick_interval.unwrap_or(defaults::TICK_INTERVAL),
            max_retries: self.max_retries.unwrap_or(defaults::MAX_RETRIES),
            retry_delay: self.retry_delay.unwrap_or(defaults::RETRY_DELAY),
            retry_jitter: self.retry_jitter.unwrap_or(defaults::RETRY_JITTER_FACTOR),
            rate_window: self
                .rate_window
                .unwrap_or(defaults::RATE_CALCULATION_WINDOW),
        }
    }
}

/// Configuration presets
pub struct ConfigPresets;

impl ConfigPresets {
    /// Defaults for interactive and headless use
    pub fn production() -> QueueConfig {
        QueueConfigBuilder::new().build()
    }

    /// Never retries automatically
    pub fn no_retry() -> QueueConfig {
        QueueConfigBuilder::new().max_retries(0).build()
    }

    /// Short delays and no jitter, for tests
    pub fn testing() -> QueueConfig {
        QueueConfigBuilder::new()
            .tick_interval(Duration::from_millis(10))
            .retry_delay(Duration::from_millis(20))
            .retry_jitter(0.0)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.tick_interval, Duration::from_millis(100));
        assert_eq!(config.max_retries, defaults::MAX_RETRIES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backoff_doubles() {
        let config = QueueConfigBuilder::new()
            .retry_delay(Duration::from_secs(30))
            .build();
        assert_eq!(config.backoff_for(1), Duration::from_secs(30));
        assert_eq!(config.backoff_for(2), Duration::from_secs(60));
        assert_eq!(config.backoff_for(3), Duration::from_secs(120));
    }

    #[test]
    fn test_jitter_bounds() {
        let config = QueueConfigBuilder::new()
            .retry_delay(Duration::from_secs(10))
            .retry_jitter(0.5)
            .build();
        for _ in 0..20 {
            let delay = config.jittered_backoff_for(1);
            assert!(delay >= Duration::from_secs(10));
            assert!(delay <= Duration::from_secs(15));
        }
    }

    #[test]
    fn test_validation() {
        let mut config = ConfigPresets::testing();
        assert!(config.validate().is_ok());

        config.retry_jitter = 1.5;
        assert!(config.validate().is_err());

        config = ConfigPresets::testing();
        config.tick_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
