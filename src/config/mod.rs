//! # Stratus Configuration System
//!
//! Typed, validated configuration for the command engine. Every knob has a
//! working default, so an engine built with `StratusConfig::default()` runs
//! without any file present; TOML files and `STRATUS_`-prefixed environment
//! variables layer on top through [`ConfigManager`].
//!
//! ## Usage
//!
//! ```rust
//! use stratus_core::config::StratusConfig;
//!
//! let config = StratusConfig::default();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.orchestration.retry.max_attempts, 3);
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::system;
use crate::runtime::{RetryPolicy, RuntimeDefaults};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring stratus.toml.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StratusConfig {
    /// Environment identity and versioning.
    #[serde(default)]
    pub system: SystemConfig,

    /// Retry, lock, and provider dispatch settings.
    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    /// Lifecycle event publishing.
    #[serde(default)]
    pub events: EventsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    pub environment: String,
    pub version: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            version: system::STRATUS_CORE_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OrchestrationConfig {
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub locks: LocksConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Default retry policy applied to activity invocations that do not choose
/// their own.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay_ms,
            max_delay_ms: policy.max_delay_ms,
            backoff_multiplier: policy.backoff_multiplier,
            jitter: policy.jitter,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
            backoff_multiplier: self.backoff_multiplier,
            jitter: self.jitter,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LocksConfig {
    /// Bound on lock acquisition in milliseconds; absent waits indefinitely.
    pub acquire_timeout_ms: Option<u64>,
}

impl LocksConfig {
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// How long the dispatcher waits for each provider to acknowledge.
    pub ack_timeout_ms: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: 30_000,
        }
    }
}

impl ProvidersConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Broadcast channel capacity for lifecycle events.
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1000,
        }
    }
}

impl StratusConfig {
    /// Check cross-field constraints. Called by the loader after merging, and
    /// worth calling on hand-built configs too.
    pub fn validate(&self) -> ConfigResult<()> {
        let retry = &self.orchestration.retry;
        if retry.max_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "orchestration.retry.max_attempts",
                retry.max_attempts,
                "at least one attempt is required",
            ));
        }
        if retry.backoff_multiplier < 1.0 {
            return Err(ConfigurationError::invalid_value(
                "orchestration.retry.backoff_multiplier",
                retry.backoff_multiplier,
                "backoff must not shrink between attempts",
            ));
        }
        if retry.max_delay_ms < retry.base_delay_ms {
            return Err(ConfigurationError::invalid_value(
                "orchestration.retry.max_delay_ms",
                retry.max_delay_ms,
                "cap must be at least the base delay",
            ));
        }
        if self.orchestration.locks.acquire_timeout_ms == Some(0) {
            return Err(ConfigurationError::invalid_value(
                "orchestration.locks.acquire_timeout_ms",
                0,
                "a zero timeout can never acquire; omit it to wait indefinitely",
            ));
        }
        if self.orchestration.providers.ack_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "orchestration.providers.ack_timeout_ms",
                0,
                "providers need a nonzero acknowledgement window",
            ));
        }
        if self.events.channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "events.channel_capacity",
                0,
                "the event channel needs capacity for at least one event",
            ));
        }
        Ok(())
    }

    /// The runtime defaults the engine hands to every orchestration context.
    pub fn runtime_defaults(&self) -> RuntimeDefaults {
        RuntimeDefaults {
            lock_timeout: self.orchestration.locks.acquire_timeout(),
            provider_ack_timeout: self.orchestration.providers.ack_timeout(),
            retry: self.orchestration.retry.policy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(StratusConfig::default().validate().is_ok());
    }

    #[test]
    fn runtime_defaults_carry_configured_values() {
        let mut config = StratusConfig::default();
        config.orchestration.locks.acquire_timeout_ms = Some(5000);
        config.orchestration.providers.ack_timeout_ms = 1500;
        config.orchestration.retry.max_attempts = 7;

        let defaults = config.runtime_defaults();
        assert_eq!(defaults.lock_timeout, Some(Duration::from_millis(5000)));
        assert_eq!(defaults.provider_ack_timeout, Duration::from_millis(1500));
        assert_eq!(defaults.retry.max_attempts, 7);
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let mut config = StratusConfig::default();
        config.orchestration.retry.max_attempts = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { field, .. })
                if field == "orchestration.retry.max_attempts"
        ));
    }

    #[test]
    fn shrinking_backoff_is_rejected() {
        let mut config = StratusConfig::default();
        config.orchestration.retry.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_lock_timeout_is_rejected() {
        let mut config = StratusConfig::default();
        config.orchestration.locks.acquire_timeout_ms = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn sections_deserialize_from_partial_toml() {
        let parsed: StratusConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[orchestration.retry]\nmax_attempts = 5\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(parsed.orchestration.retry.max_attempts, 5);
        // Untouched sections keep their defaults.
        assert_eq!(parsed.orchestration.providers.ack_timeout_ms, 30_000);
        assert_eq!(parsed.events.channel_capacity, 1000);
    }
}
