//! Configuration structures for a negotiation participant

use negotiation_statemachine::{ExponentialWaitStrategy, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NegotiationConfig {
    /// Our participant id, used as the provider id on agreements
    #[serde(default)]
    pub participant_id: String,

    #[serde(default)]
    pub state_machine: StateMachineConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NegotiationConfig {
    /// Retry policy applied to every outbound message
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            Duration::from_millis(self.retry.base_delay_ms),
            Duration::from_millis(self.retry.max_delay_ms),
        )
    }

    /// Idle backoff between ticks that found no work
    pub fn wait_strategy(&self) -> ExponentialWaitStrategy {
        ExponentialWaitStrategy::new(
            Duration::from_millis(self.state_machine.backoff_base_ms),
            Duration::from_millis(self.state_machine.backoff_max_ms),
        )
    }
}

/// Processing loop configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMachineConfig {
    /// Negotiations leased per state per tick
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// How long a lease stays valid before another worker may reclaim it
    #[serde(default = "default_lease_duration_ms")]
    pub lease_duration_ms: u64,

    /// First idle wait
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Ceiling for the idle wait
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl Default for StateMachineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            lease_duration_ms: default_lease_duration_ms(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

/// Send retry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries before a negotiation is terminated
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_retry_base_delay_ms(),
            max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

/// Provider-only behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    /// Agree to consumer requests without waiting for an external decision
    #[serde(default)]
    pub auto_agree_requested: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

// Default value functions
fn default_batch_size() -> usize {
    5
}

fn default_lease_duration_ms() -> u64 {
    60_000
}

fn default_backoff_base_ms() -> u64 {
    100
}

fn default_backoff_max_ms() -> u64 {
    5_000
}

fn default_max_retries() -> u32 {
    7
}

fn default_retry_base_delay_ms() -> u64 {
    1_000
}

fn default_retry_max_delay_ms() -> u64 {
    60_000
}

fn default_log_level() -> String {
    "info".to_string()
}
