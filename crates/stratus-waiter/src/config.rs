//! Waiter configuration
//!
//! Immutable parameters consumed at waiter construction: the backoff spec,
//! the wait budget, and the transient-retry allowance.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::backoff::BackoffSpec;

/// Errors detected when a waiter is constructed.
///
/// Never retried: a rejected configuration fails fast, before any probe is
/// issued.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The wait target set was empty
    #[error("wait target must contain at least one state")]
    EmptyWaitTarget,

    /// The backoff parameters were inconsistent
    #[error("invalid backoff parameters: {0}")]
    InvalidBackoff(String),

    /// The wait budget permits no attempt at all
    #[error("wait budget must allow at least one attempt")]
    EmptyBudget,
}

/// Ceiling for one wait: a probe-attempt count or a wall-clock duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitBudget {
    /// Stop after this many probe attempts
    Attempts(u32),
    /// Stop once this much wall-clock time has elapsed
    Elapsed(Duration),
}

impl WaitBudget {
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Attempts(0) => Err(ConfigError::EmptyBudget),
            Self::Elapsed(d) if d.is_zero() => Err(ConfigError::EmptyBudget),
            _ => Ok(()),
        }
    }
}

/// Bounded retry of transient probe errors within a single poll attempt.
///
/// Distinct from the lifecycle-polling backoff: these retries cover the
/// probe round-trip itself, use a short fixed delay, and defer to a
/// server-provided retry-after hint when the error carries one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransientRetry {
    /// Retries allowed per poll attempt before the error is surfaced
    pub max_retries: u32,
    /// Delay between transient retries
    pub delay: Duration,
}

impl Default for TransientRetry {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl TransientRetry {
    /// Create with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry ceiling
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the inter-retry delay
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Disable transient retries: every probe error surfaces immediately
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }
}

/// Immutable parameters for one waiter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaiterConfig {
    /// Delay policy between poll attempts
    pub backoff: BackoffSpec,
    /// When to give up while the resource is still transitional
    pub budget: WaitBudget,
    /// Transient probe-error allowance
    pub transient_retry: TransientRetry,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffSpec::default(),
            budget: WaitBudget::Elapsed(Duration::from_secs(1200)),
            transient_retry: TransientRetry::default(),
        }
    }
}

impl WaiterConfig {
    /// Create a config with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backoff spec
    pub fn with_backoff(mut self, backoff: BackoffSpec) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the wait budget
    pub fn with_budget(mut self, budget: WaitBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Shorthand for an attempt-count budget
    pub fn with_max_attempts(self, attempts: u32) -> Self {
        self.with_budget(WaitBudget::Attempts(attempts))
    }

    /// Shorthand for an elapsed-time budget
    pub fn with_max_elapsed(self, elapsed: Duration) -> Self {
        self.with_budget(WaitBudget::Elapsed(elapsed))
    }

    /// Set the transient-retry allowance
    pub fn with_transient_retry(mut self, retry: TransientRetry) -> Self {
        self.transient_retry = retry;
        self
    }

    /// Config for operations that settle in seconds (instance actions,
    /// attachment state flips)
    pub fn quick() -> Self {
        Self {
            backoff: BackoffSpec::aggressive(),
            budget: WaitBudget::Elapsed(Duration::from_secs(120)),
            transient_retry: TransientRetry::default(),
        }
    }

    /// Config for provisioning operations that can run for hours (dedicated
    /// circuits, cross-region copies)
    pub fn long_running() -> Self {
        Self {
            backoff: BackoffSpec::conservative(),
            budget: WaitBudget::Elapsed(Duration::from_secs(2 * 60 * 60)),
            transient_retry: TransientRetry::default().with_max_retries(5),
        }
    }

    /// Check the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backoff.validate()?;
        self.budget.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WaiterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.budget, WaitBudget::Elapsed(Duration::from_secs(1200)));
        assert_eq!(config.transient_retry.max_retries, 3);
    }

    #[test]
    fn test_builder_chaining() {
        let config = WaiterConfig::new()
            .with_backoff(BackoffSpec::aggressive())
            .with_max_attempts(10)
            .with_transient_retry(TransientRetry::none());

        assert_eq!(config.budget, WaitBudget::Attempts(10));
        assert_eq!(config.transient_retry.max_retries, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(WaiterConfig::quick().validate().is_ok());
        assert!(WaiterConfig::long_running().validate().is_ok());
    }

    #[test]
    fn test_zero_attempt_budget_rejected() {
        let config = WaiterConfig::new().with_max_attempts(0);
        assert_eq!(config.validate(), Err(ConfigError::EmptyBudget));
    }

    #[test]
    fn test_zero_elapsed_budget_rejected() {
        let config = WaiterConfig::new().with_max_elapsed(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::EmptyBudget));
    }

    #[test]
    fn test_invalid_backoff_rejected() {
        let config = WaiterConfig::new().with_backoff(BackoffSpec::new().with_multiplier(0.0));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBackoff(_))
        ));
    }

    #[test]
    fn test_transient_retry_builder() {
        let retry = TransientRetry::new()
            .with_max_retries(7)
            .with_delay(Duration::from_millis(250));
        assert_eq!(retry.max_retries, 7);
        assert_eq!(retry.delay, Duration::from_millis(250));
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = WaiterConfig::quick().with_max_attempts(5);
        let json = serde_json::to_string(&config).unwrap();
        let restored: WaiterConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.budget, WaitBudget::Attempts(5));
        assert_eq!(restored.backoff.base_delay, config.backoff.base_delay);
    }
}
