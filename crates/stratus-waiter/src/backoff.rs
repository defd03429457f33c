//! Poll-delay policies
//!
//! Computes the delay between successive poll attempts. Policies are pure
//! functions of the attempt, so one policy value can be shared by any number
//! of concurrent waiters.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ConfigError;

/// One completed poll attempt: its ordinal and the wall-clock time the wait
/// has been running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    index: u32,
    elapsed: Duration,
}

impl Attempt {
    /// Create an attempt record (ordinals start at 0)
    pub fn new(index: u32, elapsed: Duration) -> Self {
        Self { index, elapsed }
    }

    /// Ordinal of this attempt, 0-indexed
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Wall-clock time since the wait began
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Backoff parameters for the delays between poll attempts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffSpec {
    /// Delay after the first attempt
    pub base_delay: Duration,
    /// Multiplier applied per attempt (typically 2.0)
    pub multiplier: f64,
    /// Maximum delay cap
    pub max_delay: Duration,
    /// Jitter fraction (0.0 to 1.0), applied as ±fraction of the delay
    pub jitter: f64,
}

impl Default for BackoffSpec {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: 0.1,
        }
    }
}

impl BackoffSpec {
    /// Create a new backoff spec with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the per-attempt multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Set the maximum delay cap
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the jitter fraction
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Aggressive spec for resources that settle quickly
    pub fn aggressive() -> Self {
        Self {
            base_delay: Duration::from_millis(100),
            multiplier: 1.5,
            max_delay: Duration::from_secs(5),
            jitter: 0.1,
        }
    }

    /// Conservative spec for slow provisioning operations
    pub fn conservative() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            jitter: 0.3,
        }
    }

    /// Check the parameters for internal consistency.
    ///
    /// A zero base delay is accepted: it configures an immediate first
    /// retry, which callers must opt into explicitly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::InvalidBackoff(format!(
                "multiplier must be a finite value >= 1.0, got {}",
                self.multiplier
            )));
        }
        if !self.jitter.is_finite() || !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::InvalidBackoff(format!(
                "jitter must be within [0.0, 1.0], got {}",
                self.jitter
            )));
        }
        if self.max_delay < self.base_delay {
            return Err(ConfigError::InvalidBackoff(format!(
                "max delay {:?} is below base delay {:?}",
                self.max_delay, self.base_delay
            )));
        }
        Ok(())
    }
}

/// Computes the delay to apply after a poll attempt that did not reach a
/// decision.
///
/// Implementations must be pure: no interior mutability and no I/O, so a
/// single policy value shared across concurrent waiters introduces no data
/// race. Jitter drawn from thread-local randomness is the one sanctioned
/// exception. The computed delay is never negative and never exceeds the
/// policy's cap.
pub trait BackoffPolicy: Send + Sync {
    /// Delay to sleep after the given completed attempt
    fn delay_for(&self, attempt: Attempt) -> Duration;
}

/// Exponential backoff: `min(cap, base * multiplier^attempt)`, with optional
/// jitter
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    spec: BackoffSpec,
}

impl ExponentialBackoff {
    /// Create a policy from a validated spec
    pub fn new(spec: BackoffSpec) -> Result<Self, ConfigError> {
        spec.validate()?;
        Ok(Self { spec })
    }

    /// Create with the default spec
    pub fn default_spec() -> Self {
        // Default parameters always satisfy validate()
        Self {
            spec: BackoffSpec::default(),
        }
    }

    /// The spec this policy was built from
    pub fn spec(&self) -> &BackoffSpec {
        &self.spec
    }

    fn apply_jitter(&self, delay: f64) -> f64 {
        let range = delay * self.spec.jitter;
        if range <= 0.0 {
            return delay;
        }
        let mut rng = rand::thread_rng();
        delay + rng.gen_range(-range..range)
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn delay_for(&self, attempt: Attempt) -> Duration {
        let cap = self.spec.max_delay.as_secs_f64();
        let raw = self.spec.base_delay.as_secs_f64() * self.spec.multiplier.powf(f64::from(attempt.index()));
        let jittered = self.apply_jitter(raw.min(cap));
        Duration::from_secs_f64(jittered.clamp(0.0, cap))
    }
}

/// Constant delay between attempts, regardless of the attempt ordinal
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    /// Create a fixed-delay policy
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl BackoffPolicy for FixedBackoff {
    fn delay_for(&self, _attempt: Attempt) -> Duration {
        self.delay
    }
}
