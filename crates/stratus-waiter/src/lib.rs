//! # Stratus Waiter
//!
//! Resource-state waiters for the Stratus control-plane SDK.
//!
//! Control-plane operations are asynchronous: a create call returns while
//! the gateway or circuit is still `Provisioning`. This crate provides the
//! polling state machine that suspends until the resource reaches a desired
//! lifecycle state:
//!
//! - **Waiter**: probe → evaluate → sleep, until a single terminal outcome
//! - **Backoff policies**: exponential with jitter, or fixed delay
//! - **Termination predicates**: target-state sets plus resource-specific
//!   terminal-failure sets, or fully custom predicates
//! - **Cancellation**: every suspension point races the caller's token
//!
//! ## Quick Start
//!
//! ```ignore
//! use stratus_waiter::{WaitTarget, Waiter, WaiterConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(probe: impl stratus_traits::StateProbe) -> Result<(), Box<dyn std::error::Error>> {
//! let cancel = CancellationToken::new();
//! let mut waiter = Waiter::new(
//!     &probe,
//!     WaitTarget::state("Available"),
//!     WaiterConfig::default(),
//! )?;
//!
//! let snapshot = waiter.execute(&cancel).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Terminal-failure states
//!
//! A resource awaiting `Available` may instead reach `Failed`. Supply the
//! resource's terminal states so the wait stops immediately instead of
//! polling out its budget:
//!
//! ```ignore
//! use stratus_waiter::{StateMatcher, WaitTarget, Waiter, WaiterConfig};
//!
//! let matcher = StateMatcher::new(WaitTarget::state("Available"))
//!     .with_terminal_states(["Failed", "Terminated"]);
//! let mut waiter = Waiter::with_predicate(&probe, matcher, WaiterConfig::default())?;
//! ```
//!
//! ## Batch waits
//!
//! One waiter serves one wait. To await many resources, run one waiter per
//! task; waiters share no mutable state, and a [`BackoffPolicy`] or
//! [`TerminationPredicate`] value may be shared by reference because both
//! are pure.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backoff;
pub mod config;
pub mod predicate;
pub mod waiter;

// Re-export main types
pub use backoff::{Attempt, BackoffPolicy, BackoffSpec, ExponentialBackoff, FixedBackoff};
pub use config::{ConfigError, TransientRetry, WaitBudget, WaiterConfig};
pub use predicate::{PollDecision, StateMatcher, TerminationPredicate, WaitTarget};
pub use waiter::{wait_for, WaitError, Waiter};
