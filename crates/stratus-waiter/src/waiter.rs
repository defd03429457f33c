//! The resource-state waiter
//!
//! Polls a [`StateProbe`] until the observed lifecycle state satisfies the
//! termination predicate, sleeping per the backoff policy between attempts
//! and honoring the caller's cancellation token at every suspension point.

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use stratus_traits::{ProbeError, ResourceSnapshot, StateProbe};

use crate::backoff::{Attempt, BackoffPolicy, ExponentialBackoff};
use crate::config::{ConfigError, WaitBudget, WaiterConfig};
use crate::predicate::{PollDecision, StateMatcher, TerminationPredicate, WaitTarget};

/// Where a waiter is in its lifecycle. `Idle` precedes `execute()`; every
/// other phase is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Polling,
    Succeeded,
    TimedOut,
    TerminalFailure,
    Failed,
    Aborted,
}

/// Terminal failures of one wait.
///
/// Exactly one outcome is produced per [`Waiter::execute`] call: the final
/// snapshot on success, or one of these variants. Timeout carries the last
/// observed state so callers can log how far the resource got.
#[derive(Error, Debug)]
pub enum WaitError<S: fmt::Debug> {
    /// The waiter already produced an outcome; instances are single-use
    #[error("waiter already completed; create a new waiter for another wait")]
    AlreadyCompleted,

    /// Rejected configuration, surfaced through [`wait_for`]
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The resource reached a terminal state that is not a wait target.
    ///
    /// Distinct from a timeout: the resource can never reach the target, so
    /// retrying a wait with the same target is pointless.
    #[error("resource entered terminal state {state:?} after {attempts} attempts")]
    TerminalState {
        /// The terminal state observed
        state: S,
        /// Probe attempts completed, including the one that observed it
        attempts: u32,
    },

    /// The wait budget ran out while the resource was still transitional
    #[error("wait budget exhausted after {attempts} attempts over {elapsed:?}; last observed state {last_state:?}")]
    TimedOut {
        /// State seen on the final probe, if any probe completed
        last_state: Option<S>,
        /// Probe attempts completed
        attempts: u32,
        /// Wall-clock time spent waiting
        elapsed: Duration,
    },

    /// The caller cancelled the wait
    #[error("wait cancelled after {attempts} attempts")]
    Cancelled {
        /// State seen on the final probe before cancellation, if any
        last_state: Option<S>,
        /// Probe attempts completed before cancellation
        attempts: u32,
    },

    /// A probe failed and the transient-retry allowance could not recover it
    #[error("state probe failed after {attempts} completed attempts: {source}")]
    Probe {
        /// The probe error that ended the wait
        #[source]
        source: ProbeError,
        /// Probe attempts completed before the failure
        attempts: u32,
    },
}

enum FetchFailure {
    Cancelled,
    Probe(ProbeError),
}

/// Polling state machine bound to one probe and one termination predicate.
///
/// A waiter serves exactly one logical wait: `execute()` consumes its budget
/// and the instance is spent afterwards. Independent waiters share nothing,
/// so running N of them on N tasks is the expected batch pattern. The probe
/// is borrowed from the caller and must outlive the wait.
pub struct Waiter<'a, P, D> {
    probe: &'a P,
    predicate: D,
    config: WaiterConfig,
    policy: Box<dyn BackoffPolicy>,
    phase: Phase,
}

impl<'a, P, S> Waiter<'a, P, StateMatcher<S>>
where
    P: StateProbe,
    P::Snapshot: ResourceSnapshot<State = S>,
    S: Clone + PartialEq + fmt::Debug + Send + Sync,
{
    /// Create a waiter for a target set, with no terminal-failure states.
    ///
    /// This is the factory the generated per-resource layer binds: probe,
    /// target states, configuration.
    pub fn new(
        probe: &'a P,
        target: WaitTarget<S>,
        config: WaiterConfig,
    ) -> Result<Self, ConfigError> {
        Self::with_predicate(probe, StateMatcher::new(target), config)
    }
}

impl<'a, P, D, S> Waiter<'a, P, D>
where
    P: StateProbe,
    P::Snapshot: ResourceSnapshot<State = S>,
    D: TerminationPredicate<S>,
    S: Clone + PartialEq + fmt::Debug + Send + Sync,
{
    /// Create a waiter with a caller-supplied termination predicate.
    ///
    /// Use a [`StateMatcher`] carrying the resource's terminal-failure set,
    /// or any custom predicate.
    pub fn with_predicate(
        probe: &'a P,
        predicate: D,
        config: WaiterConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let policy = Box::new(ExponentialBackoff::new(config.backoff.clone())?);
        Ok(Self {
            probe,
            predicate,
            config,
            policy,
            phase: Phase::Idle,
        })
    }

    /// Replace the backoff policy derived from the config's spec.
    ///
    /// The replacement must satisfy the [`BackoffPolicy`] purity contract.
    pub fn with_backoff_policy(mut self, policy: impl BackoffPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Run the wait to its single terminal outcome.
    ///
    /// Loops probe → evaluate → sleep until the predicate decides, the
    /// budget runs out, a probe fails past its transient-retry allowance,
    /// or `cancel` fires. Both suspension points (the probe round-trip and
    /// the backoff sleep) race against the token, so cancellation takes
    /// effect promptly rather than at the next loop iteration.
    pub async fn execute(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<P::Snapshot, WaitError<S>> {
        if self.phase != Phase::Idle {
            return Err(WaitError::AlreadyCompleted);
        }
        self.phase = Phase::Polling;

        let started = Instant::now();
        let mut attempts: u32 = 0;
        let mut last_state: Option<S> = None;

        loop {
            if cancel.is_cancelled() {
                self.phase = Phase::Aborted;
                return Err(WaitError::Cancelled {
                    last_state,
                    attempts,
                });
            }

            let snapshot = match self.fetch_snapshot(cancel, attempts).await {
                Ok(snapshot) => snapshot,
                Err(FetchFailure::Cancelled) => {
                    self.phase = Phase::Aborted;
                    return Err(WaitError::Cancelled {
                        last_state,
                        attempts,
                    });
                }
                Err(FetchFailure::Probe(source)) => {
                    self.phase = Phase::Failed;
                    return Err(WaitError::Probe { source, attempts });
                }
            };
            attempts += 1;

            let state = snapshot.lifecycle_state().clone();
            tracing::debug!(
                attempt = attempts,
                state = ?state,
                resource = snapshot.resource_id(),
                "observed lifecycle state"
            );
            last_state = Some(state.clone());

            match self.predicate.evaluate(&state) {
                PollDecision::Success => {
                    self.phase = Phase::Succeeded;
                    tracing::debug!(attempts, "target state reached");
                    return Ok(snapshot);
                }
                PollDecision::TerminalFailure => {
                    self.phase = Phase::TerminalFailure;
                    tracing::warn!(
                        state = ?state,
                        attempts,
                        "resource entered a terminal state incompatible with the wait target"
                    );
                    return Err(WaitError::TerminalState { state, attempts });
                }
                PollDecision::Continue => {}
            }

            let elapsed = started.elapsed();
            if self.budget_exhausted(attempts, elapsed) {
                self.phase = Phase::TimedOut;
                return Err(WaitError::TimedOut {
                    last_state,
                    attempts,
                    elapsed,
                });
            }

            // Delay keyed by the ordinal of the attempt that just completed.
            let mut delay = self.policy.delay_for(Attempt::new(attempts - 1, elapsed));
            if let WaitBudget::Elapsed(max) = self.config.budget {
                // Wake at the deadline instead of oversleeping it.
                delay = delay.min(max.saturating_sub(elapsed));
            }
            tracing::trace!(?delay, "sleeping before next probe");
            tokio::select! {
                // Cancellation outranks every other outcome once observed.
                biased;
                _ = cancel.cancelled() => {
                    self.phase = Phase::Aborted;
                    return Err(WaitError::Cancelled {
                        last_state,
                        attempts,
                    });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn budget_exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        match self.config.budget {
            WaitBudget::Attempts(max) => attempts >= max,
            WaitBudget::Elapsed(max) => elapsed >= max,
        }
    }

    /// One probe round-trip, retrying transient errors within the allowance.
    ///
    /// A probe error is never a terminal lifecycle failure; it either
    /// recovers within the allowance or surfaces as [`WaitError::Probe`].
    async fn fetch_snapshot(
        &self,
        cancel: &CancellationToken,
        attempt: u32,
    ) -> Result<P::Snapshot, FetchFailure> {
        let allowance = self.config.transient_retry;
        let mut retries: u32 = 0;
        loop {
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchFailure::Cancelled),
                result = self.probe.fetch() => result,
            };
            match fetched {
                Ok(snapshot) => return Ok(snapshot),
                Err(err) if err.is_transient() && retries < allowance.max_retries => {
                    retries += 1;
                    let delay = err.retry_after().unwrap_or(allowance.delay);
                    tracing::debug!(
                        attempt,
                        retries,
                        error = %err,
                        ?delay,
                        "transient probe error, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(FetchFailure::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(err) => {
                    if err.is_transient() {
                        tracing::warn!(
                            attempt,
                            retries,
                            error = %err,
                            "transient probe retries exhausted"
                        );
                    }
                    return Err(FetchFailure::Probe(err));
                }
            }
        }
    }
}

/// One-shot wait: construct a waiter and run it to its outcome.
///
/// Configuration errors surface through the same error type, so callers that
/// do not need to hold the waiter can use a single `?`.
pub async fn wait_for<P, S>(
    probe: &P,
    target: WaitTarget<S>,
    config: WaiterConfig,
    cancel: &CancellationToken,
) -> Result<P::Snapshot, WaitError<S>>
where
    P: StateProbe,
    P::Snapshot: ResourceSnapshot<State = S>,
    S: Clone + PartialEq + fmt::Debug + Send + Sync,
{
    let mut waiter = Waiter::new(probe, target, config)?;
    waiter.execute(cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::BackoffSpec;
    use stratus_testing::ScriptedProbe;

    fn fast_config() -> WaiterConfig {
        WaiterConfig::new()
            .with_backoff(
                BackoffSpec::new()
                    .with_base_delay(Duration::from_millis(10))
                    .with_jitter(0.0),
            )
            .with_max_attempts(16)
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_is_single_use() {
        let probe = ScriptedProbe::always("Available");
        let cancel = CancellationToken::new();
        let mut waiter =
            Waiter::new(&probe, WaitTarget::state("Available"), fast_config()).unwrap();

        assert!(waiter.execute(&cancel).await.is_ok());

        let second = waiter.execute(&cancel).await;
        assert!(matches!(second, Err(WaitError::AlreadyCompleted)));
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pre_cancelled_token_issues_no_probe() {
        let probe = ScriptedProbe::always("Available");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut waiter =
            Waiter::new(&probe, WaitTarget::state("Available"), fast_config()).unwrap();
        let result = waiter.execute(&cancel).await;

        assert!(matches!(
            result,
            Err(WaitError::Cancelled {
                attempts: 0,
                last_state: None,
            })
        ));
        assert_eq!(probe.calls(), 0);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let probe = ScriptedProbe::always("Available");
        let config = WaiterConfig::new().with_max_attempts(0);

        let result = Waiter::new(&probe, WaitTarget::state("Available"), config);
        assert!(matches!(result, Err(ConfigError::EmptyBudget)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_surfaces_config_error() {
        let probe = ScriptedProbe::always("Available");
        let cancel = CancellationToken::new();
        let target = WaitTarget::state("Available");
        let config = WaiterConfig::new().with_backoff(BackoffSpec::new().with_jitter(2.0));

        let result = wait_for(&probe, target, config, &cancel).await;
        assert!(matches!(result, Err(WaitError::Config(_))));
        assert_eq!(probe.calls(), 0);
    }

    #[test]
    fn test_wait_error_display_carries_diagnostics() {
        let err: WaitError<&str> = WaitError::TimedOut {
            last_state: Some("Provisioning"),
            attempts: 7,
            elapsed: Duration::from_secs(90),
        };
        let message = err.to_string();
        assert!(message.contains("7 attempts"));
        assert!(message.contains("Provisioning"));
    }
}
