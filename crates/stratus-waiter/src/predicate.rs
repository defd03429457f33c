//! Termination predicates
//!
//! Decide, per observed lifecycle state, whether a wait is done.

use std::fmt;

use crate::config::ConfigError;

/// Decision after observing one lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// Transitional state, keep polling
    Continue,
    /// The observed state is one of the wait targets
    Success,
    /// The observed state is terminal and not a target; the wait can never
    /// succeed
    TerminalFailure,
}

/// Non-empty set of lifecycle states the caller wants to observe.
///
/// Immutable once the wait begins.
#[derive(Debug, Clone)]
pub struct WaitTarget<S> {
    states: Vec<S>,
}

impl<S> WaitTarget<S>
where
    S: Clone + PartialEq + fmt::Debug + Send + Sync,
{
    /// Create a target set, rejecting an empty one
    pub fn new(states: impl IntoIterator<Item = S>) -> Result<Self, ConfigError> {
        let states: Vec<S> = states.into_iter().collect();
        if states.is_empty() {
            return Err(ConfigError::EmptyWaitTarget);
        }
        Ok(Self { states })
    }

    /// Create a single-state target
    pub fn state(state: S) -> Self {
        Self {
            states: vec![state],
        }
    }

    /// Check whether the observed state is a target
    pub fn contains(&self, state: &S) -> bool {
        self.states.contains(state)
    }

    /// The target states
    pub fn states(&self) -> &[S] {
        &self.states
    }
}

/// Decides whether an observed state ends the wait.
///
/// Implementations shared across concurrent waiters must be stateless:
/// evaluation takes `&self` and must not mutate.
pub trait TerminationPredicate<S>: Send + Sync {
    /// Classify one observed state
    fn evaluate(&self, observed: &S) -> PollDecision;
}

/// Stock predicate: a target set plus a resource-specific terminal-failure
/// set.
///
/// Terminal-failure states are supplied by the caller per resource type;
/// the core never hardcodes them. A state present in both sets counts as a
/// target (waiting for `Terminated` during a delete is the usual case).
#[derive(Debug, Clone)]
pub struct StateMatcher<S> {
    target: WaitTarget<S>,
    terminal: Vec<S>,
}

impl<S> StateMatcher<S>
where
    S: Clone + PartialEq + fmt::Debug + Send + Sync,
{
    /// Create a matcher with no terminal-failure states
    pub fn new(target: WaitTarget<S>) -> Self {
        Self {
            target,
            terminal: Vec::new(),
        }
    }

    /// Set the states from which the resource can never reach a target
    pub fn with_terminal_states(mut self, states: impl IntoIterator<Item = S>) -> Self {
        self.terminal = states.into_iter().collect();
        self
    }

    /// The target set
    pub fn target(&self) -> &WaitTarget<S> {
        &self.target
    }
}

impl<S> TerminationPredicate<S> for StateMatcher<S>
where
    S: Clone + PartialEq + fmt::Debug + Send + Sync,
{
    fn evaluate(&self, observed: &S) -> PollDecision {
        if self.target.contains(observed) {
            PollDecision::Success
        } else if self.terminal.contains(observed) {
            PollDecision::TerminalFailure
        } else {
            PollDecision::Continue
        }
    }
}
