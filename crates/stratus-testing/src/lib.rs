//! # Stratus Testing Infrastructure
//!
//! Test doubles and generators for exercising waiters without a live
//! control plane:
//!
//! - [`ScriptedProbe`] - replays a scripted sequence of snapshots and probe
//!   errors, counting calls
//! - [`StubResource`] - a snapshot double exposing any lifecycle token
//! - Property generators for backoff parameters
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stratus_testing::{ProbeStep, ScriptedProbe};
//!
//! let probe = ScriptedProbe::states(["Provisioning", "Provisioning", "Available"]);
//! // hand the probe to a waiter, then:
//! assert_eq!(probe.calls(), 3);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use proptest::prelude::*;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use stratus_traits::{HasRequestId, ProbeError, ProbeResult, ResourceSnapshot, StateProbe};

// ============================================================================
// Snapshot double
// ============================================================================

/// Snapshot double exposing a scripted lifecycle state
#[derive(Debug, Clone)]
pub struct StubResource<S> {
    state: S,
    id: Option<String>,
    request_id: Option<String>,
}

impl<S> StubResource<S> {
    /// Create a snapshot in the given state
    pub fn new(state: S) -> Self {
        Self {
            state,
            id: None,
            request_id: None,
        }
    }

    /// Attach a resource id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach a service request id
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl<S> ResourceSnapshot for StubResource<S>
where
    S: Clone + PartialEq + fmt::Debug + Send + Sync,
{
    type State = S;

    fn lifecycle_state(&self) -> &Self::State {
        &self.state
    }

    fn resource_id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl<S> HasRequestId for StubResource<S> {
    fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

// ============================================================================
// Scripted probe
// ============================================================================

/// One scripted probe response
#[derive(Debug)]
pub enum ProbeStep<S> {
    /// Respond with a snapshot in this state
    State(S),
    /// Fail with this error
    Error(ProbeError),
}

/// Probe double that replays a scripted sequence of responses.
///
/// Each `fetch` consumes the next step and bumps the call counter. A probe
/// built with [`ScriptedProbe::always`] repeats its state forever; a probe
/// built from a finite script panics when fetched past its end, which turns
/// an over-polling waiter into a loud test failure.
pub struct ScriptedProbe<S> {
    script: Mutex<VecDeque<ProbeStep<S>>>,
    repeat: Option<S>,
    calls: AtomicU32,
}

impl<S> ScriptedProbe<S>
where
    S: Clone + PartialEq + fmt::Debug + Send + Sync,
{
    /// Replay the given steps in order
    pub fn sequence(steps: impl IntoIterator<Item = ProbeStep<S>>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            repeat: None,
            calls: AtomicU32::new(0),
        }
    }

    /// Replay the given states in order, all as successful snapshots
    pub fn states(states: impl IntoIterator<Item = S>) -> Self {
        Self::sequence(states.into_iter().map(ProbeStep::State))
    }

    /// Report the same state on every fetch, forever
    pub fn always(state: S) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            repeat: Some(state),
            calls: AtomicU32::new(0),
        }
    }

    /// Number of fetches issued so far
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S> StateProbe for ScriptedProbe<S>
where
    S: Clone + PartialEq + fmt::Debug + Send + Sync,
{
    type Snapshot = StubResource<S>;

    async fn fetch(&self) -> ProbeResult<Self::Snapshot> {
        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let step = {
            let mut script = self.script.lock().expect("probe script poisoned");
            script.pop_front()
        };
        match step {
            Some(ProbeStep::State(state)) => Ok(StubResource::new(state)),
            Some(ProbeStep::Error(err)) => Err(err),
            None => match &self.repeat {
                Some(state) => Ok(StubResource::new(state.clone())),
                None => panic!("probe script exhausted after {} calls", calls - 1),
            },
        }
    }
}

// ============================================================================
// Property generators
// ============================================================================

/// Strategy producing valid backoff parameters as a
/// `(base, multiplier, cap, jitter)` tuple, with `cap >= base` guaranteed.
///
/// Kept as a plain tuple so this crate needs no dependency on the crates
/// under test.
pub fn backoff_params() -> impl Strategy<Value = (Duration, f64, Duration, f64)> {
    (1u64..=1_000, 1.0f64..4.0, 0u64..=60_000, 0.0f64..=0.5).prop_map(
        |(base_ms, multiplier, extra_ms, jitter)| {
            let base = Duration::from_millis(base_ms);
            let cap = base + Duration::from_millis(extra_ms);
            (base, multiplier, cap, jitter)
        },
    )
}

/// Strategy producing a jitter fraction within the accepted range
pub fn jitter_fraction() -> impl Strategy<Value = f64> {
    0.0f64..=1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_resource_accessors() {
        let snapshot = StubResource::new("Available")
            .with_id("gw-7")
            .with_request_id("req-abc");

        assert_eq!(*snapshot.lifecycle_state(), "Available");
        assert_eq!(snapshot.resource_id(), Some("gw-7"));
        assert_eq!(snapshot.request_id(), Some("req-abc"));
    }

    #[test]
    fn test_stub_resource_defaults() {
        let snapshot = StubResource::new("Provisioning");
        assert_eq!(snapshot.resource_id(), None);
        assert_eq!(snapshot.request_id(), None);
    }

    #[tokio::test]
    async fn test_scripted_sequence_replays_in_order() {
        let probe = ScriptedProbe::states(["Provisioning", "Available"]);

        let first = probe.fetch().await.unwrap();
        assert_eq!(*first.lifecycle_state(), "Provisioning");

        let second = probe.fetch().await.unwrap();
        assert_eq!(*second.lifecycle_state(), "Available");

        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test]
    async fn test_scripted_errors_interleave() {
        let probe = ScriptedProbe::sequence([
            ProbeStep::Error(ProbeError::Timeout { seconds: 10 }),
            ProbeStep::State("Available"),
        ]);

        assert!(probe.fetch().await.is_err());
        assert!(probe.fetch().await.is_ok());
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test]
    async fn test_always_repeats_forever() {
        let probe = ScriptedProbe::always("Provisioning");
        for _ in 0..5 {
            let snapshot = probe.fetch().await.unwrap();
            assert_eq!(*snapshot.lifecycle_state(), "Provisioning");
        }
        assert_eq!(probe.calls(), 5);
    }

    #[tokio::test]
    #[should_panic(expected = "probe script exhausted")]
    async fn test_exhausted_script_panics() {
        let probe = ScriptedProbe::states(["Available"]);
        let _ = probe.fetch().await;
        let _ = probe.fetch().await;
    }

    proptest! {
        #[test]
        fn prop_backoff_params_are_consistent((base, multiplier, cap, jitter) in backoff_params()) {
            prop_assert!(cap >= base);
            prop_assert!(multiplier >= 1.0);
            prop_assert!((0.0..=1.0).contains(&jitter));
        }

        #[test]
        fn prop_jitter_fraction_in_range(jitter in jitter_fraction()) {
            prop_assert!((0.0..=1.0).contains(&jitter));
        }
    }
}
