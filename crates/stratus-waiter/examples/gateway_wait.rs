//! Gateway Lifecycle Wait Example
//!
//! Creates a gateway against an in-process fake control plane, waits for it
//! to become `Available`, deletes it, then waits for `Terminated` - the
//! standard create/delete flow around a control-plane API.
//!
//! Run with:
//! ```bash
//! cargo run -p stratus-waiter --example gateway_wait
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use stratus_traits::{ProbeResult, ResourceSnapshot, StateProbe};
use stratus_waiter::{BackoffSpec, StateMatcher, WaitTarget, Waiter, WaiterConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GatewayState {
    Provisioning,
    Available,
    Terminating,
    Terminated,
}

struct GatewaySnapshot {
    state: GatewayState,
    id: &'static str,
}

impl ResourceSnapshot for GatewaySnapshot {
    type State = GatewayState;

    fn lifecycle_state(&self) -> &GatewayState {
        &self.state
    }

    fn resource_id(&self) -> Option<&str> {
        Some(self.id)
    }
}

/// In-process stand-in for the control plane: each poll advances the gateway
/// one step through its lifecycle.
struct FakeGatewayService {
    polls: AtomicUsize,
    deleting: AtomicBool,
}

impl FakeGatewayService {
    fn new() -> Self {
        Self {
            polls: AtomicUsize::new(0),
            deleting: AtomicBool::new(false),
        }
    }

    fn delete(&self) {
        self.polls.store(0, Ordering::SeqCst);
        self.deleting.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl StateProbe for FakeGatewayService {
    type Snapshot = GatewaySnapshot;

    async fn fetch(&self) -> ProbeResult<GatewaySnapshot> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst);
        let state = match (self.deleting.load(Ordering::SeqCst), poll) {
            (false, 0..=1) => GatewayState::Provisioning,
            (false, _) => GatewayState::Available,
            (true, 0..=1) => GatewayState::Terminating,
            (true, _) => GatewayState::Terminated,
        };
        Ok(GatewaySnapshot {
            state,
            id: "gw-0419",
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let service = FakeGatewayService::new();
    let cancel = CancellationToken::new();

    let config = WaiterConfig::new()
        .with_backoff(BackoffSpec::aggressive())
        .with_max_elapsed(Duration::from_secs(30));

    println!("━━━ Creating gateway ━━━");
    let matcher = StateMatcher::new(WaitTarget::state(GatewayState::Available))
        .with_terminal_states([GatewayState::Terminated]);
    let mut waiter = Waiter::with_predicate(&service, matcher, config.clone())?;
    let snapshot = waiter.execute(&cancel).await?;
    println!(
        "✅ Gateway {} is {:?}",
        snapshot.resource_id().unwrap_or("<unknown>"),
        snapshot.lifecycle_state()
    );

    println!("━━━ Deleting gateway ━━━");
    service.delete();
    let mut waiter = Waiter::new(
        &service,
        WaitTarget::state(GatewayState::Terminated),
        config,
    )?;
    let snapshot = waiter.execute(&cancel).await?;
    println!(
        "✅ Gateway {} is {:?}",
        snapshot.resource_id().unwrap_or("<unknown>"),
        snapshot.lifecycle_state()
    );

    Ok(())
}
