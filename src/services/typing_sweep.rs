//! Typing indicator expiry sweeper.
//!
//! Typing entries carry a deadline rather than their own timer. This task
//! wakes on a fixed interval, removes every entry whose deadline has
//! passed, and pushes a fresh typers snapshot to each affected room. Worst
//! case an indicator outlives its TTL by one sweep interval.

use crate::state::Coordinator;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

/// Spawn the typing sweeper task.
pub fn spawn_typing_sweeper(coordinator: Arc<Coordinator>) -> JoinHandle<()> {
    let period = Duration::from_millis(coordinator.limits.typing_sweep_ms);
    tokio::spawn(run(coordinator, period))
}

#[instrument(skip(coordinator), name = "typing_sweep")]
async fn run(coordinator: Arc<Coordinator>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let expired = coordinator.typing.collect_expired(Instant::now());
        if expired.is_empty() {
            continue;
        }
        debug!(rooms = expired.len(), "Expired typing indicators");
        for room in &expired {
            coordinator.broadcast_typing_snapshot(room).await;
        }
    }
}
