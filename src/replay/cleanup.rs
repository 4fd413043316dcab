//! Background sweep of expired replay entries.

use super::{events::EventCategory, store::ReplayStore};
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn the sweep loop for `store`.
///
/// The loop wakes every `every`, removes expired entries and goes back to
/// sleep until `cancel` fires. Each sweep runs in its own task so a panic
/// inside one sweep is logged and the next cycle still runs. Cancellation
/// only happens between sweeps or while waiting on a sweep task, and the store
/// guard lives inside that task, so the store is never left locked.
pub fn spawn_cleanup(
    store: Arc<ReplayStore>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let every = if every.is_zero() {
        Duration::from_secs(1)
    } else {
        every
    };

    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        info!(interval = ?every, "replay cleanup loop started");

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let sweep_store = store.clone();
            let sweep = tokio::spawn(async move { sweep_store.sweep(Utc::now()).await });

            match sweep.await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "swept expired replay entries"),
                Err(err) => error!(
                    event_id = EventCategory::CleanupFault.id(),
                    "replay cleanup sweep failed: {err}"
                ),
            }
        }

        info!("replay cleanup loop stopped");
    })
}
