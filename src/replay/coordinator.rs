//! Per-node replay authority: one store plus one cleanup loop.

use super::{
    cleanup::{DEFAULT_CLEANUP_INTERVAL, spawn_cleanup},
    error::ReplayError,
    events::EventCategory,
    record::ReplayRecord,
    store::ReplayStore,
};
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Local, authoritative replay decisions for this node.
///
/// Must be created inside a Tokio runtime: construction spawns the cleanup
/// loop, which runs until [`ReplayCoordinator::shutdown`] or drop.
#[derive(Debug)]
pub struct ReplayCoordinator {
    store: Arc<ReplayStore>,
    cancel: CancellationToken,
    cleanup: Mutex<Option<JoinHandle<()>>>,
}

impl ReplayCoordinator {
    #[must_use]
    pub fn new(cleanup_interval: Duration) -> Self {
        let store = Arc::new(ReplayStore::new());
        let cancel = CancellationToken::new();
        let handle = spawn_cleanup(store.clone(), cleanup_interval, cancel.clone());

        Self {
            store,
            cancel,
            cleanup: Mutex::new(Some(handle)),
        }
    }

    /// Returns `true` if the code has not been seen under the record's policy.
    ///
    /// Never fails: malformed records and store faults are logged and
    /// reported as a rejection.
    pub async fn check(&self, record: &ReplayRecord) -> bool {
        match self.store.check_and_insert(record, Utc::now()).await {
            Ok(true) => {
                debug!(
                    event_id = EventCategory::ReplayAccepted.id(),
                    user = %record.user_name,
                    source = %record.source_address,
                    strictness = record.strictness.as_str(),
                    "one-time code accepted"
                );
                true
            }
            Ok(false) => {
                warn!(
                    event_id = EventCategory::ReplayRejected.id(),
                    user = %record.user_name,
                    source = %record.source_address,
                    strictness = record.strictness.as_str(),
                    "one-time code replay rejected"
                );
                false
            }
            Err(err @ ReplayError::MissingField(_)) => {
                error!(
                    event_id = EventCategory::MalformedRecord.id(),
                    source = %record.source_address,
                    "rejecting replay check: {err}"
                );
                false
            }
            Err(err) => {
                error!(
                    event_id = EventCategory::StoreFault.id(),
                    user = %record.user_name,
                    "replay store fault, failing closed: {err}"
                );
                false
            }
        }
    }

    /// Forget every recorded code on this node.
    pub async fn reset(&self) {
        let removed = self.store.clear().await;
        info!(
            event_id = EventCategory::StateReset.id(),
            removed, "replay state reset"
        );
    }

    /// Number of live and not yet swept entries.
    pub async fn len(&self) -> usize {
        self.store.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.store.is_empty().await
    }

    pub async fn cleanup_running(&self) -> bool {
        self.cleanup
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the cleanup loop and wait for it to exit.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.cleanup.lock().await.take();
        if let Some(handle) = handle
            && let Err(err) = handle.await
        {
            error!(
                event_id = EventCategory::CleanupFault.id(),
                "replay cleanup loop ended abnormally: {err}"
            );
        }
    }
}

impl Default for ReplayCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_CLEANUP_INTERVAL)
    }
}

impl Drop for ReplayCoordinator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::record::Strictness;
    use anyhow::Result;
    use tokio::time::{sleep, timeout};

    fn record(code: &str, source: &str, strictness: Strictness) -> ReplayRecord {
        ReplayRecord::new("alice", code, source, 30, strictness)
    }

    #[tokio::test]
    async fn full_match_second_presentation_rejected() {
        let coordinator = ReplayCoordinator::default();
        assert!(coordinator.check(&record("123456", "a", Strictness::FullMatch)).await);
        assert!(!coordinator.check(&record("123456", "a", Strictness::FullMatch)).await);
        assert!(!coordinator.check(&record("123456", "b", Strictness::FullMatch)).await);
    }

    #[tokio::test]
    async fn partial_match_same_and_different_address() {
        let coordinator = ReplayCoordinator::default();
        let from_a = record("123456", "a", Strictness::PartialMatch);
        assert!(coordinator.check(&from_a).await);
        assert!(coordinator.check(&from_a).await);
        assert!(!coordinator.check(&record("123456", "b", Strictness::PartialMatch)).await);
    }

    #[tokio::test]
    async fn disabled_accepts_everything_without_growing() {
        let coordinator = ReplayCoordinator::default();
        for source in ["a", "b", "a", "c"] {
            assert!(coordinator.check(&record("123456", source, Strictness::Disabled)).await);
        }
        assert!(coordinator.is_empty().await);
    }

    #[tokio::test]
    async fn strictness_can_change_per_call() {
        let coordinator = ReplayCoordinator::default();
        assert!(coordinator.check(&record("123456", "a", Strictness::PartialMatch)).await);
        assert!(coordinator.check(&record("123456", "a", Strictness::PartialMatch)).await);
        assert!(!coordinator.check(&record("123456", "a", Strictness::FullMatch)).await);
        assert!(coordinator.check(&record("123456", "b", Strictness::Disabled)).await);
    }

    #[tokio::test]
    async fn malformed_record_fails_closed() {
        let coordinator = ReplayCoordinator::default();
        let blank_user = ReplayRecord::new(" ", "123456", "a", 30, Strictness::Disabled);
        assert!(!coordinator.check(&blank_user).await);
        assert!(!coordinator.check(&record("", "a", Strictness::FullMatch)).await);
    }

    #[tokio::test]
    async fn store_fault_fails_closed() {
        let coordinator = ReplayCoordinator::default();
        let overflow = ReplayRecord::new("alice", "123456", "a", u32::MAX, Strictness::FullMatch)
            .with_presented_at(chrono::DateTime::<Utc>::MAX_UTC);
        assert!(!coordinator.check(&overflow).await);
        assert!(coordinator.is_empty().await);
    }

    #[tokio::test]
    async fn reset_readmits_rejected_codes() {
        let coordinator = ReplayCoordinator::default();
        for code in ["1", "2", "3", "4"] {
            assert!(coordinator.check(&record(code, "a", Strictness::FullMatch)).await);
        }
        assert!(!coordinator.check(&record("2", "a", Strictness::FullMatch)).await);

        coordinator.reset().await;
        assert!(coordinator.is_empty().await);
        assert!(coordinator.check(&record("2", "a", Strictness::FullMatch)).await);
    }

    #[tokio::test]
    async fn expired_code_is_new_after_cleanup() -> Result<()> {
        let coordinator = ReplayCoordinator::new(Duration::from_millis(50));
        let short = ReplayRecord::new("alice", "123456", "a", 1, Strictness::FullMatch);
        assert!(coordinator.check(&short).await);
        assert!(!coordinator.check(&short).await);

        timeout(Duration::from_secs(5), async {
            while !coordinator.is_empty().await {
                sleep(Duration::from_millis(25)).await;
            }
        })
        .await?;

        assert!(coordinator.check(&short).await);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_presentations_accept_exactly_one() -> Result<()> {
        let coordinator = Arc::new(ReplayCoordinator::default());
        let attempt = record("654321", "a", Strictness::FullMatch);

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..32 {
            let coordinator = coordinator.clone();
            let attempt = attempt.clone();
            tasks.spawn(async move { coordinator.check(&attempt).await });
        }

        let mut accepted = 0;
        let mut rejected = 0;
        while let Some(result) = tasks.join_next().await {
            if result? {
                accepted += 1;
            } else {
                rejected += 1;
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(rejected, 31);
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_stops_cleanup_loop() {
        let coordinator = ReplayCoordinator::default();
        assert!(coordinator.cleanup_running().await);
        coordinator.shutdown().await;
        assert!(!coordinator.cleanup_running().await);
        // shutting down twice is harmless
        coordinator.shutdown().await;
        assert!(coordinator.check(&record("1", "a", Strictness::FullMatch)).await);
    }
}
