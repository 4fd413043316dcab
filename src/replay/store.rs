//! In-memory record of recently consumed one-time codes.
//!
//! Records are bucketed per case-folded user name behind a single mutex. The
//! policy decision and the insert happen under the same lock acquisition, so
//! two concurrent presentations of one code on this node are linearized and at
//! most one of them can be accepted under `FullMatch`.

use super::{
    error::ReplayError,
    record::{ReplayRecord, Strictness},
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct StoredEntry {
    code: String,
    source_address: String,
    expires_at: DateTime<Utc>,
}

impl StoredEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

enum Verdict {
    Replay,
    AlreadyRecorded,
    Fresh,
}

#[derive(Debug, Default)]
pub struct ReplayStore {
    entries: Mutex<HashMap<String, Vec<StoredEntry>>>,
}

impl ReplayStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `record` is a replay and record it if it is not.
    ///
    /// Returns `Ok(true)` when the code is accepted. Entries of the same user
    /// that expired before `now` are dropped first and never block a code.
    ///
    /// # Errors
    /// Returns an error for malformed records or an unrepresentable expiry;
    /// callers must treat any error as a rejection.
    pub async fn check_and_insert(
        &self,
        record: &ReplayRecord,
        now: DateTime<Utc>,
    ) -> Result<bool, ReplayError> {
        record.validate()?;

        if record.strictness == Strictness::Disabled {
            return Ok(true);
        }

        let expires_at = record.expires_at()?;
        let source_address = record.source_address.trim();

        let mut entries = self.entries.lock().await;
        let bucket = entries.entry(record.user_key()).or_default();
        bucket.retain(|entry| entry.is_live(now));

        let mut same_code = bucket.iter().filter(|entry| entry.code == record.code);
        let verdict = match record.strictness {
            Strictness::FullMatch => {
                if same_code.next().is_some() {
                    Verdict::Replay
                } else {
                    Verdict::Fresh
                }
            }
            Strictness::PartialMatch => {
                let mut seen_here = false;
                let mut seen_elsewhere = false;
                for entry in same_code {
                    if entry.source_address == source_address {
                        seen_here = true;
                    } else {
                        seen_elsewhere = true;
                    }
                }
                match (seen_elsewhere, seen_here) {
                    (true, _) => Verdict::Replay,
                    (false, true) => Verdict::AlreadyRecorded,
                    (false, false) => Verdict::Fresh,
                }
            }
            Strictness::Disabled => Verdict::AlreadyRecorded,
        };

        match verdict {
            Verdict::Replay => Ok(false),
            Verdict::AlreadyRecorded => Ok(true),
            Verdict::Fresh => {
                bucket.push(StoredEntry {
                    code: record.code.clone(),
                    source_address: source_address.to_string(),
                    expires_at,
                });
                Ok(true)
            }
        }
    }

    /// Remove every entry that expired at or before `now`.
    /// Returns the number of removed entries.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().await;
        let mut removed = 0;
        entries.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(|entry| entry.is_live(now));
            removed += before - bucket.len();
            !bucket.is_empty()
        });
        removed
    }

    /// Drop all replay state. Returns the number of removed entries.
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let removed = entries.values().map(Vec::len).sum();
        entries.clear();
        removed
    }

    /// Number of stored entries, expired-but-unswept ones included.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
