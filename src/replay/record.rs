//! Replay records and strictness levels.

use super::error::ReplayError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Policy deciding what counts as a duplicate presentation of a code.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// Every presentation is accepted and nothing is recorded.
    Disabled,
    /// Same user and code from a different source address is a replay.
    #[default]
    PartialMatch,
    /// Same user and code from anywhere is a replay.
    FullMatch,
}

impl Strictness {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::PartialMatch => "partial_match",
            Self::FullMatch => "full_match",
        }
    }
}

/// One attempted use of a one-time code.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ReplayRecord {
    pub user_name: String,
    pub code: String,
    pub source_address: String,
    pub presented_at: DateTime<Utc>,
    pub window_seconds: u32,
    #[serde(default)]
    pub strictness: Strictness,
    #[serde(default)]
    pub propagate: bool,
}

impl ReplayRecord {
    #[must_use]
    pub fn new(
        user_name: impl Into<String>,
        code: impl Into<String>,
        source_address: impl Into<String>,
        window_seconds: u32,
        strictness: Strictness,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            code: code.into(),
            source_address: source_address.into(),
            presented_at: Utc::now(),
            window_seconds,
            strictness,
            propagate: true,
        }
    }

    #[must_use]
    pub fn with_presented_at(mut self, presented_at: DateTime<Utc>) -> Self {
        self.presented_at = presented_at;
        self
    }

    #[must_use]
    pub fn with_propagate(mut self, propagate: bool) -> Self {
        self.propagate = propagate;
        self
    }

    /// Copy sent to peers: identical record that must not be forwarded again.
    #[must_use]
    pub fn forwarded(&self) -> Self {
        self.clone().with_propagate(false)
    }

    /// Case-folded identity key used to bucket records per user.
    #[must_use]
    pub fn user_key(&self) -> String {
        self.user_name.trim().to_lowercase()
    }

    /// Reject records the caller should never have produced.
    ///
    /// # Errors
    /// Returns `ReplayError::MissingField` when the user or code is blank.
    pub fn validate(&self) -> Result<(), ReplayError> {
        if self.user_name.trim().is_empty() {
            return Err(ReplayError::MissingField("user_name"));
        }
        if self.code.trim().is_empty() {
            return Err(ReplayError::MissingField("code"));
        }
        Ok(())
    }

    /// Instant after which the record no longer blocks anything.
    ///
    /// # Errors
    /// Returns `ReplayError::WindowOverflow` if the expiry is not representable.
    pub fn expires_at(&self) -> Result<DateTime<Utc>, ReplayError> {
        self.presented_at
            .checked_add_signed(TimeDelta::seconds(i64::from(self.window_seconds)))
            .ok_or(ReplayError::WindowOverflow {
                presented_at: self.presented_at,
                window_seconds: self.window_seconds,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_key_is_case_insensitive() {
        let full = Strictness::FullMatch;
        let a = ReplayRecord::new("Alice@Example.COM", "123456", "10.0.0.1", 30, full);
        let b = ReplayRecord::new(" alice@example.com", "123456", "10.0.0.1", 30, full);
        assert_eq!(a.user_key(), b.user_key());
    }

    #[test]
    fn validate_rejects_blank_fields() {
        let record = ReplayRecord::new("", "123456", "10.0.0.1", 30, Strictness::FullMatch);
        assert!(matches!(
            record.validate(),
            Err(ReplayError::MissingField("user_name"))
        ));

        let record = ReplayRecord::new("alice", "  ", "10.0.0.1", 30, Strictness::FullMatch);
        assert!(matches!(
            record.validate(),
            Err(ReplayError::MissingField("code"))
        ));

        let record = ReplayRecord::new("alice", "123456", "", 30, Strictness::FullMatch);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn expires_at_adds_window() -> Result<(), ReplayError> {
        let now = Utc::now();
        let record = ReplayRecord::new("alice", "123456", "10.0.0.1", 90, Strictness::FullMatch)
            .with_presented_at(now);
        assert_eq!(record.expires_at()?, now + TimeDelta::seconds(90));
        Ok(())
    }

    #[test]
    fn expires_at_overflow_is_an_error() {
        let record =
            ReplayRecord::new("alice", "123456", "10.0.0.1", u32::MAX, Strictness::FullMatch)
                .with_presented_at(DateTime::<Utc>::MAX_UTC);
        assert!(matches!(
            record.expires_at(),
            Err(ReplayError::WindowOverflow { .. })
        ));
    }

    #[test]
    fn forwarded_copy_never_propagates() {
        let record = ReplayRecord::new("alice", "123456", "10.0.0.1", 30, Strictness::PartialMatch);
        assert!(record.propagate);
        let copy = record.forwarded();
        assert!(!copy.propagate);
        assert_eq!(copy.code, record.code);
        assert_eq!(copy.presented_at, record.presented_at);
    }

    #[test]
    fn strictness_wire_names() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&Strictness::FullMatch)?, "\"full_match\"");
        let parsed: Strictness = serde_json::from_str("\"disabled\"")?;
        assert_eq!(parsed, Strictness::Disabled);
        assert_eq!(Strictness::PartialMatch.as_str(), "partial_match");
        Ok(())
    }

    #[test]
    fn record_defaults_when_fields_omitted() -> Result<(), serde_json::Error> {
        let record: ReplayRecord = serde_json::from_str(
            r#"{
                "user_name": "alice",
                "code": "123456",
                "source_address": "10.0.0.1",
                "presented_at": "2026-01-01T00:00:00Z",
                "window_seconds": 30
            }"#,
        )?;
        assert_eq!(record.strictness, Strictness::PartialMatch);
        assert!(!record.propagate);
        Ok(())
    }
}
