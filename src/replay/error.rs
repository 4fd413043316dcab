use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("malformed replay record: missing {0}")]
    MissingField(&'static str),
    #[error("replay window overflows: {presented_at} + {window_seconds}s")]
    WindowOverflow {
        presented_at: DateTime<Utc>,
        window_seconds: u32,
    },
}
