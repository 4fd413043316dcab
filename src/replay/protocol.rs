//! Wire shapes of the peer RPC surface.
//!
//! `peers: None` asks the receiving node to fan out to its own directory;
//! `peers: Some(vec![])` asks it not to fan out at all. Forwarded calls always
//! use the latter so replication stays one hop deep.

use super::record::ReplayRecord;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const CHECK_PATH: &str = "/v1/replay/check";
pub const RESET_PATH: &str = "/v1/replay/reset";
pub const PEER_TOKEN_HEADER: &str = "x-replay-peer-token";

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CheckRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peers: Option<Vec<String>>,
    pub record: ReplayRecord,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckResponse {
    pub accepted: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ResetRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peers: Option<Vec<String>>,
}

impl CheckRequest {
    /// Request sent to a peer: no further fan-out, no re-propagation.
    #[must_use]
    pub fn forwarded(record: &ReplayRecord) -> Self {
        Self {
            peers: Some(Vec::new()),
            record: record.forwarded(),
        }
    }
}

impl ResetRequest {
    #[must_use]
    pub fn forwarded() -> Self {
        Self {
            peers: Some(Vec::new()),
        }
    }
}
