//! Peer RPC endpoints.
//!
//! The same two endpoints serve the local sign-in path and the other farm
//! members; forwarded calls simply carry an empty peer list and a record with
//! propagation disabled.

use super::PeerAuth;
use crate::{
    api::NodeService,
    replay::{CheckRequest, CheckResponse, EventCategory, ResetRequest},
};
use axum::{
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use std::sync::Arc;
use tracing::{instrument, warn};

#[utoipa::path(
    post,
    path= "/v1/replay/check",
    request_body = CheckRequest,
    responses (
        (status = 200, description = "Local replay decision", body = CheckResponse),
        (status = 401, description = "Missing or invalid peer token")
    ),
    tag= "replay"
)]
#[instrument(skip_all)]
pub async fn check(
    headers: HeaderMap,
    auth: Extension<Arc<PeerAuth>>,
    service: Extension<Arc<NodeService>>,
    request: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<CheckResponse>, StatusCode> {
    auth.authorize(&headers)?;

    // an unreadable record is a rejection like any other malformed one
    let accepted = match request {
        Ok(Json(request)) => service.check(request.peers, &request.record).await,
        Err(rejection) => {
            warn!(
                event_id = EventCategory::MalformedRecord.id(),
                status = rejection.status().as_u16(),
                "rejecting unreadable replay record: {}",
                rejection.body_text()
            );
            false
        }
    };

    Ok(Json(CheckResponse { accepted }))
}

#[utoipa::path(
    post,
    path= "/v1/replay/reset",
    request_body = ResetRequest,
    responses (
        (status = 204, description = "Replay state cleared"),
        (status = 401, description = "Missing or invalid peer token")
    ),
    tag= "replay"
)]
#[instrument(skip_all)]
pub async fn reset(
    headers: HeaderMap,
    auth: Extension<Arc<PeerAuth>>,
    service: Extension<Arc<NodeService>>,
    Json(request): Json<ResetRequest>,
) -> Result<StatusCode, StatusCode> {
    auth.authorize(&headers)?;

    service.reset(request.peers).await;

    Ok(StatusCode::NO_CONTENT)
}
