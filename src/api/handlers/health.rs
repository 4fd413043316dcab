use crate::{GIT_COMMIT_HASH, api::NodeService};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    node_address: Option<String>,
    stored_codes: usize,
    cleanup: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Replay store and cleanup loop are healthy", body = Health),
        (status = 503, description = "Cleanup loop is not running", body = Health)
    ),
    tag= "health"
)]
// axum handler for health
pub async fn health(method: Method, service: Extension<Arc<NodeService>>) -> impl IntoResponse {
    let coordinator = service.coordinator();
    let cleanup_running = coordinator.cleanup_running().await;

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        node_address: service.self_address().map(ToString::to_string),
        stored_codes: coordinator.len().await,
        cleanup: if cleanup_running {
            "running".to_string()
        } else {
            "stopped".to_string()
        },
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .unwrap_or_else(|err| {
            debug!("Failed to parse X-App header: {}", err);
            HeaderMap::new()
        });

    if cleanup_running {
        (StatusCode::OK, headers, body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}
