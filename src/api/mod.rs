//! HTTP surface of a farm member: peer RPC endpoints plus health.

use crate::replay::{HttpPeerClient, ReplayService};
use anyhow::Result;
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::options,
};
use std::{future::Future, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;

pub mod handlers;
mod openapi;

pub use handlers::PeerAuth;
pub use openapi::openapi;

/// Replay service as wired into the HTTP server.
pub type NodeService = ReplayService<HttpPeerClient>;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the application router with all layers and shared state.
#[must_use]
pub fn app(service: Arc<NodeService>, auth: PeerAuth) -> Router {
    let (router, _openapi) = openapi::api_router().split_for_parts();

    router
        .route("/health", options(handlers::health::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID_HEADER),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID_HEADER,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(Arc::new(auth)))
                .layer(Extension(service)),
        )
}

/// Serve `app` on `listener` until `shutdown` resolves.
///
/// # Errors
/// Returns an error if the server fails.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Start the node and block until SIGINT/SIGTERM, then stop the cleanup loop.
///
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn new(port: u16, service: Arc<NodeService>, auth: PeerAuth) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    let result = serve(listener, app(service.clone(), auth), shutdown_signal()).await;

    service.coordinator().shutdown().await;
    info!("Gracefully shutdown");

    result
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
