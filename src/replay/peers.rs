//! Replay peer protocol: local decision first, then best-effort one-hop fan-out.
//!
//! Propagation never changes the answer given to the caller. The store lock is
//! released before any network call, so a slow or dead peer only costs the
//! caller at most one peer timeout and never stalls other local checks.
//!
//! Two presentations of the same code on two different nodes that race the
//! fan-out can both be accepted; replication narrows the replay window, it
//! does not close it.

use super::{
    coordinator::ReplayCoordinator,
    directory::{NodeDirectory, normalize_address},
    events::EventCategory,
    protocol::{
        CHECK_PATH, CheckRequest, CheckResponse, PEER_TOKEN_HEADER, RESET_PATH, ResetRequest,
    },
    record::{ReplayRecord, Strictness},
};
use crate::APP_USER_AGENT;
use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use std::{collections::BTreeSet, future::Future, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::{task::JoinSet, time::timeout};
use tracing::{Instrument, Span, debug, info_span, warn};

pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("peer unreachable: {0}")]
    Unreachable(String),
    #[error("peer answered with status {0}")]
    Status(u16),
    #[error("peer call timed out after {0:?}")]
    Timeout(Duration),
}

impl PeerError {
    #[must_use]
    pub const fn category(&self) -> EventCategory {
        match self {
            Self::Unreachable(_) => EventCategory::PeerUnreachable,
            Self::Status(_) => EventCategory::PeerRejectedCall,
            Self::Timeout(_) => EventCategory::PeerTimeout,
        }
    }
}

/// Outbound half of the peer RPC surface.
pub trait PeerClient: Send + Sync + 'static {
    /// Ask `peer` to record `request.record`; returns the peer's local decision.
    fn check(
        &self,
        peer: &str,
        request: &CheckRequest,
    ) -> impl Future<Output = Result<bool, PeerError>> + Send;

    /// Ask `peer` to clear its replay state.
    fn reset(
        &self,
        peer: &str,
        request: &ResetRequest,
    ) -> impl Future<Output = Result<(), PeerError>> + Send;
}

/// JSON-over-HTTP peer client.
#[derive(Clone)]
pub struct HttpPeerClient {
    client: Client,
    call_timeout: Duration,
    token: Option<SecretString>,
}

impl HttpPeerClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(call_timeout: Duration, token: Option<SecretString>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(call_timeout)
            .connect_timeout(call_timeout)
            .build()
            .context("failed to build peer HTTP client")?;

        Ok(Self {
            client,
            call_timeout,
            token,
        })
    }

    fn post(&self, peer: &str, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", peer.trim_end_matches('/'));
        let request = self.client.post(url);
        match &self.token {
            Some(token) => request.header(PEER_TOKEN_HEADER, token.expose_secret()),
            None => request,
        }
    }

    fn transport_error(&self, err: &reqwest::Error) -> PeerError {
        if err.is_timeout() {
            PeerError::Timeout(self.call_timeout)
        } else {
            PeerError::Unreachable(err.to_string())
        }
    }
}

impl std::fmt::Debug for HttpPeerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPeerClient")
            .field("call_timeout", &self.call_timeout)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl PeerClient for HttpPeerClient {
    async fn check(&self, peer: &str, request: &CheckRequest) -> Result<bool, PeerError> {
        let response = self
            .post(peer, CHECK_PATH)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::Status(status.as_u16()));
        }

        let body: CheckResponse = response.json().await.map_err(|e| self.transport_error(&e))?;
        Ok(body.accepted)
    }

    async fn reset(&self, peer: &str, request: &ResetRequest) -> Result<(), PeerError> {
        let response = self
            .post(peer, RESET_PATH)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(PeerError::Status(status.as_u16()))
        }
    }
}

/// Node-level entry point combining the local coordinator with peer fan-out.
pub struct ReplayService<P: PeerClient> {
    coordinator: Arc<ReplayCoordinator>,
    directory: Arc<dyn NodeDirectory>,
    client: Arc<P>,
    self_address: Option<String>,
    peer_timeout: Duration,
}

impl<P: PeerClient> ReplayService<P> {
    #[must_use]
    pub fn new(
        coordinator: Arc<ReplayCoordinator>,
        directory: Arc<dyn NodeDirectory>,
        client: Arc<P>,
    ) -> Self {
        Self {
            coordinator,
            directory,
            client,
            self_address: None,
            peer_timeout: DEFAULT_PEER_TIMEOUT,
        }
    }

    /// Own address, never contacted during fan-out.
    #[must_use]
    pub fn with_self_address(mut self, address: Option<String>) -> Self {
        self.self_address = address.and_then(|a| normalize_address(&a).ok());
        self
    }

    #[must_use]
    pub fn with_peer_timeout(mut self, peer_timeout: Duration) -> Self {
        self.peer_timeout = if peer_timeout.is_zero() {
            Duration::from_secs(1)
        } else {
            peer_timeout
        };
        self
    }

    #[must_use]
    pub fn coordinator(&self) -> &ReplayCoordinator {
        &self.coordinator
    }

    #[must_use]
    pub fn self_address(&self) -> Option<&str> {
        self.self_address.as_deref()
    }

    /// Decide locally, then tell the peers if the code was accepted and the
    /// record asks for propagation. The return value is the local decision.
    /// Records checked with `Strictness::Disabled` are never forwarded.
    ///
    /// `peers: None` uses the node directory.
    pub async fn check(&self, peers: Option<Vec<String>>, record: &ReplayRecord) -> bool {
        let accepted = self.coordinator.check(record).await;
        if !accepted || !record.propagate || record.strictness == Strictness::Disabled {
            return accepted;
        }

        let peers = self.resolve_peers(peers);
        if peers.is_empty() {
            return accepted;
        }

        let request = CheckRequest::forwarded(record);
        let span = info_span!("replay.fan_out", op = "check", peers = peers.len());
        let mut calls = JoinSet::new();
        for peer in peers {
            let client = self.client.clone();
            let request = request.clone();
            let limit = self.peer_timeout;
            calls.spawn(async move {
                let result = match timeout(limit, client.check(&peer, &request)).await {
                    Ok(result) => result.map(|_| ()),
                    Err(_) => Err(PeerError::Timeout(limit)),
                };
                (peer, result)
            });
        }
        detach(calls, "check", span).await;

        accepted
    }

    /// Clear local state, then ask each peer to clear theirs without
    /// forwarding further. `peers: None` uses the node directory.
    pub async fn reset(&self, peers: Option<Vec<String>>) {
        self.coordinator.reset().await;

        let peers = self.resolve_peers(peers);
        if peers.is_empty() {
            return;
        }

        let request = ResetRequest::forwarded();
        let span = info_span!("replay.fan_out", op = "reset", peers = peers.len());
        let mut calls = JoinSet::new();
        for peer in peers {
            let client = self.client.clone();
            let request = request.clone();
            let limit = self.peer_timeout;
            calls.spawn(async move {
                let result = match timeout(limit, client.reset(&peer, &request)).await {
                    Ok(result) => result,
                    Err(_) => Err(PeerError::Timeout(limit)),
                };
                (peer, result)
            });
        }
        detach(calls, "reset", span).await;
    }

    fn resolve_peers(&self, peers: Option<Vec<String>>) -> Vec<String> {
        let candidates = match peers {
            None => self.directory.replication_peers(self.self_address.as_deref()),
            Some(list) => list,
        };

        let mut unique = BTreeSet::new();
        for candidate in candidates {
            match normalize_address(&candidate) {
                Ok(address) if Some(address.as_str()) == self.self_address.as_deref() => {}
                Ok(address) => {
                    unique.insert(address);
                }
                Err(err) => warn!(
                    event_id = EventCategory::InvalidPeerAddress.id(),
                    peer = %candidate,
                    "skipping peer: {err}"
                ),
            }
        }
        unique.into_iter().collect()
    }
}

/// Settle the fan-out on its own task and wait for it.
///
/// The peer calls outlive the caller: if the inbound request is dropped
/// (client gave up), the spawned task still drives every call to completion
/// or timeout.
async fn detach(
    calls: JoinSet<(String, Result<(), PeerError>)>,
    op: &'static str,
    span: Span,
) {
    let handle = tokio::spawn(settle(calls, op).instrument(span));
    if let Err(err) = handle.await {
        warn!(
            event_id = EventCategory::PeerUnreachable.id(),
            op,
            "peer fan-out task failed: {err}"
        );
    }
}

/// Wait for every peer call and log each failure; returns how many succeeded.
async fn settle(mut calls: JoinSet<(String, Result<(), PeerError>)>, op: &'static str) -> usize {
    let total = calls.len();
    let mut succeeded = 0;
    while let Some(joined) = calls.join_next().await {
        match joined {
            Ok((peer, Ok(()))) => {
                succeeded += 1;
                debug!(%peer, op, "peer replication call succeeded");
            }
            Ok((peer, Err(err))) => warn!(
                event_id = err.category().id(),
                %peer,
                op,
                "peer replication call failed: {err}"
            ),
            Err(err) => warn!(
                event_id = EventCategory::PeerUnreachable.id(),
                op,
                "peer replication task failed: {err}"
            ),
        }
    }
    debug!(op, succeeded, total, "peer fan-out settled");
    succeeded
}
