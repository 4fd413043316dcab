use crate::replay::{HttpPeerClient, PeerClient, ResetRequest, directory::normalize_address};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::time::Duration;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub node: String,
    pub local_only: bool,
    pub peer_timeout: Duration,
    pub peer_token: Option<SecretString>,
}

/// Ask a running node to clear its replay state.
///
/// Without `local_only` the node forwards the reset once to its
/// participating peers and answers after that fan-out settles, so the call
/// is allowed to outlast one peer timeout on the node side.
/// # Errors
/// Returns an error if the node address is invalid or the node does not acknowledge the reset.
pub async fn execute(args: Args) -> Result<()> {
    let node = normalize_address(&args.node).context("invalid --node address")?;
    let client = HttpPeerClient::new(operator_timeout(args.peer_timeout), args.peer_token)?;

    let request = if args.local_only {
        ResetRequest::forwarded()
    } else {
        ResetRequest::default()
    };

    client
        .reset(&node, &request)
        .await
        .with_context(|| format!("reset of {node} failed"))?;

    info!(node = %node, local_only = args.local_only, "replay state reset");
    println!("reset acknowledged by {node}");

    Ok(())
}

fn operator_timeout(peer_timeout: Duration) -> Duration {
    peer_timeout.saturating_mul(2).saturating_add(Duration::from_secs(1))
}
