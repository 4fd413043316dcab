use crate::{
    api::{self, PeerAuth},
    replay::{
        HttpPeerClient, NodeDirectory, ReplayCoordinator, ReplayService, StaticNodeDirectory,
        directory::normalize_address,
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub node_address: Option<String>,
    pub peers: Vec<String>,
    pub cleanup_interval: Duration,
    pub peer_timeout: Duration,
    pub peer_token: Option<SecretString>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the node or peer addresses are invalid, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let node_address = args
        .node_address
        .as_deref()
        .map(normalize_address)
        .transpose()
        .context("invalid --node-address")?;

    let directory = StaticNodeDirectory::parse(&args.peers).context("invalid --peer")?;

    log_startup_args(&args, node_address.as_deref(), &directory);

    let client = HttpPeerClient::new(args.peer_timeout, args.peer_token.clone())?;
    let coordinator = Arc::new(ReplayCoordinator::new(args.cleanup_interval));

    let service = ReplayService::new(coordinator, Arc::new(directory), Arc::new(client))
        .with_self_address(node_address)
        .with_peer_timeout(args.peer_timeout);

    api::new(args.port, Arc::new(service), PeerAuth::new(args.peer_token)).await
}

fn log_startup_args(args: &Args, node_address: Option<&str>, directory: &StaticNodeDirectory) {
    let members = directory.members();
    let replicating = directory.replication_peers(node_address);
    let excluded = members.len().saturating_sub(replicating.len());

    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("node_address", node_address.unwrap_or("none").to_string()),
        (
            "peers",
            if replicating.is_empty() {
                "none".to_string()
            } else {
                replicating.join(", ")
            },
        ),
        ("peers_not_replicating", excluded.to_string()),
        (
            "cleanup_interval",
            format!("{}s", args.cleanup_interval.as_secs()),
        ),
        ("peer_timeout", format!("{}s", args.peer_timeout.as_secs())),
        ("peer_token_set", args.peer_token.is_some().to_string()),
    ];
    log_entries("Startup configuration", &entries);
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\n{title}:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
