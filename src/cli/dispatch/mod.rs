use crate::cli::{
    actions::{Action, reset, server},
    commands::{
        farm::{ARG_CLEANUP_INTERVAL, ARG_NODE_ADDRESS, ARG_PEER, ARG_PEER_TIMEOUT, ARG_PEER_TOKEN},
        reset::{ARG_LOCAL_ONLY, ARG_NODE, CMD_RESET},
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::time::Duration;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    if let Some(sub) = matches.subcommand_matches(CMD_RESET) {
        let node = sub
            .get_one::<String>(ARG_NODE)
            .cloned()
            .context("missing required argument: --node")?;

        return Ok(Action::Reset(reset::Args {
            node,
            local_only: sub.get_flag(ARG_LOCAL_ONLY),
            peer_timeout: seconds(sub, ARG_PEER_TIMEOUT, 3),
            peer_token: peer_token(sub),
        }));
    }

    let peers = matches
        .get_many::<String>(ARG_PEER)
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    Ok(Action::Server(server::Args {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        node_address: matches.get_one::<String>(ARG_NODE_ADDRESS).cloned(),
        peers,
        cleanup_interval: seconds(matches, ARG_CLEANUP_INTERVAL, 60),
        peer_timeout: seconds(matches, ARG_PEER_TIMEOUT, 3),
        peer_token: peer_token(matches),
    }))
}

// Zero is normalized to one second.
fn seconds(matches: &clap::ArgMatches, id: &str, default: u64) -> Duration {
    let value = matches.get_one::<u64>(id).copied().unwrap_or(default);
    Duration::from_secs(value.max(1))
}

fn peer_token(matches: &clap::ArgMatches) -> Option<SecretString> {
    matches
        .get_one::<String>(ARG_PEER_TOKEN)
        .filter(|token| !token.is_empty())
        .map(|token| SecretString::from(token.clone()))
}
