//! Farm membership and replication flags.

use clap::{Arg, ArgAction, Command};

pub const ARG_NODE_ADDRESS: &str = "node-address";
pub const ARG_PEER: &str = "peer";
pub const ARG_CLEANUP_INTERVAL: &str = "cleanup-interval-seconds";
pub const ARG_PEER_TIMEOUT: &str = "peer-timeout-seconds";
pub const ARG_PEER_TOKEN: &str = "peer-token";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_NODE_ADDRESS)
                .long(ARG_NODE_ADDRESS)
                .help("Address other members use to reach this node, example: node1:8080")
                .long_help(
                    "Address other members use to reach this node. It is never contacted during fan-out, even when listed as a peer.",
                )
                .env("OTP_REPLAY_NODE_ADDRESS"),
        )
        .arg(
            Arg::new(ARG_PEER)
                .long(ARG_PEER)
                .help("Farm member as ADDR[=true|false], repeatable; false excludes it from replication")
                .env("OTP_REPLAY_PEERS")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new(ARG_CLEANUP_INTERVAL)
                .long(ARG_CLEANUP_INTERVAL)
                .help("Seconds between sweeps of expired codes")
                .default_value("60")
                .env("OTP_REPLAY_CLEANUP_INTERVAL_SECONDS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_PEER_TIMEOUT)
                .long(ARG_PEER_TIMEOUT)
                .help("Seconds to wait for each peer replication call")
                .default_value("3")
                .env("OTP_REPLAY_PEER_TIMEOUT_SECONDS")
                .global(true)
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_PEER_TOKEN)
                .long(ARG_PEER_TOKEN)
                .help("Shared secret sent and required on replay calls")
                .env("OTP_REPLAY_PEER_TOKEN")
                .hide_env_values(true)
                .global(true),
        )
}
