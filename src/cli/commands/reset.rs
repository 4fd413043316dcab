use clap::{Arg, ArgAction, Command};

pub const CMD_RESET: &str = "reset";
pub const ARG_NODE: &str = "node";
pub const ARG_LOCAL_ONLY: &str = "local-only";

#[must_use]
pub fn subcommand() -> Command {
    Command::new(CMD_RESET)
        .about("Clear the replay state of a running node and, by default, its peers")
        .arg(
            Arg::new(ARG_NODE)
                .long(ARG_NODE)
                .help("Node to reset, example: http://node1:8080")
                .env("OTP_REPLAY_RESET_NODE")
                .required(true),
        )
        .arg(
            Arg::new(ARG_LOCAL_ONLY)
                .long(ARG_LOCAL_ONLY)
                .help("Do not forward the reset to the node's peers")
                .action(ArgAction::SetTrue),
        )
}
