use clap::{Arg, ArgAction, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in `-v` count order.
const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// `OTP_REPLAY_LOG_LEVEL` takes a level name or its `-v` count.
fn log_level(raw: &str) -> Result<u8, String> {
    let raw = raw.trim().to_ascii_lowercase();
    let index = raw
        .parse::<usize>()
        .ok()
        .filter(|n| *n < LEVELS.len())
        .or_else(|| LEVELS.iter().position(|name| *name == raw));

    index.and_then(|i| u8::try_from(i).ok()).ok_or_else(|| {
        format!(
            "invalid log level {raw:?}, expected one of {}",
            LEVELS.join(", ")
        )
    })
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(log_level)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Log verbosity, repeat to raise: ERROR, WARN, INFO, DEBUG, TRACE")
            .env("OTP_REPLAY_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
