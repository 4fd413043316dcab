pub mod farm;
pub mod logging;
pub mod reset;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("otp-replay")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("OTP_REPLAY_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .subcommand(reset::subcommand());

    let command = farm::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_VARS: [&str; 8] = [
        "OTP_REPLAY_PORT",
        "OTP_REPLAY_NODE_ADDRESS",
        "OTP_REPLAY_PEERS",
        "OTP_REPLAY_CLEANUP_INTERVAL_SECONDS",
        "OTP_REPLAY_PEER_TIMEOUT_SECONDS",
        "OTP_REPLAY_PEER_TOKEN",
        "OTP_REPLAY_LOG_LEVEL",
        "OTP_REPLAY_RESET_NODE",
    ];

    fn clean_env<F: FnOnce()>(f: F) {
        temp_env::with_vars_unset(ENV_VARS, f);
    }

    fn peers(matches: &clap::ArgMatches) -> Vec<String> {
        matches
            .get_many::<String>(farm::ARG_PEER)
            .map(|values| values.cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "otp-replay");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some(env!("CARGO_PKG_DESCRIPTION").to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_defaults() {
        clean_env(|| {
            let matches = new().get_matches_from(vec!["otp-replay"]);
            assert_eq!(matches.get_one::<u16>("port").copied(), Some(8080));
            assert_eq!(
                matches.get_one::<u64>(farm::ARG_CLEANUP_INTERVAL).copied(),
                Some(60)
            );
            assert_eq!(matches.get_one::<u64>(farm::ARG_PEER_TIMEOUT).copied(), Some(3));
            assert!(matches.get_one::<String>(farm::ARG_NODE_ADDRESS).is_none());
            assert!(matches.get_one::<String>(farm::ARG_PEER_TOKEN).is_none());
            assert!(peers(&matches).is_empty());
        });
    }

    #[test]
    fn test_check_farm_args() {
        clean_env(|| {
            let matches = new().get_matches_from(vec![
                "otp-replay",
                "--port",
                "9090",
                "--node-address",
                "node1:8080",
                "--peer",
                "node2:8080",
                "--peer",
                "node3:8080=false",
                "--cleanup-interval-seconds",
                "15",
                "--peer-timeout-seconds",
                "1",
                "--peer-token",
                "farm-secret",
            ]);

            assert_eq!(matches.get_one::<u16>("port").copied(), Some(9090));
            assert_eq!(
                matches.get_one::<String>(farm::ARG_NODE_ADDRESS).cloned(),
                Some("node1:8080".to_string())
            );
            assert_eq!(
                peers(&matches),
                vec!["node2:8080".to_string(), "node3:8080=false".to_string()]
            );
            assert_eq!(
                matches.get_one::<u64>(farm::ARG_CLEANUP_INTERVAL).copied(),
                Some(15)
            );
            assert_eq!(matches.get_one::<u64>(farm::ARG_PEER_TIMEOUT).copied(), Some(1));
            assert_eq!(
                matches.get_one::<String>(farm::ARG_PEER_TOKEN).cloned(),
                Some("farm-secret".to_string())
            );
        });
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("OTP_REPLAY_PORT", Some("443")),
                ("OTP_REPLAY_NODE_ADDRESS", Some("http://node1:8080")),
                ("OTP_REPLAY_PEERS", Some("node2:8080,node3:8080=false")),
                ("OTP_REPLAY_CLEANUP_INTERVAL_SECONDS", Some("30")),
                ("OTP_REPLAY_PEER_TIMEOUT_SECONDS", Some("5")),
                ("OTP_REPLAY_PEER_TOKEN", Some("farm-secret")),
                ("OTP_REPLAY_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["otp-replay"]);
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(443));
                assert_eq!(
                    matches.get_one::<String>(farm::ARG_NODE_ADDRESS).cloned(),
                    Some("http://node1:8080".to_string())
                );
                assert_eq!(
                    peers(&matches),
                    vec!["node2:8080".to_string(), "node3:8080=false".to_string()]
                );
                assert_eq!(
                    matches.get_one::<u64>(farm::ARG_CLEANUP_INTERVAL).copied(),
                    Some(30)
                );
                assert_eq!(matches.get_one::<u64>(farm::ARG_PEER_TIMEOUT).copied(), Some(5));
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("OTP_REPLAY_LOG_LEVEL", Some(level))], || {
                let matches = new().get_matches_from(vec!["otp-replay"]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars([("OTP_REPLAY_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["otp-replay".to_string()];

                // Add the appropriate number of "-v" flags based on the index
                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }

                let matches = new().get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_invalid_log_level() {
        temp_env::with_vars([("OTP_REPLAY_LOG_LEVEL", Some("loud"))], || {
            let result = new().try_get_matches_from(vec!["otp-replay"]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_reset_subcommand() {
        clean_env(|| {
            let matches = new().get_matches_from(vec![
                "otp-replay",
                "reset",
                "--node",
                "http://node1:8080",
                "--local-only",
                "--peer-token",
                "farm-secret",
            ]);

            let Some((name, sub)) = matches.subcommand() else {
                panic!("expected reset subcommand");
            };
            assert_eq!(name, reset::CMD_RESET);
            assert_eq!(
                sub.get_one::<String>(reset::ARG_NODE).cloned(),
                Some("http://node1:8080".to_string())
            );
            assert!(sub.get_flag(reset::ARG_LOCAL_ONLY));
            assert_eq!(
                sub.get_one::<String>(farm::ARG_PEER_TOKEN).cloned(),
                Some("farm-secret".to_string())
            );
        });
    }

    #[test]
    fn test_reset_requires_node() {
        clean_env(|| {
            let result = new().try_get_matches_from(vec!["otp-replay", "reset"]);
            assert_eq!(
                result.map(|_| ()).map_err(|e| e.kind()),
                Err(clap::error::ErrorKind::MissingRequiredArgument)
            );
        });
    }
}
