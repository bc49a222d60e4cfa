//! Command-line interface definition

use clap::{value_parser, Arg, ArgMatches, Command};
use planauth_core::{AuthConfig, MAX_TOKEN_HOUR_LIFESPAN};

pub fn build_cli() -> Command {
    Command::new("planauth-server")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Signing key store and bearer token gate for the planning API")
        .subcommand_required(true)
        .arg(
            Arg::new("key-path")
                .long("key-path")
                .value_name("PATH")
                .global(true)
                .help("Key directory (overrides KEY_PATH)"),
        )
        .arg(
            Arg::new("token-hours")
                .long("token-hours")
                .value_name("HOURS")
                .global(true)
                .value_parser(value_parser!(u64).range(1..=MAX_TOKEN_HOUR_LIFESPAN))
                .help("Token lifespan in hours (overrides TOKEN_HOUR_LIFESPAN)"),
        )
        .subcommand(
            Command::new("serve").about("Run the HTTP server").arg(
                Arg::new("bind")
                    .long("bind")
                    .value_name("ADDR")
                    .value_parser(value_parser!(std::net::SocketAddr))
                    .default_value("127.0.0.1:8080")
                    .help("Bind address"),
            ),
        )
        .subcommand(
            Command::new("issue").about("Issue a token for a user").arg(
                Arg::new("user-id")
                    .long("user-id")
                    .value_name("ID")
                    .required(true)
                    .value_parser(value_parser!(u64))
                    .help("Principal identifier to embed"),
            ),
        )
        .subcommand(
            Command::new("verify")
                .about("Verify a token and print its user id")
                .arg(Arg::new("token").value_name("TOKEN").required(true)),
        )
}

/// Environment configuration with command-line overrides applied
pub fn resolve_config(matches: &ArgMatches, base: AuthConfig) -> AuthConfig {
    let mut config = base;
    if let Some(path) = matches.get_one::<String>("key-path") {
        config = config.with_key_path(path);
    }
    if let Some(hours) = matches.get_one::<u64>("token-hours") {
        config = config.with_token_hours(*hours);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_serve_defaults() {
        let matches = build_cli().try_get_matches_from(["planauth-server", "serve"]).unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "serve");
        assert_eq!(
            *sub.get_one::<SocketAddr>("bind").unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );

        let config = resolve_config(&matches, AuthConfig::default());
        assert_eq!(config, AuthConfig::default());
    }

    #[test]
    fn test_overrides_apply() {
        let matches = build_cli()
            .try_get_matches_from([
                "planauth-server",
                "--key-path",
                "/srv/keys",
                "--token-hours",
                "2",
                "issue",
                "--user-id",
                "42",
            ])
            .unwrap();

        let config = resolve_config(&matches, AuthConfig::default());
        assert_eq!(config.key_path, PathBuf::from("/srv/keys"));
        assert_eq!(config.token_lifespan, Duration::from_secs(7200));

        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(*sub.get_one::<u64>("user-id").unwrap(), 42);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(build_cli().try_get_matches_from(["planauth-server"]).is_err());
        assert!(build_cli()
            .try_get_matches_from(["planauth-server", "issue", "--user-id", "-1"])
            .is_err());
        assert!(build_cli()
            .try_get_matches_from(["planauth-server", "--token-hours", "0", "serve"])
            .is_err());
        assert!(build_cli()
            .try_get_matches_from(["planauth-server", "--token-hours", "100001", "serve"])
            .is_err());
    }
}
