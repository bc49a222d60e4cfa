//! Environment-driven configuration for the token service

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Environment variable overriding the key directory
pub const KEY_PATH_ENV: &str = "KEY_PATH";

/// Environment variable holding the token lifespan in whole hours
pub const TOKEN_HOUR_LIFESPAN_ENV: &str = "TOKEN_HOUR_LIFESPAN";

/// Key directory used when `KEY_PATH` is unset
pub const DEFAULT_KEY_PATH: &str = "./keys";

/// Token lifespan used when `TOKEN_HOUR_LIFESPAN` is unset or invalid
pub const DEFAULT_TOKEN_HOUR_LIFESPAN: u64 = 24;

/// Longest accepted token lifespan in hours, a little over eleven years
pub const MAX_TOKEN_HOUR_LIFESPAN: u64 = 100_000;

/// File name of the base64 private key inside the key directory
pub const PRIVATE_KEY_FILE: &str = "ed25519.key";

/// File name of the base64 public key inside the key directory
pub const PUBLIC_KEY_FILE: &str = "ed25519.pub";

const SECONDS_PER_HOUR: u64 = 60 * 60;

/// Settings for key storage and token issuance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Directory holding the private and public key files
    pub key_path: PathBuf,

    /// How long an issued token stays valid
    pub token_lifespan: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            key_path: PathBuf::from(DEFAULT_KEY_PATH),
            token_lifespan: Duration::from_secs(DEFAULT_TOKEN_HOUR_LIFESPAN * SECONDS_PER_HOUR),
        }
    }
}

impl AuthConfig {
    /// Resolve configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let key_path = lookup(KEY_PATH_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_KEY_PATH));

        let hours = match lookup(TOKEN_HOUR_LIFESPAN_ENV) {
            Some(raw) => parse_lifespan_hours(&raw).unwrap_or_else(|| {
                warn!(
                    "Ignoring invalid {}={:?}, using {} hours",
                    TOKEN_HOUR_LIFESPAN_ENV, raw, DEFAULT_TOKEN_HOUR_LIFESPAN
                );
                DEFAULT_TOKEN_HOUR_LIFESPAN
            }),
            None => DEFAULT_TOKEN_HOUR_LIFESPAN,
        };

        AuthConfig {
            key_path,
            token_lifespan: Duration::from_secs(hours * SECONDS_PER_HOUR),
        }
    }

    /// Override the key directory
    pub fn with_key_path(mut self, key_path: impl AsRef<Path>) -> Self {
        self.key_path = key_path.as_ref().to_path_buf();
        self
    }

    /// Override the token lifespan in whole hours. Values outside
    /// `1..=MAX_TOKEN_HOUR_LIFESPAN` keep the current lifespan.
    pub fn with_token_hours(mut self, hours: u64) -> Self {
        if let Some(lifespan) = lifespan_from_hours(hours) {
            self.token_lifespan = lifespan;
        } else {
            warn!("Ignoring token lifespan of {} hours", hours);
        }
        self
    }

    /// Path of the private key file
    pub fn private_key_path(&self) -> PathBuf {
        self.key_path.join(PRIVATE_KEY_FILE)
    }

    /// Path of the public key file
    pub fn public_key_path(&self) -> PathBuf {
        self.key_path.join(PUBLIC_KEY_FILE)
    }
}

fn parse_lifespan_hours(raw: &str) -> Option<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|hours| lifespan_from_hours(*hours).is_some())
}

fn lifespan_from_hours(hours: u64) -> Option<Duration> {
    if !(1..=MAX_TOKEN_HOUR_LIFESPAN).contains(&hours) {
        return None;
    }
    hours.checked_mul(SECONDS_PER_HOUR).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = AuthConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, AuthConfig::default());
        assert_eq!(config.key_path, PathBuf::from("./keys"));
        assert_eq!(config.token_lifespan, Duration::from_secs(24 * 3600));
    }

    #[test]
    fn test_overrides() {
        let config = AuthConfig::from_lookup(lookup_from(&[
            (KEY_PATH_ENV, "/var/lib/planauth"),
            (TOKEN_HOUR_LIFESPAN_ENV, "2"),
        ]));
        assert_eq!(config.key_path, PathBuf::from("/var/lib/planauth"));
        assert_eq!(config.token_lifespan, Duration::from_secs(2 * 3600));
        assert_eq!(
            config.private_key_path(),
            PathBuf::from("/var/lib/planauth/ed25519.key")
        );
        assert_eq!(
            config.public_key_path(),
            PathBuf::from("/var/lib/planauth/ed25519.pub")
        );
    }

    #[test]
    fn test_invalid_lifespan_falls_back() {
        for raw in [
            "",
            "abc",
            "1.5",
            "-3",
            "0",
            "100001",
            "5124095576030431",
            "99999999999999999999",
        ] {
            let config = AuthConfig::from_lookup(lookup_from(&[(TOKEN_HOUR_LIFESPAN_ENV, raw)]));
            assert_eq!(
                config.token_lifespan,
                Duration::from_secs(24 * 3600),
                "lifespan {:?} should fall back to the default",
                raw
            );
        }
    }

    #[test]
    fn test_empty_key_path_uses_default() {
        let config = AuthConfig::from_lookup(lookup_from(&[(KEY_PATH_ENV, "")]));
        assert_eq!(config.key_path, PathBuf::from(DEFAULT_KEY_PATH));
    }

    #[test]
    fn test_builder_overrides() {
        let config = AuthConfig::default()
            .with_key_path("/tmp/keys")
            .with_token_hours(0)
            .with_token_hours(3);
        assert_eq!(config.key_path, PathBuf::from("/tmp/keys"));
        assert_eq!(config.token_lifespan, Duration::from_secs(3 * 3600));
    }

    #[test]
    fn test_lifespan_upper_bound() {
        let config = AuthConfig::from_lookup(lookup_from(&[(TOKEN_HOUR_LIFESPAN_ENV, "100000")]));
        assert_eq!(
            config.token_lifespan,
            Duration::from_secs(MAX_TOKEN_HOUR_LIFESPAN * 3600)
        );

        let config = AuthConfig::default()
            .with_token_hours(3)
            .with_token_hours(MAX_TOKEN_HOUR_LIFESPAN + 1)
            .with_token_hours(u64::MAX / 1000);
        assert_eq!(config.token_lifespan, Duration::from_secs(3 * 3600));
    }
}
