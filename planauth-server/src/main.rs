//! planauth server and operator commands

use anyhow::Context;
use planauth_core::{AuthConfig, AuthGate, Principal, TokenCodec};
use planauth_server::{build_cli, resolve_config, AppState, AuthServer};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let matches = build_cli().get_matches();
    let config = resolve_config(&matches, AuthConfig::from_env());
    let codec = Arc::new(TokenCodec::from_config(&config));

    match matches.subcommand() {
        Some(("serve", sub)) => {
            let bind_addr = *sub
                .get_one::<SocketAddr>("bind")
                .context("missing bind address")?;

            info!("Key directory: {}", config.key_path.display());
            info!("Token lifespan: {}h", config.token_lifespan.as_secs() / 3600);

            let state = AppState::new(AuthGate::new(codec));
            AuthServer::new(state)
                .serve(bind_addr)
                .await
                .with_context(|| format!("server on {} failed", bind_addr))?;
            info!("Server shutdown gracefully");
        }
        Some(("issue", sub)) => {
            let user_id = *sub.get_one::<u64>("user-id").context("missing user id")?;
            let token = codec.issue(Principal(user_id))?;
            println!("{}", token);
        }
        Some(("verify", sub)) => {
            let token = sub.get_one::<String>("token").context("missing token")?;
            match codec.verify(token) {
                Ok(principal) => println!("{}", principal),
                Err(e) => anyhow::bail!("{} ({})", e, e.kind()),
            }
        }
        _ => anyhow::bail!("no subcommand given"),
    }

    Ok(())
}
