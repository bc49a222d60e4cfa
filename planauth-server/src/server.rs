//! HTTP/1 server with the auth gate in front of protected routes

use crate::handlers::{handle_request, AppState};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

pub struct AuthServer {
    state: AppState,
}

impl AuthServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn serve(self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_listener(listener).await
    }

    /// Accept connections until interrupted
    pub async fn serve_listener(self, listener: TcpListener) -> std::io::Result<()> {
        info!("planauth server listening on {}", listener.local_addr()?);

        loop {
            let (stream, remote_addr) = tokio::select! {
                accepted = listener.accept() => accepted?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested");
                    return Ok(());
                }
            };
            debug!("New connection from {}", remote_addr);

            let state = self.state.clone();
            tokio::spawn(async move {
                if let Err(err) = Self::handle_connection(stream, state).await {
                    error!("Connection error from {}: {}", remote_addr, err);
                }
            });
        }
    }

    async fn handle_connection(stream: TcpStream, state: AppState) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);

        let service = service_fn(move |req| {
            let state = state.clone();
            async move { handle_request(req, state).await }
        });

        http1::Builder::new().serve_connection(io, service).await
    }
}
