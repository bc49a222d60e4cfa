//! The auth gate exercised over a real TCP connection

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::header::{AUTHORIZATION, HOST};
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use planauth_core::{AuthConfig, AuthGate, Principal, TokenCodec};
use planauth_server::{AppState, AuthServer};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

async fn start_server(codec: Arc<TokenCodec>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = AuthServer::new(AppState::new(AuthGate::new(codec)));
    tokio::spawn(async move {
        let _ = server.serve_listener(listener).await;
    });
    addr
}

async fn get(addr: SocketAddr, path: &str, authorization: Option<String>) -> (StatusCode, serde_json::Value) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .unwrap();
    tokio::spawn(connection);

    let mut builder = Request::builder().uri(path).header(HOST, addr.to_string());
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    let response = sender
        .send_request(builder.body(Empty::<Bytes>::new()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn protected_route_requires_valid_bearer_token() {
    let keys = tempfile::tempdir().unwrap();
    let config = AuthConfig::default()
        .with_key_path(keys.path())
        .with_token_hours(1);
    let codec = Arc::new(TokenCodec::from_config(&config));
    let addr = start_server(codec.clone()).await;

    let (status, body) = get(addr, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "planauth");

    let (status, body) = get(addr, "/api/admin/user", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "No token provided");

    let (status, _) = get(addr, "/api/admin/user", Some("Token abc".to_string())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = codec.issue(Principal(42)).unwrap();
    let (status, body) = get(addr, "/api/admin/user", Some(format!("Bearer {}", token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], 42);

    // A token signed under a different key directory is a forgery here.
    let other_keys = tempfile::tempdir().unwrap();
    let foreign = TokenCodec::from_config(&config.clone().with_key_path(other_keys.path()))
        .issue(Principal(42))
        .unwrap();
    let (status, body) = get(addr, "/api/admin/user", Some(format!("Bearer {}", foreign))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token signature");
}
