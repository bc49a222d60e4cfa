//! HTTP request handlers for the planauth server

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE, SERVER, WWW_AUTHENTICATE};
use hyper::{Method, Request, Response, StatusCode};
use planauth_core::{principal_of, AuthError, AuthGate};
use serde_json::json;
use std::convert::Infallible;
use tracing::{debug, info, warn};

pub type BoxBody = Full<Bytes>;

/// Path prefix of routes that require a bearer token
pub const PROTECTED_PREFIX: &str = "/api/admin/";

/// Shared state handed to every request
#[derive(Clone)]
pub struct AppState {
    gate: AuthGate,
}

impl AppState {
    pub fn new(gate: AuthGate) -> Self {
        AppState { gate }
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }
}

/// Main request handler
pub async fn handle_request<B>(
    mut req: Request<B>,
    state: AppState,
) -> Result<Response<BoxBody>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("Handling {} {}", method, path);

    let response = if path.starts_with(PROTECTED_PREFIX) {
        match state.gate.admit(&mut req) {
            Ok(_) => route_protected(&method, &path, &req),
            Err(e) => auth_failure(&e),
        }
    } else {
        match (&method, path.as_str()) {
            (&Method::GET, "/health") => handle_health(),
            _ => not_found(),
        }
    };

    info!("{} {} -> {}", method, path, response.status());
    Ok(response)
}

fn route_protected<B>(method: &Method, path: &str, req: &Request<B>) -> Response<BoxBody> {
    match (method, path) {
        (&Method::GET, "/api/admin/user") => handle_current_user(req),
        _ => not_found(),
    }
}

/// Health check handler
fn handle_health() -> Response<BoxBody> {
    simple_response(
        StatusCode::OK,
        json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "service": "planauth"
        })
        .to_string(),
    )
}

/// Report the principal the gate attached to this request
fn handle_current_user<B>(req: &Request<B>) -> Response<BoxBody> {
    match principal_of(req) {
        Some(principal) => simple_response(
            StatusCode::OK,
            json!({ "user_id": principal.id() }).to_string(),
        ),
        None => auth_failure(&AuthError::MissingToken),
    }
}

/// Translate a gate rejection into a response
pub fn auth_failure(err: &AuthError) -> Response<BoxBody> {
    if err.is_unavailable() {
        warn!("Authentication unavailable: {}", err);
        return simple_response(
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "error": "authentication temporarily unavailable" }).to_string(),
        );
    }

    let mut response = simple_response(
        StatusCode::UNAUTHORIZED,
        json!({ "error": err.to_string() }).to_string(),
    );
    response
        .headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}

fn not_found() -> Response<BoxBody> {
    simple_response(
        StatusCode::NOT_FOUND,
        json!({ "error": "Not found" }).to_string(),
    )
}

/// Simple JSON response builder
pub fn simple_response(status: StatusCode, body: impl Into<String>) -> Response<BoxBody> {
    let mut response = Response::new(Full::new(Bytes::from(body.into())));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(SERVER, HeaderValue::from_static("planauth"));
    response
}
