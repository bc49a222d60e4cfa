//! Request authentication
//!
//! Pulls the bearer credential out of an inbound request and hands it to
//! the token codec.

use crate::{AuthError, Principal, Result, TokenCodec};
use http::header::AUTHORIZATION;
use http::{HeaderMap, Request};
use std::sync::Arc;
use tracing::debug;

/// Authentication scheme expected in the `Authorization` header
pub const BEARER_SCHEME: &str = "Bearer";

/// Principal recorded on a request that passed the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedPrincipal(pub Principal);

/// Entry point that authenticates inbound requests
#[derive(Clone)]
pub struct AuthGate {
    codec: Arc<TokenCodec>,
}

impl AuthGate {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        AuthGate { codec }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Authenticate a request from its `Authorization` header
    pub fn authenticate<B>(&self, request: &Request<B>) -> Result<Principal> {
        self.authenticate_headers(request.headers())
    }

    pub fn authenticate_headers(&self, headers: &HeaderMap) -> Result<Principal> {
        let token = extract_bearer(headers).ok_or(AuthError::MissingToken)?;

        let outcome = self.codec.verify(token);
        match &outcome {
            Ok(principal) => debug!("Authenticated principal {}", principal),
            Err(e) => debug!("Rejected credential: {} ({})", e, e.kind()),
        }
        outcome
    }

    /// Authenticate and attach the principal to the request for
    /// downstream handlers.
    pub fn admit<B>(&self, request: &mut Request<B>) -> Result<Principal> {
        let principal = self.authenticate(request)?;
        request
            .extensions_mut()
            .insert(AuthenticatedPrincipal(principal));
        Ok(principal)
    }
}

/// Principal attached by [`AuthGate::admit`], if any
pub fn principal_of<B>(request: &Request<B>) -> Option<Principal> {
    request
        .extensions()
        .get::<AuthenticatedPrincipal>()
        .map(|authenticated| authenticated.0)
}

/// Read the credential from an `Authorization: Bearer <token>` header.
///
/// The header must split on single spaces into exactly two parts.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let parts: Vec<&str> = value.split(' ').collect();

    match parts.as_slice() {
        [scheme, credential]
            if scheme.eq_ignore_ascii_case(BEARER_SCHEME) && !credential.is_empty() =>
        {
            Some(*credential)
        }
        _ => None,
    }
}
