//! Error types for the planauth token service

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Signing keys unavailable: {0}")]
    KeyUnavailable(String),

    #[error("No token provided")]
    MissingToken,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Unexpected signing method: {found} (expected {expected})")]
    AlgorithmMismatch { expected: String, found: String },

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token claims: {0}")]
    MalformedClaims(String),

    #[error("Token signing failed: {0}")]
    SigningFailed(String),
}

impl AuthError {
    /// Stable short name, suitable as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::KeyUnavailable(_) => "key_unavailable",
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::AlgorithmMismatch { .. } => "algorithm_mismatch",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::MalformedClaims(_) => "malformed_claims",
            AuthError::SigningFailed(_) => "signing_failed",
        }
    }

    /// Key storage failures are the service's fault, not the client's.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            AuthError::KeyUnavailable(_) | AuthError::SigningFailed(_)
        )
    }
}
