//! Token service for planauth: signing key lifecycle, token issuance and
//! request authentication.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;

pub use auth::*;
pub use clock::*;
pub use config::*;
pub use error::*;

/// Result type alias for token service operations
pub type Result<T> = std::result::Result<T, AuthError>;
