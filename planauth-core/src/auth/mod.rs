//! Authentication module for planauth
//!
//! - Ed25519 key pairs and their durable store
//! - Signed identity tokens (EdDSA JWTs) carrying a principal id
//! - Bearer credential extraction for inbound requests

pub mod claims;
pub mod codec;
pub mod gate;
pub mod keys;
pub mod store;

pub use claims::*;
pub use codec::*;
pub use gate::*;
pub use keys::*;
pub use store::*;
