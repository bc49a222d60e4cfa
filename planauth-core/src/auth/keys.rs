//! Ed25519 key material
//!
//! Key pairs and verification keys used to sign and check identity tokens.

use crate::{AuthError, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;

/// Length of an Ed25519 seed (secret scalar source)
pub const SEED_LENGTH: usize = 32;

/// Length of the seed||public encoding written to the private key file
pub const KEYPAIR_LENGTH: usize = 64;

/// Ed25519 key pair for signing operations
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new Ed25519 key pair from the OS random source
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();

        KeyPair {
            signing_key,
            verifying_key,
        }
    }

    /// Create key pair from a 32-byte seed; the public half is derived
    pub fn from_seed(seed: &[u8; SEED_LENGTH]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        KeyPair {
            signing_key,
            verifying_key,
        }
    }

    /// Create key pair from the 64-byte seed||public encoding
    pub fn from_keypair_bytes(bytes: &[u8; KEYPAIR_LENGTH]) -> Result<Self> {
        let signing_key = SigningKey::from_keypair_bytes(bytes)
            .map_err(|e| AuthError::KeyUnavailable(format!("invalid key pair: {}", e)))?;
        let verifying_key = signing_key.verifying_key();

        Ok(KeyPair {
            signing_key,
            verifying_key,
        })
    }

    /// Decode a private key of either accepted length
    pub fn from_private_bytes(bytes: &[u8]) -> Result<Self> {
        if let Ok(keypair) = <&[u8; KEYPAIR_LENGTH]>::try_from(bytes) {
            return Self::from_keypair_bytes(keypair);
        }
        if let Ok(seed) = <&[u8; SEED_LENGTH]>::try_from(bytes) {
            return Ok(Self::from_seed(seed));
        }
        Err(AuthError::KeyUnavailable(format!(
            "private key must be {} or {} bytes, got {}",
            KEYPAIR_LENGTH,
            SEED_LENGTH,
            bytes.len()
        )))
    }

    /// Get the verifying key
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Get the public half as a standalone verification key
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(self.verifying_key)
    }

    /// Get seed bytes (sensitive operation)
    pub fn signing_key_bytes(&self) -> [u8; SEED_LENGTH] {
        self.signing_key.to_bytes()
    }

    /// Get verifying key bytes
    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Get the seed||public encoding (sensitive operation)
    pub fn keypair_bytes(&self) -> [u8; KEYPAIR_LENGTH] {
        self.signing_key.to_keypair_bytes()
    }

    /// Sign data with this key pair
    pub fn sign(&self, data: &[u8]) -> Signature {
        self.signing_key.sign(data)
    }

    /// Get a unique identifier for this key (hash of public key)
    pub fn key_id(&self) -> KeyId {
        KeyId::from_verifying_key(&self.verifying_key)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("key_id", &self.key_id())
            .finish_non_exhaustive()
    }
}

/// Public key for verification operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    verifying_key: VerifyingKey,
}

impl PublicKey {
    /// Create from verifying key
    pub fn from_verifying_key(verifying_key: VerifyingKey) -> Self {
        PublicKey { verifying_key }
    }

    /// Create from public key bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let verifying_key = VerifyingKey::from_bytes(bytes)
            .map_err(|e| AuthError::KeyUnavailable(format!("invalid public key: {}", e)))?;

        Ok(PublicKey { verifying_key })
    }

    /// Create from an arbitrary byte slice, checking its length
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes = <&[u8; 32]>::try_from(bytes).map_err(|_| {
            AuthError::KeyUnavailable(format!("public key must be 32 bytes, got {}", bytes.len()))
        })?;
        Self::from_bytes(bytes)
    }

    /// Get public key bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Verify a signature against data
    pub fn verify(&self, data: &[u8], signature: &Signature) -> Result<()> {
        self.verifying_key
            .verify(data, signature)
            .map_err(|_| AuthError::InvalidSignature)
    }

    /// Get a unique identifier for this key
    pub fn key_id(&self) -> KeyId {
        KeyId::from_verifying_key(&self.verifying_key)
    }
}

/// Short fingerprint of a public key, safe to log
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyId(String);

impl KeyId {
    /// Create key ID from verifying key (BLAKE3 hash of public key bytes)
    pub fn from_verifying_key(verifying_key: &VerifyingKey) -> Self {
        let hash = blake3::hash(&verifying_key.to_bytes());
        KeyId(hex::encode(&hash.as_bytes()[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

mod hex {
    use std::fmt::Write;

    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().fold(String::new(), |mut output, b| {
            let _ = write!(output, "{:02x}", b);
            output
        })
    }
}
