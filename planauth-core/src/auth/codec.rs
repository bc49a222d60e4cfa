//! Signed identity tokens
//!
//! Tokens are compact EdDSA JWTs produced with jwt-simple. Structure and
//! algorithm are checked up front so that every rejection maps onto a
//! single, specific `AuthError`.

use crate::{
    AuthConfig, AuthError, FileKeyStore, IssuedClaims, KeyPair, KeySource, PayloadClaims,
    Principal, Result, SystemClock, TimeSource, TokenClaims,
};
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::{alphabet, Engine as _};
use jwt_simple::prelude::{
    Claims, Duration as JwtDuration, Ed25519KeyPair, Ed25519PublicKey, EdDSAKeyPairLike,
    EdDSAPublicKeyLike, UnixTimeStamp, VerificationOptions,
};
use jwt_simple::JWTError;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// The only signing algorithm this service issues or accepts
pub const TOKEN_ALGORITHM: &str = "EdDSA";

const SIGNATURE_LENGTH: usize = 64;

/// Timestamps must stay below 2^32 seconds; jwt-simple keeps them in
/// 32.32 fixed point.
pub const MAX_UNIX_TIMESTAMP: u64 = u32::MAX as u64;

/// Lenient decoder for the signature segment. Anything it accepts that is
/// not the canonical encoding of 64 bytes counts as a damaged signature.
const SIGNATURE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Deserialize)]
struct TokenHeader {
    alg: String,
}

/// Issues and verifies identity tokens
pub struct TokenCodec {
    keys: Arc<dyn KeySource>,
    lifespan: Duration,
    clock: Arc<dyn TimeSource>,
}

impl TokenCodec {
    pub fn new(keys: Arc<dyn KeySource>, lifespan: Duration) -> Self {
        TokenCodec {
            keys,
            lifespan,
            clock: Arc::new(SystemClock),
        }
    }

    /// Codec backed by the file key store named in `config`
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            Arc::new(FileKeyStore::from_config(config)),
            config.token_lifespan,
        )
    }

    /// Replace the time source used for expiry
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn lifespan(&self) -> Duration {
        self.lifespan
    }

    /// Issue a token for `principal`, valid for the configured lifespan
    pub fn issue(&self, principal: Principal) -> Result<String> {
        let keypair = self
            .keys
            .key_pair()
            .map_err(|e| AuthError::SigningFailed(e.to_string()))?;
        let signer = jwt_key_pair(&keypair)?;

        let now = self.clock.now();
        let expires_at = now
            .checked_add(self.lifespan.as_secs())
            .filter(|exp| *exp <= MAX_UNIX_TIMESTAMP)
            .ok_or_else(|| {
                AuthError::SigningFailed(format!(
                    "lifespan of {}s from {} exceeds the representable expiry",
                    self.lifespan.as_secs(),
                    now
                ))
            })?;

        let mut claims = Claims::with_custom_claims(
            IssuedClaims::for_principal(principal),
            JwtDuration::from_secs(0),
        );
        claims.issued_at = None;
        claims.invalid_before = None;
        claims.expires_at = Some(UnixTimeStamp::from_secs(expires_at));

        let token = signer
            .sign(claims)
            .map_err(|e| AuthError::SigningFailed(e.to_string()))?;

        debug!("Issued token for principal {} expiring at {}", principal, expires_at);
        Ok(token)
    }

    /// Verify a token and return the principal it was issued for
    pub fn verify(&self, token: &str) -> Result<Principal> {
        self.decode(token).map(|claims| claims.principal)
    }

    /// Verify a token and return its full claims
    pub fn decode(&self, token: &str) -> Result<TokenClaims> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let keypair = self.keys.key_pair()?;
        check_structure(token)?;

        let public_key = Ed25519PublicKey::from_bytes(&keypair.verifying_key_bytes())
            .map_err(|e| AuthError::KeyUnavailable(format!("public key conversion failed: {}", e)))?;

        let now = self.clock.now();
        if now > MAX_UNIX_TIMESTAMP {
            // Every issuable expiry lies in the past.
            return Err(AuthError::TokenExpired);
        }
        let options = VerificationOptions {
            time_tolerance: Some(JwtDuration::from_secs(0)),
            artificial_time: Some(UnixTimeStamp::from_secs(now)),
            ..Default::default()
        };

        let verified = public_key
            .verify_token::<PayloadClaims>(token, Some(options))
            .map_err(classify_verification_error)?;

        let expires_at = verified.expires_at.map(|exp| exp.as_secs());
        if let Some(exp) = expires_at {
            if now >= exp {
                return Err(AuthError::TokenExpired);
            }
        }

        TokenClaims::from_payload(&verified.custom, expires_at)
    }
}

/// Check the three-segment layout and the declared algorithm
fn check_structure(token: &str) -> Result<()> {
    let segments: Vec<&str> = token.split('.').collect();
    let [header, claims, signature] = segments.as_slice() else {
        return Err(AuthError::MalformedToken(format!(
            "expected 3 segments, got {}",
            segments.len()
        )));
    };

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|e| AuthError::MalformedToken(format!("header encoding: {}", e)))?;
    let header: TokenHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| AuthError::MalformedToken(format!("header: {}", e)))?;

    URL_SAFE_NO_PAD
        .decode(claims)
        .map_err(|e| AuthError::MalformedToken(format!("claims encoding: {}", e)))?;

    if header.alg != TOKEN_ALGORITHM {
        return Err(AuthError::AlgorithmMismatch {
            expected: TOKEN_ALGORITHM.to_string(),
            found: header.alg,
        });
    }

    match SIGNATURE_ENGINE.decode(signature) {
        Ok(bytes)
            if bytes.len() == SIGNATURE_LENGTH && URL_SAFE_NO_PAD.encode(&bytes) == *signature =>
        {
            Ok(())
        }
        _ => Err(AuthError::InvalidSignature),
    }
}

fn classify_verification_error(err: jwt_simple::Error) -> AuthError {
    if let Some(jwt_error) = err.downcast_ref::<JWTError>() {
        return match jwt_error {
            JWTError::InvalidSignature => AuthError::InvalidSignature,
            JWTError::TokenHasExpired => AuthError::TokenExpired,
            JWTError::AlgorithmMismatch => AuthError::AlgorithmMismatch {
                expected: TOKEN_ALGORITHM.to_string(),
                found: "unknown".to_string(),
            },
            JWTError::ClockDrift | JWTError::TokenNotValidYet => {
                AuthError::MalformedClaims(jwt_error.to_string())
            }
            other => AuthError::MalformedToken(other.to_string()),
        };
    }
    // The header was parsed before verification, so a JSON error here
    // comes from the signed payload.
    if let Some(json_error) = err.downcast_ref::<serde_json::Error>() {
        return AuthError::MalformedClaims(json_error.to_string());
    }
    AuthError::MalformedToken(err.to_string())
}

fn jwt_key_pair(keypair: &KeyPair) -> Result<Ed25519KeyPair> {
    Ed25519KeyPair::from_bytes(&keypair.keypair_bytes())
        .map_err(|e| AuthError::SigningFailed(format!("key conversion failed: {}", e)))
}
