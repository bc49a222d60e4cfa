//! Token claims
//!
//! `IssuedClaims` is what gets signed. `PayloadClaims` is what a verified
//! payload is read into, deliberately permissive so that a bad `user_id`
//! surfaces as `MalformedClaims` instead of a generic parse failure.
//! `TokenClaims` is the checked, fixed-shape result.

use crate::{AuthError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Largest integer a JSON float carries without loss (2^53)
const MAX_EXACT_FLOAT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Identifier of an authenticated actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(pub u64);

impl Principal {
    pub fn new(id: u64) -> Self {
        Principal(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }

    /// Convert a JSON numeric claim, rejecting anything not exactly a `u64`
    pub fn from_claim(value: &Value) -> Result<Self> {
        let number = match value {
            Value::Number(number) => number,
            other => {
                return Err(AuthError::MalformedClaims(format!(
                    "user_id must be numeric, got {}",
                    other
                )))
            }
        };

        if let Some(id) = number.as_u64() {
            return Ok(Principal(id));
        }

        // Negative integers and floats land here.
        match number.as_f64() {
            Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= MAX_EXACT_FLOAT_INTEGER => {
                Ok(Principal(f as u64))
            }
            _ => Err(AuthError::MalformedClaims(format!(
                "user_id must be a non-negative integer, got {}",
                number
            ))),
        }
    }
}

impl From<u64> for Principal {
    fn from(id: u64) -> Self {
        Principal(id)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Custom claims written into every issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedClaims {
    pub authorized: bool,
    pub user_id: u64,
}

impl IssuedClaims {
    pub fn for_principal(principal: Principal) -> Self {
        IssuedClaims {
            authorized: true,
            user_id: principal.id(),
        }
    }
}

/// Custom claims as read back from a verified payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadClaims {
    #[serde(default)]
    pub authorized: Option<Value>,
    #[serde(default)]
    pub user_id: Option<Value>,
}

/// Decoded and checked contents of a valid token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClaims {
    /// Always `true` for tokens this service accepts
    pub authorized: bool,
    pub principal: Principal,
    /// Expiration as a Unix timestamp in seconds
    pub expires_at: u64,
}

impl TokenClaims {
    /// Build the checked record from a verified payload and its `exp` claim
    pub fn from_payload(payload: &PayloadClaims, expires_at: Option<u64>) -> Result<Self> {
        let expires_at = expires_at
            .ok_or_else(|| AuthError::MalformedClaims("missing exp claim".to_string()))?;

        match &payload.authorized {
            Some(Value::Bool(true)) => {}
            Some(other) => {
                return Err(AuthError::MalformedClaims(format!(
                    "authorized must be true, got {}",
                    other
                )))
            }
            None => {
                return Err(AuthError::MalformedClaims(
                    "missing authorized claim".to_string(),
                ))
            }
        }

        let principal = payload
            .user_id
            .as_ref()
            .ok_or_else(|| AuthError::MalformedClaims("missing user_id claim".to_string()))
            .and_then(Principal::from_claim)?;

        Ok(TokenClaims {
            authorized: true,
            principal,
            expires_at,
        })
    }
}
