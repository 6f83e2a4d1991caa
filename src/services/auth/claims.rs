//! Access-token claims reader.
//!
//! Decodes the payload of a signed access token (JWS compact serialization) without
//! verifying the signature. Signature trust belongs to the issuing token service: the
//! token-authentication middleware asks it to validate tokens, the refresh middleware
//! only needs `exp` and `jti` to decide whether (and with which cookie) to refresh.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The token could not be decoded as a signed token structure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed token: {0}")]
pub struct MalformedToken(pub String);

/// User role carried in the `role` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Staff,
    System,
    Technical,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Staff => "STAFF",
            Role::System => "SYSTEM",
            Role::Technical => "TECHNICAL",
        }
    }

    /// Granted authority name, e.g. `ROLE_CUSTOMER`.
    pub fn authority(&self) -> String {
        format!("ROLE_{}", self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = MalformedToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CUSTOMER" => Ok(Role::Customer),
            "STAFF" => Ok(Role::Staff),
            "SYSTEM" => Ok(Role::System),
            "TECHNICAL" => Ok(Role::Technical),
            other => Err(MalformedToken(format!("unknown role '{other}'"))),
        }
    }
}

/// Claims read from an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    /// `jti`: binds the token to exactly one refresh cookie.
    pub unique_id: Option<String>,
    /// `exp`; `None` means the token is treated as expired.
    pub expiration: Option<DateTime<Utc>>,
    pub role: Option<Role>,
    pub subject: Option<String>,
}

impl AccessClaims {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiration {
            Some(exp) => exp < now,
            None => true,
        }
    }

    pub fn authorities(&self) -> BTreeSet<String> {
        self.role.iter().map(Role::authority).collect()
    }
}

// Raw payload. Unknown roles are dropped rather than failing the whole token.
#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    jti: Option<String>,
    // NumericDate: fractional seconds are allowed.
    #[serde(default)]
    exp: Option<f64>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    sub: Option<String>,
}

/// Decode the claims of `token`.
pub fn parse(token: &str) -> Result<AccessClaims, MalformedToken> {
    let token = token.trim();
    let mut segments = token.split('.');
    let (Some(_), Some(payload), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(MalformedToken("expected three segments".into()));
    };

    // Validates the protected header (JSON with a known `alg`).
    jsonwebtoken::decode_header(token).map_err(|e| MalformedToken(e.to_string()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| MalformedToken(format!("payload: {e}")))?;
    let raw: RawClaims =
        serde_json::from_slice(&bytes).map_err(|e| MalformedToken(format!("payload: {e}")))?;

    let expiration = raw.exp.map(expiration_from_numeric_date).transpose()?;

    let role = raw.role.as_deref().and_then(|r| match r.parse::<Role>() {
        Ok(role) => Some(role),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring role claim");
            None
        }
    });

    Ok(AccessClaims {
        unique_id: raw.jti.filter(|id| !id.is_empty()),
        expiration,
        role,
        subject: raw.sub,
    })
}

/// Whole seconds of a NumericDate, rounded down.
fn expiration_from_numeric_date(secs: f64) -> Result<DateTime<Utc>, MalformedToken> {
    let floored = secs.floor();
    if !floored.is_finite() || floored < i64::MIN as f64 || floored >= i64::MAX as f64 {
        return Err(MalformedToken(format!("exp out of range: {secs}")));
    }
    DateTime::<Utc>::from_timestamp(floored as i64, 0)
        .ok_or_else(|| MalformedToken(format!("exp out of range: {secs}")))
}

/// Whether `token` is expired right now. A token without `exp` counts as expired.
pub fn is_expired(token: &str) -> Result<bool, MalformedToken> {
    Ok(parse(token)?.is_expired_at(Utc::now()))
}

/// The `jti` of `token`; `None` for empty input or a token without one.
pub fn unique_id(token: &str) -> Result<Option<String>, MalformedToken> {
    if token.trim().is_empty() {
        return Ok(None);
    }
    Ok(parse(token)?.unique_id)
}
