//! Remote token service interface (refresh / validate).
use async_trait::async_trait;
use thiserror::Error;

use super::claims::{self, AccessClaims, MalformedToken};

/// Access/refresh pair issued by the token service.
///
/// Never mutated: a refresh produces a new `BearerToken`.
#[derive(Debug, Clone)]
pub struct BearerToken {
    pub access_token: String,
    pub refresh_token: String,
    pub claims: AccessClaims,
}

impl BearerToken {
    /// Build from the raw pair, reading the claims out of `access_token`.
    pub fn from_pair(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Result<Self, MalformedToken> {
        let access_token = access_token.into();
        let claims = claims::parse(&access_token)?;
        Ok(Self {
            access_token,
            refresh_token: refresh_token.into(),
            claims,
        })
    }
}

/// Token-service failures.
///
/// Kept apart from `AuthError`: the middleware decides how each one is surfaced.
#[derive(Debug, Error)]
pub enum TokenServiceError {
    #[error("token service request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token service rejected {operation} ({status}): {detail}")]
    Rejected {
        operation: &'static str,
        status: u16,
        detail: String,
    },
    #[error("invalid token service response: {0}")]
    InvalidResponse(String),
}

impl From<MalformedToken> for TokenServiceError {
    fn from(e: MalformedToken) -> Self {
        Self::InvalidResponse(e.to_string())
    }
}

/// Remote user/session service, as seen by the auth middleware.
///
/// The service is the source of truth for refresh-token single use: a second
/// `refresh_token` call with the same value must fail.
#[async_trait]
pub trait TokenService: Send + Sync + 'static {
    /// Exchange a refresh token for a new token pair.
    async fn refresh_token(&self, refresh_token: &str) -> Result<BearerToken, TokenServiceError>;

    /// Validate an access token.
    ///
    /// Returns:
    /// - `Ok(Some(_))` if the service accepts the token
    /// - `Ok(None)` if it does not recognise it
    /// - `Err(_)` on transport/protocol failure
    async fn validate(&self, access_token: &str) -> Result<Option<BearerToken>, TokenServiceError>;
}
