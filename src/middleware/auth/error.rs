//! Authentication failures and the 401 responder.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::auth::TokenServiceError;

pub const INVALID_REFRESH_TOKEN: &str = "invalid refresh token";

/// Failures that end a request at the auth middleware.
///
/// Every variant renders the same 401; the detail only goes to the log.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("token service failure: {0}")]
    RemoteService(String),
}

impl AuthError {
    pub fn access_denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied(reason.into())
    }
}

impl From<TokenServiceError> for AuthError {
    fn from(e: TokenServiceError) -> Self {
        match e {
            // The service answered and said no.
            TokenServiceError::Rejected { .. } => Self::AccessDenied(e.to_string()),
            TokenServiceError::Http(_) | TokenServiceError::InvalidResponse(_) => {
                Self::RemoteService(e.to_string())
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UnauthorizedBody {
    pub status: u16,
    pub message: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "authentication failure");

        let status = StatusCode::UNAUTHORIZED;
        let body = UnauthorizedBody {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or("Unauthorized"),
        };

        // Json sets `content-type: application/json`
        (status, Json(body)).into_response()
    }
}
