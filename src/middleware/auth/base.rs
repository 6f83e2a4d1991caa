//! Primitives shared by the auth middlewares.
//!
//! - bearer token extraction from `Authorization`
//! - transport-security detection (for the cookie `Secure` flag)
//! - request view with an overridden `Authorization` header
//! - `access-token` response header
use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Request, header},
};

use super::context;
use super::cookies::RefreshCookieSettings;
use super::error::AuthError;

pub const BEARER_TOKEN_PREFIX: &str = "Bearer ";

/// Response header carrying a refreshed access token.
pub const ACCESS_TOKEN_HEADER: &str = "access-token";

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Settings shared by the auth middlewares.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub refresh_cookie: RefreshCookieSettings,
    /// Honour `X-Forwarded-Proto` when deciding whether the request was secure.
    pub trust_forwarded_proto: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            refresh_cookie: RefreshCookieSettings::default(),
            trust_forwarded_proto: true,
        }
    }
}

/// Bearer token from `Authorization`, or `None` when absent, blank, or not a
/// bearer credential.
pub fn resolve_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let prefix_len = BEARER_TOKEN_PREFIX.len();
    if value.len() < prefix_len
        || !value.is_char_boundary(prefix_len)
        || !value[..prefix_len].eq_ignore_ascii_case(BEARER_TOKEN_PREFIX)
    {
        return None;
    }

    let token = value[prefix_len..].trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Whether the request reached us over a secure transport.
pub fn is_secure_request(req: &Request<Body>, settings: &AuthSettings) -> bool {
    if req.uri().scheme_str() == Some("https") {
        return true;
    }
    if !settings.trust_forwarded_proto {
        return false;
    }
    req.headers()
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}

/// New request identical to `req` except for `Authorization: Bearer <access_token>`.
///
/// Method, URI, version, extensions, body and every other header move over
/// untouched. `req` is consumed, so nothing downstream can observe the old token.
/// A security context already present described the old token and is disowned.
pub fn with_bearer_token(req: Request<Body>, access_token: &str) -> Result<Request<Body>, AuthError> {
    let value = bearer_header_value(access_token)?;
    let (mut parts, body) = req.into_parts();
    parts.headers.insert(header::AUTHORIZATION, value);
    context::disown(&mut parts.extensions);
    Ok(Request::from_parts(parts, body))
}

fn bearer_header_value(access_token: &str) -> Result<HeaderValue, AuthError> {
    let mut value = HeaderValue::from_str(&format!("{BEARER_TOKEN_PREFIX}{access_token}"))
        .map_err(|_| AuthError::access_denied("access token is not a valid header value"))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Expose the refreshed access token to the client.
pub fn add_access_token_header(headers: &mut HeaderMap, access_token: &str) -> Result<(), AuthError> {
    let value = HeaderValue::from_str(access_token)
        .map_err(|_| AuthError::access_denied("access token is not a valid header value"))?;
    headers.insert(HeaderName::from_static(ACCESS_TOKEN_HEADER), value);
    Ok(())
}
