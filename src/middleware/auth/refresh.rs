//! Expired access token → refresh-token rotation → forward with the new token.
//!
//! Per request, single pass:
//! 1. no bearer token, or a token that is still valid: forward unchanged
//! 2. expired token: take the refresh cookie bound to its `jti`, exchange it at the
//!    token service, drop the consumed cookie, set the cookie for the new `jti`,
//!    expose the new access token in `access-token`, and forward a request that
//!    carries `Authorization: Bearer <new>`
//! 3. any failure in 2: 401, the rest of the chain never runs
//!
//! No local locking: two requests racing on the same refresh cookie both reach the
//! token service, which lets only one of them through.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};

use super::base::{self, AuthSettings};
use super::cookies::{self, PendingCookies};
use super::error::{AuthError, INVALID_REFRESH_TOKEN};
use crate::services::auth::{BearerToken, claims};
use crate::state::AppState;

/// Apply the refresh middleware to `router`.
///
/// Layers added later wrap earlier ones, so apply this *after* the token
/// authentication middleware to run before it.
pub fn apply<S>(router: Router<S>, state: AppState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(state, refresh_middleware))
}

pub async fn refresh_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = base::resolve_bearer_token(req.headers()) else {
        return next.run(req).await;
    };

    match claims::is_expired(&token) {
        Ok(false) => return next.run(req).await,
        Ok(true) => {}
        Err(err) => {
            // Not a token we can refresh; authentication further down rejects it.
            tracing::debug!(error = %err, "unparsable bearer token, skipping refresh");
            return next.run(req).await;
        }
    }

    let secure = base::is_secure_request(&req, &state.auth);
    let mut pending = PendingCookies::default();

    let (old_cookie, refresh_token) = match find_refresh_cookie(&state.auth, req.headers(), &token) {
        Ok(found) => found,
        Err(err) => return reject(err, pending),
    };

    let refreshed =
        match refresh_access_token(&state, &old_cookie, &refresh_token, secure, &mut pending).await {
            Ok(refreshed) => refreshed,
            Err(err) => return reject(err, pending),
        };

    let req = match base::with_bearer_token(req, &refreshed.access_token) {
        Ok(req) => req,
        Err(err) => return reject(err, pending),
    };
    if let Err(err) = refresh_user_session(&state.auth, &refreshed, secure, &mut pending) {
        return reject(err, pending);
    }

    tracing::debug!(jti = ?refreshed.claims.unique_id, "access token refreshed");

    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    pending.write_to(headers);
    if let Err(err) = base::add_access_token_header(headers, &refreshed.access_token) {
        // Already accepted as a header value by with_bearer_token.
        tracing::warn!(error = %err, "could not expose refreshed access token");
    }
    response
}

/// Name and value of the refresh cookie bound to `expired_token`.
fn find_refresh_cookie(
    settings: &AuthSettings,
    headers: &HeaderMap,
    expired_token: &str,
) -> Result<(String, String), AuthError> {
    let jti = claims::unique_id(expired_token)
        .map_err(|e| AuthError::access_denied(e.to_string()))?
        .ok_or_else(|| AuthError::access_denied(INVALID_REFRESH_TOKEN))?;

    let name = settings.refresh_cookie.cookie_name(&jti);
    let refresh_token = cookies::find_refresh_token(headers, &name)
        .ok_or_else(|| AuthError::access_denied(INVALID_REFRESH_TOKEN))?;
    Ok((name, refresh_token))
}

/// Exchange `refresh_token` for a new token pair and queue the removal of the
/// cookie it came from.
async fn refresh_access_token(
    state: &AppState,
    old_cookie: &str,
    refresh_token: &str,
    secure: bool,
    pending: &mut PendingCookies,
) -> Result<BearerToken, AuthError> {
    let refreshed = state
        .token_service
        .refresh_token(refresh_token)
        .await
        .map_err(|e| {
            tracing::warn!(cookie = %old_cookie, error = %e, "refresh token exchange failed");
            AuthError::from(e)
        })?;

    // Consumed: the old cookie must not outlive this response.
    pending.push(cookies::removal_cookie(old_cookie, secure));
    Ok(refreshed)
}

/// Queue the refresh cookie for the new access token.
fn refresh_user_session(
    settings: &AuthSettings,
    token: &BearerToken,
    secure: bool,
    pending: &mut PendingCookies,
) -> Result<(), AuthError> {
    let jti = token
        .claims
        .unique_id
        .as_deref()
        .ok_or_else(|| AuthError::access_denied("refreshed access token has no jti"))?;

    pending.push(cookies::refresh_cookie(
        &settings.refresh_cookie,
        jti,
        &token.refresh_token,
        secure,
    ));
    Ok(())
}

fn reject(err: AuthError, pending: PendingCookies) -> Response {
    let mut response = err.into_response();
    if !pending.is_empty() {
        pending.write_to(response.headers_mut());
    }
    response
}
