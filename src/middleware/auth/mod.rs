/*
 * Responsibility
 * - Bearer トークンの認証 middleware 一式
 *   - refresh: 失効した access token を refresh cookie でローテーションする
 *   - access: トークンサービスで検証し SecurityContext を載せる
 * - 失敗は全て 401 `{"status":401,"message":"Unauthorized"}` に揃える
 */
pub mod access;
pub mod base;
pub mod context;
pub mod cookies;
pub mod error;
pub mod refresh;

use axum::Router;

use crate::state::AppState;

pub use base::{ACCESS_TOKEN_HEADER, AuthSettings, resolve_bearer_token};
pub use context::{ContextOrigin, PrincipalSummary, SecurityContext};
pub use cookies::RefreshCookieSettings;
pub use error::AuthError;

/// Apply refresh (outer) and token authentication (inner) to `router`.
pub fn apply<S>(router: Router<S>, state: AppState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let router = access::apply(router, state.clone());
    refresh::apply(router, state)
}
