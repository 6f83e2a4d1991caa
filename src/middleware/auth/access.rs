//! access token 検証 → SecurityContext を extensions に入れる
//!
//! - `Authorization: Bearer <token>` が無ければ何もしない（handler 側で 401 を判断）
//! - 署名・失効の判断はトークンサービスに委譲する (`TokenService::validate`)
//! - 既にこの middleware が認証済みなら再検証しない

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};

use super::base;
use super::context;
use super::error::AuthError;
use crate::state::AppState;

/// Apply the token authentication middleware to `router`.
///
/// 例：
/// ```ignore
/// let v1 = api::v1::routes();
/// let v1 = middleware::auth::access::apply(v1, state.clone());
/// let v1 = middleware::auth::refresh::apply(v1, state.clone());
/// app = app.nest("/api/v1", v1);
/// ```
pub fn apply<S>(router: Router<S>, state: AppState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

pub async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = base::resolve_bearer_token(req.headers()) else {
        return next.run(req).await;
    };

    if !context::authentication_required(req.extensions()) {
        return next.run(req).await;
    }

    let validated = match state.token_service.validate(&token).await {
        Ok(Some(validated)) => validated,
        Ok(None) => {
            return AuthError::access_denied("access token not accepted by token service")
                .into_response();
        }
        Err(err) => {
            tracing::warn!(error = %err, "access token validation failed");
            return AuthError::from(err).into_response();
        }
    };

    // middleware → extractor への受け渡し
    context::fill(req.extensions_mut(), &validated);

    next.run(req).await
}
