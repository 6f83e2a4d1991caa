use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::middleware::auth::SecurityContext;

/// Handler で SecurityContext を受け取るための extractor
/// middleware が request.extensions() に insert 済みである前提
/// 見つからない場合は 401 を返す（トークン無し・ミドルウェア未設定）
pub struct Authenticated(pub SecurityContext);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .map(Authenticated)
            .ok_or(AppError::Unauthorized)
    }
}
