/*
 * Responsibility
 * - GET /me: 認証済み principal を返す
 * - SecurityContext が無ければ extractor が 401 を返す
 */
use axum::Json;

use crate::api::v1::extractors::Authenticated;
use crate::middleware::auth::PrincipalSummary;

pub async fn me(Authenticated(ctx): Authenticated) -> Json<PrincipalSummary> {
    Json(ctx.summary())
}
