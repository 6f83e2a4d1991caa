/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - 認証 middleware (refresh → access) は app 側で v1 全体に掛ける
 */
use axum::{Router, routing::get};

use crate::api::v1::handlers::{health::health, me::me};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/me", get(me))
}
