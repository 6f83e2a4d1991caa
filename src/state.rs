/*
 * Responsibility
 * - Router / middleware に紐づける共有コンテキスト (AppState)
 *   - token_service: リモートのトークンサービス
 *   - auth: cookie 名の prefix などの認証設定
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 * - リクエスト間で共有する可変状態は持たない
 */
use std::sync::Arc;

use crate::middleware::auth::AuthSettings;
use crate::services::auth::TokenService;

#[derive(Clone)]
pub struct AppState {
    pub token_service: Arc<dyn TokenService>,
    pub auth: AuthSettings,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(token_service: Arc<dyn TokenService>, auth: AuthSettings) -> Self {
        Self {
            token_service,
            auth,
        }
    }
}
