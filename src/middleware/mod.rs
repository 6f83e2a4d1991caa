/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth: refresh / token 認証, cors, http (request-id, trace, timeout)
 */
pub mod auth;
pub mod cors;
pub mod http;
