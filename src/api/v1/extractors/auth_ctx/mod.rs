/*!
 * Authentication context extractor
 *
 * Responsibility:
 * - 認証済みリクエストのコンテキスト（SecurityContext）を handler に提供する
 * - 型定義は middleware::auth::context 側にある
 */

mod core;

pub use core::Authenticated;
