//! Authentication/session layer for the banking sandbox REST API.
//!
//! Two axum middlewares sit in front of the API:
//! - [`middleware::auth::refresh`] refreshes an expired access token with the
//!   refresh cookie bound to its `jti`, rotating that cookie;
//! - [`middleware::auth::access`] validates the bearer token at the token service and
//!   puts a [`middleware::auth::SecurityContext`] into the request extensions.
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
