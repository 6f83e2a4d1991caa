//! HTTP-level middleware for the gateway.
//!
//! - `x-request-id` generated when absent and echoed on the response
//! - request tracing, with credentials redacted (`Authorization`, `Cookie`,
//!   `Set-Cookie`, `access-token`)
//! - body limit and global timeout from `Config`
//!
//! The global timeout is kept above `TOKEN_SERVICE_TIMEOUT_SECONDS` (see `Config`):
//! a hanging token service fails the refresh with 401 before the request would end in 408.

use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::http::{HeaderName, StatusCode, header};
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::sensitive_headers::{
    SetSensitiveRequestHeadersLayer, SetSensitiveResponseHeadersLayer,
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::Config;
use crate::middleware::auth::ACCESS_TOKEN_HEADER;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Limits applied to every request.
#[derive(Debug, Clone, Copy)]
pub struct HttpLimits {
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,
}

impl HttpLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            request_timeout: Duration::from_secs(config.request_timeout_seconds),
            body_limit_bytes: config.request_body_limit_bytes,
        }
    }
}

pub fn apply(router: Router, config: &Config) -> Router {
    with_limits(router, HttpLimits::from_config(config))
}

pub fn with_limits(router: Router, limits: HttpLimits) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let layers = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|err: BoxError| async move {
            if err.is::<tower::timeout::error::Elapsed>() {
                tracing::warn!("request timed out");
                StatusCode::REQUEST_TIMEOUT
            } else {
                tracing::error!(error = %err, "unhandled middleware error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }))
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        .layer(PropagateRequestIdLayer::new(request_id))
        .layer(SetSensitiveRequestHeadersLayer::new([
            header::AUTHORIZATION,
            header::COOKIE,
        ]))
        .layer(RequestBodyLimitLayer::new(limits.body_limit_bytes))
        .layer(TimeoutLayer::new(limits.request_timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Inside the trace layer so the logged response already carries the marks.
        .layer(SetSensitiveResponseHeadersLayer::new([
            header::SET_COOKIE,
            HeaderName::from_static(ACCESS_TOKEN_HEADER),
        ]));

    router.layer(layers)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{HeaderValue, Request};
    use axum::routing::{get, post};
    use tower::ServiceExt;

    fn limits(timeout_ms: u64, body_limit_bytes: usize) -> HttpLimits {
        HttpLimits {
            request_timeout: Duration::from_millis(timeout_ms),
            body_limit_bytes,
        }
    }

    #[tokio::test]
    async fn slow_handler_times_out() {
        let router = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let app = with_limits(router, limits(50, 1024));

        let response = app
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let router = Router::new().route("/upload", post(|body: String| async move { body.len().to_string() }));
        let app = with_limits(router, limits(1000, 8));

        let response = app
            .oneshot(
                Request::post("/upload")
                    .header(header::CONTENT_LENGTH, "32")
                    .body(Body::from("x".repeat(32)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn request_id_is_kept_or_generated() {
        let router = Router::new().route("/", get(|| async { "ok" }));
        let app = with_limits(router, limits(1000, 1024));

        let response = app
            .clone()
            .oneshot(
                Request::get("/")
                    .header(REQUEST_ID_HEADER, "req-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER),
            Some(&HeaderValue::from_static("req-1"))
        );

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn credentials_are_marked_sensitive() {
        let router = Router::new().route(
            "/",
            get(|req: Request<Body>| async move {
                let sensitive = req
                    .headers()
                    .get(header::AUTHORIZATION)
                    .is_some_and(HeaderValue::is_sensitive);
                (
                    [(header::SET_COOKIE, "a=b")],
                    if sensitive { "sensitive" } else { "plain" },
                )
            }),
        );
        let app = with_limits(router, limits(1000, 1024));

        let response = app
            .oneshot(
                Request::get("/")
                    .header(header::AUTHORIZATION, "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(
            response
                .headers()
                .get(header::SET_COOKIE)
                .is_some_and(HeaderValue::is_sensitive)
        );
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"sensitive");
    }
}
