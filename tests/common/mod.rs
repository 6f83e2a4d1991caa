#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, Response, header},
    routing::get,
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use sandbox_auth::middleware::auth::{self, AuthSettings, SecurityContext};
use sandbox_auth::services::auth::{BearerToken, TokenService, TokenServiceError};
use sandbox_auth::state::AppState;
use serde_json::{Value, json};

const SIGNING_SECRET: &[u8] = b"test-signing-secret";

/// Sign an access token with the given claims.
pub fn sign(claims: Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SIGNING_SECRET),
    )
    .expect("Failed to sign token")
}

pub fn new_jti() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Access token for `jti` expiring `exp_offset` seconds from now (negative: already expired).
pub fn access_token(jti: &str, exp_offset: i64) -> String {
    sign(json!({
        "jti": jti,
        "sub": "customer-1",
        "role": "CUSTOMER",
        "exp": Utc::now().timestamp() + exp_offset,
    }))
}

pub fn expired_access_token(jti: &str) -> String {
    access_token(jti, -60)
}

pub fn valid_access_token(jti: &str) -> String {
    access_token(jti, 3600)
}

/// In-memory token service.
///
/// Refresh tokens are single use: the first exchange removes them.
#[derive(Default)]
pub struct StubTokenService {
    refresh: Mutex<HashMap<String, (String, String)>>,
    valid: Mutex<HashSet<String>>,
    unavailable: AtomicBool,
    pub refresh_calls: AtomicUsize,
    pub validate_calls: AtomicUsize,
}

impl StubTokenService {
    /// Register `refresh_token`, exchangeable once for `(access, refresh)`.
    /// The issued access token is accepted by `validate`.
    pub fn issue(&self, refresh_token: &str, access: &str, refresh: &str) {
        self.refresh
            .lock()
            .unwrap()
            .insert(refresh_token.to_string(), (access.to_string(), refresh.to_string()));
        self.accept(access);
    }

    pub fn accept(&self, access_token: &str) {
        self.valid.lock().unwrap().insert(access_token.to_string());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenService for StubTokenService {
    async fn refresh_token(&self, refresh_token: &str) -> Result<BearerToken, TokenServiceError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TokenServiceError::InvalidResponse("service unavailable".into()));
        }

        let issued = self.refresh.lock().unwrap().remove(refresh_token);
        match issued {
            Some((access, refresh)) => Ok(BearerToken::from_pair(access, refresh)?),
            None => Err(TokenServiceError::Rejected {
                operation: "refresh",
                status: 401,
                detail: "invalid refresh token".into(),
            }),
        }
    }

    async fn validate(&self, access_token: &str) -> Result<Option<BearerToken>, TokenServiceError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TokenServiceError::InvalidResponse("service unavailable".into()));
        }

        if !self.valid.lock().unwrap().contains(access_token) {
            return Ok(None);
        }
        Ok(Some(BearerToken::from_pair(access_token, "")?))
    }
}

pub struct TestApp {
    pub router: Router,
    pub service: Arc<StubTokenService>,
    pub hits: Arc<AtomicUsize>,
}

/// `/echo` behind both auth middlewares.
///
/// The handler answers with the `Authorization` header it received and the
/// principal of the security context, if any.
pub fn echo_app(settings: AuthSettings) -> TestApp {
    let service = Arc::new(StubTokenService::default());
    let hits = Arc::new(AtomicUsize::new(0));
    let state = AppState::new(service.clone(), settings);

    let counter = hits.clone();
    let routes = Router::<AppState>::new().route(
        "/echo",
        get(move |req: Request<Body>| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let authorization = req
                    .headers()
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let subject = req
                    .extensions()
                    .get::<SecurityContext>()
                    .and_then(|ctx| ctx.principal.subject.clone());
                axum::Json(json!({ "authorization": authorization, "subject": subject }))
            }
        }),
    );

    let router = auth::apply(routes, state.clone()).with_state(state);
    TestApp {
        router,
        service,
        hits,
    }
}

pub fn default_echo_app() -> TestApp {
    echo_app(AuthSettings::default())
}

impl TestApp {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub fn get_request(uri: &str, token: Option<&str>, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn set_cookies<B>(response: &Response<B>) -> Vec<String> {
    set_cookie_values(response.headers())
}

pub fn set_cookie_values(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}
