/*
 * Responsibility
 * - 環境変数や設定の読み込み (PORT, CORS 許可、トークンサービス、refresh cookie など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use url::Url;

use crate::middleware::auth::{AuthSettings, RefreshCookieSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()))
    }

    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    // Remote token service (refresh / validate)
    pub token_service_url: Url,
    pub token_service_client_id: String,
    pub token_service_timeout_seconds: u64,

    pub refresh_cookie_prefix: String,
    // None: session cookie
    pub refresh_cookie_max_age_seconds: Option<i64>,
    pub trust_forwarded_proto: bool,

    // Global HTTP limits (middleware::http)
    pub request_timeout_seconds: u64,
    pub request_body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let cors_allowed_origins = parse_csv(&std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default());

        let token_service_url: Url = std::env::var("TOKEN_SERVICE_URL")
            .map_err(|_| ConfigError::Missing("TOKEN_SERVICE_URL"))?
            .parse()
            .map_err(|_| ConfigError::Invalid("TOKEN_SERVICE_URL"))?;

        let token_service_client_id = std::env::var("TOKEN_SERVICE_CLIENT_ID")
            .map_err(|_| ConfigError::Missing("TOKEN_SERVICE_CLIENT_ID"))?;

        let token_service_timeout_seconds = std::env::var("TOKEN_SERVICE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(10);

        let refresh_cookie_prefix = std::env::var("REFRESH_COOKIE_PREFIX")
            .unwrap_or_else(|_| "REFRESH_TOKEN_".to_string());
        if !is_cookie_name(&refresh_cookie_prefix) {
            return Err(ConfigError::Invalid("REFRESH_COOKIE_PREFIX"));
        }

        let refresh_cookie_max_age_seconds = match std::env::var("REFRESH_COOKIE_MAX_AGE_SECONDS") {
            Ok(v) => Some(
                v.parse::<i64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or(ConfigError::Invalid("REFRESH_COOKIE_MAX_AGE_SECONDS"))?,
            ),
            Err(_) => None,
        };

        let trust_forwarded_proto = match std::env::var("TRUST_FORWARDED_PROTO") {
            Ok(v) => parse_bool(&v).ok_or(ConfigError::Invalid("TRUST_FORWARDED_PROTO"))?,
            Err(_) => true,
        };

        let request_timeout_seconds = std::env::var("REQUEST_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);
        check_timeouts(request_timeout_seconds, token_service_timeout_seconds)?;

        let request_body_limit_bytes = std::env::var("REQUEST_BODY_LIMIT_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1024 * 1024);

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            token_service_url,
            token_service_client_id,
            token_service_timeout_seconds,
            refresh_cookie_prefix,
            refresh_cookie_max_age_seconds,
            trust_forwarded_proto,
            request_timeout_seconds,
            request_body_limit_bytes,
        })
    }

    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            refresh_cookie: RefreshCookieSettings {
                prefix: self.refresh_cookie_prefix.clone(),
                max_age: self
                    .refresh_cookie_max_age_seconds
                    .map(time::Duration::seconds),
            },
            trust_forwarded_proto: self.trust_forwarded_proto,
        }
    }
}

// A token-service call must be able to fail (401) before the request as a whole times out (408).
fn check_timeouts(request_timeout_seconds: u64, token_service_timeout_seconds: u64) -> Result<(), ConfigError> {
    if request_timeout_seconds <= token_service_timeout_seconds {
        return Err(ConfigError::Invalid("REQUEST_TIMEOUT_SECONDS"));
    }
    Ok(())
}

fn parse_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

// RFC 6265 token characters.
fn is_cookie_name(value: &str) -> bool {
    !value.is_empty()
        && value.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}
