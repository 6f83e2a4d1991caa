use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use super::token_service::{BearerToken, TokenService, TokenServiceError};

/// Token-service response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// `TokenService` over HTTP.
///
/// - refresh: `POST {base}/token/refresh` (form, `grant_type=refresh_token`)
/// - validate: `GET {base}/token/validate` with the access token as bearer
#[derive(Clone)]
pub struct HttpTokenService {
    http: reqwest::Client,
    refresh_url: Url,
    validate_url: Url,
    client_id: String,
}

impl std::fmt::Debug for HttpTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTokenService")
            .field("refresh_url", &self.refresh_url.as_str())
            .field("validate_url", &self.validate_url.as_str())
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl HttpTokenService {
    pub fn new(
        base_url: &Url,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TokenServiceError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_http_client(http, base_url, client_id)
    }

    /// Use a custom HTTP client (connection pool reuse, tests).
    pub fn with_http_client(
        http: reqwest::Client,
        base_url: &Url,
        client_id: impl Into<String>,
    ) -> Result<Self, TokenServiceError> {
        Ok(Self {
            http,
            refresh_url: endpoint(base_url, "token/refresh")?,
            validate_url: endpoint(base_url, "token/validate")?,
            client_id: client_id.into(),
        })
    }

    pub fn refresh_url(&self) -> &Url {
        &self.refresh_url
    }

    pub fn validate_url(&self) -> &Url {
        &self.validate_url
    }

    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, TokenServiceError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        Err(TokenServiceError::Rejected {
            operation,
            status,
            detail,
        })
    }
}

// Joins `path` under `base`, keeping any path prefix the base already has.
fn endpoint(base: &Url, path: &str) -> Result<Url, TokenServiceError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
        .map_err(|e| TokenServiceError::InvalidResponse(format!("endpoint {path}: {e}")))
}

#[async_trait]
impl TokenService for HttpTokenService {
    async fn refresh_token(&self, refresh_token: &str) -> Result<BearerToken, TokenServiceError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
        ];

        let response = self
            .http
            .post(self.refresh_url.clone())
            .form(&params)
            .send()
            .await?;

        let response = Self::ensure_success(response, "refresh").await?;
        let body: TokenResponse = response.json().await?;
        let refresh = body.refresh_token.ok_or_else(|| {
            TokenServiceError::InvalidResponse("refresh response without refresh_token".into())
        })?;

        Ok(BearerToken::from_pair(body.access_token, refresh)?)
    }

    async fn validate(&self, access_token: &str) -> Result<Option<BearerToken>, TokenServiceError> {
        let response = self
            .http
            .get(self.validate_url.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                return Ok(None);
            }
            _ => {}
        }

        let response = Self::ensure_success(response, "validate").await?;
        let body: TokenResponse = response.json().await?;
        let token = BearerToken::from_pair(body.access_token, body.refresh_token.unwrap_or_default())?;
        Ok(Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_keep_base_path() {
        let base: Url = "https://idp.example.com/auth/".parse().unwrap();
        let svc = HttpTokenService::new(&base, "sandbox", Duration::from_secs(5)).unwrap();
        assert_eq!(
            svc.refresh_url().as_str(),
            "https://idp.example.com/auth/token/refresh"
        );
        assert_eq!(
            svc.validate_url().as_str(),
            "https://idp.example.com/auth/token/validate"
        );
    }

    #[test]
    fn endpoints_without_trailing_slash() {
        let base: Url = "https://idp.example.com/auth".parse().unwrap();
        let svc = HttpTokenService::new(&base, "sandbox", Duration::from_secs(5)).unwrap();
        assert_eq!(
            svc.refresh_url().as_str(),
            "https://idp.example.com/auth/token/refresh"
        );
    }

    #[test]
    fn debug_omits_http_client() {
        let base: Url = "http://localhost:8080".parse().unwrap();
        let svc = HttpTokenService::new(&base, "sandbox", Duration::from_secs(5)).unwrap();
        let out = format!("{svc:?}");
        assert!(out.contains("http://localhost:8080/token/refresh"));
        assert!(out.contains("sandbox"));
    }
}
