use axum::http::{HeaderMap, HeaderValue, header};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use time::Duration;

/// Refresh-cookie naming and lifetime.
#[derive(Debug, Clone)]
pub struct RefreshCookieSettings {
    pub prefix: String,
    /// `None`: session cookie (no Max-Age).
    pub max_age: Option<Duration>,
}

impl Default for RefreshCookieSettings {
    fn default() -> Self {
        Self {
            prefix: "REFRESH_TOKEN_".into(),
            max_age: None,
        }
    }
}

impl RefreshCookieSettings {
    /// Cookie name bound to the access token with this unique id.
    pub fn cookie_name(&self, unique_id: &str) -> String {
        format!("{}{}", self.prefix, unique_id)
    }
}

/// Look up the refresh token stored under `name` on the incoming request.
pub(crate) fn find_refresh_token(headers: &HeaderMap, name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Create the refresh cookie for a newly issued token pair.
pub(crate) fn refresh_cookie(
    settings: &RefreshCookieSettings,
    unique_id: &str,
    refresh_token: &str,
    secure: bool,
) -> Cookie<'static> {
    let mut builder = Cookie::build((settings.cookie_name(unique_id), refresh_token.to_string()))
        .http_only(true)
        .secure(secure)
        .path("/");
    if let Some(max_age) = settings.max_age {
        builder = builder.max_age(max_age);
    }
    builder.build()
}

/// Create the removal cookie for a consumed refresh token.
pub(crate) fn removal_cookie(name: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .http_only(true)
        .secure(secure)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// `Set-Cookie` values decided while handling a request.
///
/// Written to whatever response ends up leaving the middleware, including the
/// 401 when a failure is detected after the old cookie was already dropped.
#[derive(Debug, Default)]
pub(crate) struct PendingCookies {
    cookies: Vec<Cookie<'static>>,
}

impl PendingCookies {
    pub(crate) fn push(&mut self, cookie: Cookie<'static>) {
        self.cookies.push(cookie);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub(crate) fn write_to(self, headers: &mut HeaderMap) {
        for cookie in self.cookies {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    headers.append(header::SET_COOKIE, value);
                }
                Err(e) => {
                    tracing::warn!(cookie = %cookie.name(), error = %e, "dropping unencodable cookie");
                }
            }
        }
    }
}
