/*
 * Responsibility
 * - 認証済みリクエストのコンテキスト (SecurityContext) の型
 * - middleware が request extensions に格納し、handler は extractor 経由で受け取る
 * - グローバル/スレッドローカルな状態は持たない (リクエスト単位の値)
 */
use std::collections::BTreeSet;

use axum::http::Extensions;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::services::auth::{AccessClaims, BearerToken, Role};

/// Which component established the context.
///
/// Only contexts this middleware built for the request's current bearer token count
/// as authenticated; anything else is re-established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextOrigin {
    TokenMiddleware,
    Foreign,
}

/// Authenticated principal of the current request.
#[derive(Debug, Clone)]
pub struct SecurityContext {
    pub principal: AccessClaims,
    pub authorities: BTreeSet<String>,
    origin: ContextOrigin,
}

impl SecurityContext {
    pub(crate) fn from_token(token: &BearerToken) -> Self {
        Self {
            principal: token.claims.clone(),
            authorities: token.claims.authorities(),
            origin: ContextOrigin::TokenMiddleware,
        }
    }

    /// Context established outside the token middleware (another layer, a test).
    pub fn foreign(principal: AccessClaims) -> Self {
        Self {
            authorities: principal.authorities(),
            principal,
            origin: ContextOrigin::Foreign,
        }
    }

    pub fn origin(&self) -> ContextOrigin {
        self.origin
    }

    pub fn summary(&self) -> PrincipalSummary {
        PrincipalSummary {
            unique_id: self.principal.unique_id.clone(),
            subject: self.principal.subject.clone(),
            role: self.principal.role,
            authorities: self.authorities.iter().cloned().collect(),
            expires_at: self.principal.expiration,
        }
    }
}

/// JSON view of the principal for handlers.
#[derive(Debug, Clone, Serialize)]
pub struct PrincipalSummary {
    pub unique_id: Option<String>,
    pub subject: Option<String>,
    pub role: Option<Role>,
    pub authorities: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Install the context derived from `token`, replacing any previous one.
pub fn fill(extensions: &mut Extensions, token: &BearerToken) {
    extensions.insert(SecurityContext::from_token(token));
}

/// Stop vouching for the current context, e.g. once the bearer token was swapped.
pub fn disown(extensions: &mut Extensions) {
    if let Some(ctx) = extensions.get_mut::<SecurityContext>() {
        ctx.origin = ContextOrigin::Foreign;
    }
}

/// True unless this middleware already authenticated the request.
pub fn authentication_required(extensions: &Extensions) -> bool {
    !matches!(
        extensions.get::<SecurityContext>(),
        Some(ctx) if ctx.origin == ContextOrigin::TokenMiddleware
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(role: Option<Role>) -> BearerToken {
        BearerToken {
            access_token: "a.b.c".into(),
            refresh_token: "r".into(),
            claims: AccessClaims {
                unique_id: Some("jti-1".into()),
                expiration: None,
                role,
                subject: Some("alice".into()),
            },
        }
    }

    #[test]
    fn empty_extensions_require_authentication() {
        assert!(authentication_required(&Extensions::new()));
    }

    #[test]
    fn filled_context_is_recognised() {
        let mut ext = Extensions::new();
        fill(&mut ext, &token(Some(Role::Customer)));
        assert!(!authentication_required(&ext));

        let ctx = ext.get::<SecurityContext>().unwrap();
        assert_eq!(ctx.principal.subject.as_deref(), Some("alice"));
        assert_eq!(ctx.origin(), ContextOrigin::TokenMiddleware);
        assert!(ctx.authorities.contains("ROLE_CUSTOMER"));
        assert_eq!(ctx.authorities.len(), 1);
    }

    #[test]
    fn no_role_means_no_authorities() {
        let mut ext = Extensions::new();
        fill(&mut ext, &token(None));
        assert!(ext.get::<SecurityContext>().unwrap().authorities.is_empty());
    }

    #[test]
    fn foreign_context_requires_authentication() {
        let mut ext = Extensions::new();
        ext.insert(SecurityContext::foreign(token(Some(Role::Staff)).claims));
        assert!(authentication_required(&ext));
        assert!(ext.get::<SecurityContext>().unwrap().authorities.contains("ROLE_STAFF"));
    }

    #[test]
    fn disowned_context_requires_authentication() {
        let mut ext = Extensions::new();
        fill(&mut ext, &token(Some(Role::Customer)));
        disown(&mut ext);
        assert!(authentication_required(&ext));
        assert_eq!(ext.get::<SecurityContext>().unwrap().origin(), ContextOrigin::Foreign);

        // Nothing to disown.
        let mut empty = Extensions::new();
        disown(&mut empty);
        assert!(empty.get::<SecurityContext>().is_none());
    }
}
