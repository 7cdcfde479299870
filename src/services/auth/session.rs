use std::sync::Arc;

use crate::error::AppError;
use crate::middleware::context::RequestContext;
use crate::services::auth::cookie::{ACCESS_TOKEN_NAME, REFRESH_TOKEN_NAME, SetCookie};
use crate::services::auth::identity::IdentityLookup;
use crate::services::auth::token_issuer::SessionIssuer;

/// Flags applied to the token cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    pub access_http_only: bool,
    pub refresh_http_only: bool,
    pub refresh_secure: bool,
    pub refresh_path: String,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            access_http_only: true,
            refresh_http_only: true,
            refresh_secure: false,
            refresh_path: "/".to_string(),
        }
    }
}

/// Process-wide authorization service shared by every request.
///
/// Immutable after construction; cloned behind `Arc` into handlers.
pub struct AuthService {
    issuer: SessionIssuer,
    identities: Arc<dyn IdentityLookup>,
    cookies: CookiePolicy,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("issuer", &self.issuer)
            .field("identities", &self.identities.backend_name())
            .field("cookies", &self.cookies)
            .finish()
    }
}

impl AuthService {
    pub fn new(
        issuer: SessionIssuer,
        identities: Arc<dyn IdentityLookup>,
        cookies: CookiePolicy,
    ) -> Self {
        Self {
            issuer,
            identities,
            cookies,
        }
    }

    pub fn issuer(&self) -> &SessionIssuer {
        &self.issuer
    }

    pub fn identities(&self) -> &dyn IdentityLookup {
        self.identities.as_ref()
    }

    pub fn access_cookie(&self, token: impl Into<String>) -> SetCookie {
        SetCookie::new(ACCESS_TOKEN_NAME, token, self.issuer.access_max_age())
            .path("/")
            .http_only(self.cookies.access_http_only)
    }

    pub fn refresh_cookie(&self, token: impl Into<String>) -> SetCookie {
        SetCookie::new(REFRESH_TOKEN_NAME, token, self.issuer.refresh_max_age())
            .path(self.cookies.refresh_path.clone())
            .secure(self.cookies.refresh_secure)
            .http_only(self.cookies.refresh_http_only)
    }

    /// Tell the client to drop both token cookies.
    pub fn end_session(&self, ctx: &mut RequestContext) -> Result<(), AppError> {
        ctx.set_cookie(&SetCookie::expired(ACCESS_TOKEN_NAME).path("/"))?;
        ctx.set_cookie(
            &SetCookie::expired(REFRESH_TOKEN_NAME).path(self.cookies.refresh_path.clone()),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::identity::InMemoryIdentityStore;
    use crate::services::auth::jwt::{SigningAlgorithm, SigningConfig, TokenCodec};
    use axum::{body::Body, extract::Request, http::header};

    fn service(cookies: CookiePolicy) -> AuthService {
        let issuer = SessionIssuer::new(
            TokenCodec::new(&SigningConfig::new("access-secret", SigningAlgorithm::Hs256)),
            120,
            TokenCodec::new(&SigningConfig::new("refresh-secret", SigningAlgorithm::Hs256)),
            7_200,
        );
        AuthService::new(issuer, Arc::new(InMemoryIdentityStore::new()), cookies)
    }

    fn set_cookies(ctx: &RequestContext) -> Vec<String> {
        ctx.response()
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn cookies_follow_policy() {
        let auth = service(CookiePolicy {
            access_http_only: false,
            refresh_http_only: true,
            refresh_secure: true,
            refresh_path: "/api/v1/session".to_string(),
        });

        assert_eq!(
            auth.access_cookie("a").to_string(),
            "access_token=a; Max-Age=120; Path=/"
        );
        assert_eq!(
            auth.refresh_cookie("r").to_string(),
            "refresh_token=r; Max-Age=7200; Path=/api/v1/session; Secure; HttpOnly"
        );
    }

    #[test]
    fn end_session_expires_cookies() {
        let auth = service(CookiePolicy::default());
        let mut ctx = RequestContext::new(Request::new(Body::empty()), None, 1024);

        auth.end_session(&mut ctx).unwrap();

        assert_eq!(
            set_cookies(&ctx),
            ["access_token=; Max-Age=0; Path=/", "refresh_token=; Max-Age=0; Path=/"]
        );
    }
}
