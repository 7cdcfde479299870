//! Access-token verification wrapped around an action.
//!
//! `authorize(auth, inner, roles)` returns an action that
//! - reads the access token (cookie `access_token`, else header `Authorization`)
//! - verifies it; an expired token triggers a silent refresh from the refresh token
//! - checks the caller's roles (any single match is enough)
//! - stores the identity in the context and runs `inner`

use std::{collections::BTreeSet, sync::Arc};

use anyhow::anyhow;
use axum::http::header;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::middleware::action::{Action, BoxFuture};
use crate::middleware::context::RequestContext;
use crate::services::auth::cookie::{ACCESS_TOKEN_NAME, REFRESH_TOKEN_NAME};
use crate::services::auth::identity::Identity;
use crate::services::auth::session::AuthService;

pub struct Authorize<A> {
    inner: A,
    auth: Arc<AuthService>,
    required_roles: Vec<String>,
}

/// Gate `inner` behind a valid access token and, if `required_roles` is non-empty,
/// at least one of those roles.
pub fn authorize<A: Action>(
    auth: Arc<AuthService>,
    inner: A,
    required_roles: &[&str],
) -> Authorize<A> {
    Authorize {
        inner,
        auth,
        required_roles: required_roles.iter().map(|r| r.to_string()).collect(),
    }
}

impl<A: Action> Action for Authorize<A> {
    fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            let roles = self.authenticate(ctx).await?;

            if !roles_permit(&roles, &self.required_roles) {
                debug!(
                    required = ?self.required_roles,
                    granted = ?roles,
                    "role check failed"
                );
                return Err(AppError::Forbidden);
            }

            self.inner.call(ctx).await
        })
    }
}

impl<A> Authorize<A> {
    /// Resolve the caller's role set, refreshing the access token when it has expired.
    async fn authenticate(&self, ctx: &mut RequestContext) -> Result<BTreeSet<String>, AppError> {
        let token = access_token_from(ctx).ok_or(AppError::Unauthorized)?;

        let decoded = match self.auth.issuer().decode_access(&token) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(error = %err, "access token rejected");
                return Err(AppError::Unauthorized);
            }
        };

        if decoded.valid {
            let identity = Identity::from(decoded.claims);
            let roles = identity.roles.clone();
            ctx.set_identity(identity);
            return Ok(roles);
        }

        debug!(subject = %decoded.claims.subject(), "access token expired, refreshing");
        refresh_or_unauthorized(&self.auth, ctx).await
    }
}

/// `true` when no role is required or the caller holds at least one of them.
pub fn roles_permit(granted: &BTreeSet<String>, required: &[String]) -> bool {
    required.is_empty() || required.iter().any(|role| granted.contains(role))
}

/// Access token from the cookie, falling back to the `Authorization` header.
pub fn access_token_from(ctx: &RequestContext) -> Option<String> {
    if let Some(token) = ctx.cookie(ACCESS_TOKEN_NAME) {
        return Some(token.to_owned());
    }

    let value = ctx.header(header::AUTHORIZATION.as_str())?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then(|| token.to_owned())
}

/// Run the refresh flow, reducing every failure to `Unauthorized`.
pub async fn refresh_or_unauthorized(
    auth: &AuthService,
    ctx: &mut RequestContext,
) -> Result<BTreeSet<String>, AppError> {
    match refresh_session(auth, ctx).await {
        Ok(roles) => Ok(roles),
        Err(AppError::Unauthorized) => Err(AppError::Unauthorized),
        Err(err) => {
            warn!(error = ?err, "session refresh failed");
            Err(AppError::Unauthorized)
        }
    }
}

/// Mint a new access token from the refresh token.
///
/// On success the new `access_token` cookie is set, the context identity is replaced by
/// the subject's current identity and its role set is returned.
pub async fn refresh_session(
    auth: &AuthService,
    ctx: &mut RequestContext,
) -> Result<BTreeSet<String>, AppError> {
    let token = ctx
        .cookie(REFRESH_TOKEN_NAME)
        .or_else(|| ctx.header(REFRESH_TOKEN_NAME))
        .map(str::to_owned)
        .ok_or_else(|| AppError::Internal(anyhow!("refresh token not in cookie or header")))?;

    let decoded = auth.issuer().decode_refresh(&token)?;
    if !decoded.valid {
        debug!(subject = %decoded.claims.subject(), "refresh token expired");
        return Err(AppError::Unauthorized);
    }

    let subject = decoded.claims.subject();
    let identity = auth
        .identities()
        .lookup_identity(subject)
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("identity lookup failed")))?
        .ok_or_else(|| {
            warn!(%subject, "refresh token subject not found");
            AppError::Unauthorized
        })?;

    let access_token = auth.issuer().issue_access_token(&identity, false)?;
    ctx.set_cookie(&auth.access_cookie(access_token))?;

    info!(%subject, roles = ?identity.roles, "access token refreshed");

    let roles = identity.roles.clone();
    ctx.set_identity(identity);
    Ok(roles)
}
