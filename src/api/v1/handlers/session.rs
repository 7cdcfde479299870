/*
 * Responsibility
 * - POST /session/refresh: explicit refresh (no access token needed), 204 + new cookie
 * - DELETE /session: sign-out, expires both token cookies, 204
 */
use std::sync::Arc;

use axum::http::StatusCode;

use crate::error::AppError;
use crate::middleware::auth::access::refresh_or_unauthorized;
use crate::middleware::{Action, BoxFuture, RequestContext};
use crate::services::auth::AuthService;

pub struct Refresh {
    auth: Arc<AuthService>,
}

impl Refresh {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}

impl Action for Refresh {
    fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            refresh_or_unauthorized(&self.auth, ctx).await?;
            ctx.response_mut().write_header(StatusCode::NO_CONTENT);
            Ok(())
        })
    }
}

pub struct SignOut {
    auth: Arc<AuthService>,
}

impl SignOut {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}

impl Action for SignOut {
    fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            self.auth.end_session(ctx)?;
            ctx.response_mut().write_header(StatusCode::NO_CONTENT);
            Ok(())
        })
    }
}
