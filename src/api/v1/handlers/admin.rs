/*
 * Responsibility
 * - admin-only actions (wrapped with authorize(.., &["admin"]) in routes)
 * - GET ping, POST service tokens (long-lived access tokens for non-interactive callers)
 */
use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;
use tracing::info;

use crate::api::v1::dto::identity::{ServiceTokenRequest, ServiceTokenResponse};
use crate::error::AppError;
use crate::middleware::{Action, BoxFuture, RequestContext, action};
use crate::services::auth::AuthService;

pub fn ping() -> impl Action {
    action(|ctx| Box::pin(async move { ctx.finish(StatusCode::OK, Some(&json!({"status": "ok"}))) }))
}

pub struct IssueServiceToken {
    auth: Arc<AuthService>,
}

impl IssueServiceToken {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}

impl Action for IssueServiceToken {
    fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            let req: ServiceTokenRequest = ctx.decode_model().await?;
            req.validate().map_err(AppError::validation)?;

            let identity = req.into_identity();
            let access_token = self.auth.issuer().issue_access_token(&identity, true)?;
            let expires_at = self.auth.issuer().decode_access(&access_token)?.claims.exp();

            info!(
                subject = %identity.id,
                issued_by = ?ctx.identity().map(|caller| caller.id),
                "service token issued"
            );

            ctx.finish(
                StatusCode::CREATED,
                Some(&ServiceTokenResponse {
                    access_token,
                    expires_at,
                }),
            )
        })
    }
}
