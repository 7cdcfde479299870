/*
 * Responsibility
 * - GET /api/v1/me: echo the identity resolved by authorize()
 */
use axum::http::StatusCode;

use crate::api::v1::dto::identity::IdentityResponse;
use crate::error::AppError;
use crate::middleware::{Action, action};

pub fn me() -> impl Action {
    action(|ctx| {
        Box::pin(async move {
            let body = ctx
                .identity()
                .map(IdentityResponse::from)
                .ok_or(AppError::Unauthorized)?;
            ctx.finish(StatusCode::OK, Some(&body))
        })
    })
}
