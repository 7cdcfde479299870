/*
 * Responsibility
 * - v1 URL structure
 * - every route runs through the dispatcher; authorize() wraps the protected ones
 */
use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::api::v1::handlers::{admin, me, session};
use crate::middleware::authorize;
use crate::state::AppState;

pub const ADMIN_ROLE: &str = "admin";

pub fn routes(state: &AppState) -> Router<AppState> {
    let auth = &state.auth;
    let dispatcher = &state.dispatcher;

    Router::new()
        .route(
            "/me",
            get(dispatcher.handle(authorize(auth.clone(), me::me(), &[]))),
        )
        .route(
            "/admin/ping",
            get(dispatcher.handle(authorize(auth.clone(), admin::ping(), &[ADMIN_ROLE]))),
        )
        .route(
            "/admin/service-tokens",
            post(dispatcher.handle(authorize(
                auth.clone(),
                admin::IssueServiceToken::new(auth.clone()),
                &[ADMIN_ROLE],
            ))),
        )
        .route(
            "/session/refresh",
            post(dispatcher.handle(session::Refresh::new(auth.clone()))),
        )
        .route(
            "/session",
            delete(dispatcher.handle(session::SignOut::new(auth.clone()))),
        )
}
