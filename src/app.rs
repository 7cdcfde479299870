/*
 * Responsibility
 * - tracing + panic hook setup
 * - Config -> services -> Router
 * - axum::serve() with peer addresses (for the access log)
 */
use std::net::SocketAddr;

use axum::{Router, routing::get};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::v1::handlers::health::health;
use crate::config::Config;
use crate::middleware::{self, Dispatcher, dispatcher};
use crate::services::auth::{build_auth_service, build_identity_lookup};
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,session_gate=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub async fn run() -> anyhow::Result<()> {
    init_tracing();
    dispatcher::install_panic_hook();

    let config = Config::from_env()?;

    info!(
        "starting session gate in {:?} mode on {}",
        config.app_env, config.addr
    );

    let state = build_state(&config)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

pub fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let identities = build_identity_lookup(config)?;
    let auth = build_auth_service(config, identities);

    info!(
        access_algorithm = %config.access.signing.algorithm(),
        refresh_algorithm = %config.refresh.signing.algorithm(),
        identities = auth.identities().backend_name(),
        "auth service ready"
    );

    Ok(AppState::new(auth, Dispatcher::new(config.max_body_bytes)))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::v1::routes(&state))
        .with_state(state);

    middleware::http::apply(router, config.max_body_bytes, config.request_timeout)
}
