//! Factory: build the auth services from application `Config`.
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::config::Config;
use crate::repos::PgIdentityRepo;
use crate::repos::error::RepoError;
use crate::services::auth::identity::{IdentityLookup, InMemoryIdentityStore, LookupError};
use crate::services::auth::jwt::TokenCodec;
use crate::services::auth::session::{AuthService, CookiePolicy};
use crate::services::auth::token_issuer::SessionIssuer;

pub fn build_session_issuer(config: &Config) -> SessionIssuer {
    SessionIssuer::new(
        TokenCodec::new(&config.access.signing),
        config.access.max_age_seconds,
        TokenCodec::new(&config.refresh.signing),
        config.refresh.max_age_seconds,
    )
}

pub fn cookie_policy(config: &Config) -> CookiePolicy {
    CookiePolicy {
        access_http_only: config.access.http_only,
        refresh_http_only: config.refresh.http_only,
        refresh_secure: config.refresh.secure,
        refresh_path: config.refresh.path.clone(),
    }
}

pub fn build_auth_service(config: &Config, identities: Arc<dyn IdentityLookup>) -> Arc<AuthService> {
    Arc::new(AuthService::new(
        build_session_issuer(config),
        identities,
        cookie_policy(config),
    ))
}

/// Pick the identity backend: Postgres when `DATABASE_URL` is set, else the in-memory
/// store (seeded from `IDENTITY_SEED_FILE` when present).
pub fn build_identity_lookup(config: &Config) -> Result<Arc<dyn IdentityLookup>, LookupError> {
    if let Some(url) = &config.database_url {
        // Lazy: the first refresh opens the connection, so boot does not need the database.
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(url)
            .map_err(RepoError::from)?;
        info!("identity lookup: postgres");
        return Ok(Arc::new(PgIdentityRepo::new(pool)));
    }

    if let Some(path) = &config.identity_seed_file {
        let store = InMemoryIdentityStore::from_seed_file(path)?;
        info!(path = %path.display(), "identity lookup: in-memory (seeded)");
        return Ok(Arc::new(store));
    }

    warn!("identity lookup: empty in-memory store; every refresh will be refused");
    Ok(Arc::new(InMemoryIdentityStore::new()))
}
