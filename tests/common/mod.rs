#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::Request,
    http::{Method, header},
    response::Response,
};
use chrono::{Duration, Utc};
use session_gate::{
    app::build_router,
    config::Config,
    middleware::Dispatcher,
    services::auth::{
        Identity, InMemoryIdentityStore, build_auth_service,
        jwt::{Claims, TokenCodec},
    },
    state::AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const ACCESS_SECRET: &str = "test-access-secret";
pub const REFRESH_SECRET: &str = "test-refresh-secret";

pub fn config() -> Config {
    let vars = HashMap::from([
        ("JWT_SECRET", ACCESS_SECRET),
        ("JWT_ALGORITHM", "HS256"),
        ("JWT_MAX_AGE_SECONDS", "60"),
        ("REFRESH_TOKEN_SECRET", REFRESH_SECRET),
        ("REFRESH_TOKEN_ALGORITHM", "HS512"),
        ("REFRESH_TOKEN_MAX_AGE_SECONDS", "3600"),
        ("MAX_BODY_BYTES", "4096"),
    ]);
    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap()
}

pub fn identity(roles: &[&str]) -> Identity {
    Identity::new(Uuid::new_v4(), "Test", "User", roles.iter().copied())
}

pub struct TestApp {
    pub config: Config,
    pub state: AppState,
    pub store: Arc<InMemoryIdentityStore>,
    pub router: Router,
}

impl TestApp {
    pub fn new(identities: impl IntoIterator<Item = Identity>) -> Self {
        let config = config();
        let store = Arc::new(InMemoryIdentityStore::with_identities(identities));
        let auth = build_auth_service(&config, store.clone());
        let state = AppState::new(auth, Dispatcher::new(config.max_body_bytes));
        let router = build_router(state.clone(), &config);

        Self {
            config,
            state,
            store,
            router,
        }
    }

    pub async fn send(&self, request: Request) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub fn access_token(&self, identity: &Identity) -> String {
        self.state
            .auth
            .issuer()
            .issue_access_token(identity, false)
            .unwrap()
    }

    pub fn refresh_token(&self, id: Uuid) -> String {
        self.state.auth.issuer().issue_refresh_token(id).unwrap()
    }

    /// Access token with a good signature that expired a minute ago.
    pub fn expired_access_token(&self, identity: &Identity) -> String {
        TokenCodec::new(&self.config.access.signing)
            .encode(&Claims::access(identity, Utc::now() - Duration::seconds(60)))
            .unwrap()
    }

    pub fn expired_refresh_token(&self, id: Uuid) -> String {
        TokenCodec::new(&self.config.refresh.signing)
            .encode(&Claims::refresh(id, Utc::now() - Duration::seconds(60)))
            .unwrap()
    }
}

pub fn request(method: Method, uri: &str, cookies: &[(&str, &str)]) -> Request {
    let mut builder = Request::builder().method(method).uri(uri);
    if !cookies.is_empty() {
        let cookie = cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn get(uri: &str, cookies: &[(&str, &str)]) -> Request {
    request(Method::GET, uri, cookies)
}

pub async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// Value of the named cookie in the response's `Set-Cookie` headers.
pub fn cookie_value(response: &Response, name: &str) -> Option<String> {
    set_cookies(response).into_iter().find_map(|cookie| {
        let (pair, _) = cookie.split_once(';').unwrap_or((cookie.as_str(), ""));
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
