/*
 * Responsibility
 * - read settings from the environment (.env supported via dotenvy)
 * - validate them once at startup (missing or invalid values fail the boot)
 * - signing configs are built here and never change afterwards
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::auth::jwt::{SigningAlgorithm, SigningConfig};

const MIN_SECRET_BYTES: usize = 8;
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_ACCESS_MAX_AGE: u64 = 15 * 60;
const DEFAULT_REFRESH_MAX_AGE: u64 = 30 * 24 * 60 * 60;
/// Upper bound for token max-ages: expiry must stay a representable timestamp.
const MAX_TOKEN_AGE: u64 = 100 * 365 * 24 * 60 * 60;
const DEFAULT_MAX_BODY_BYTES: usize = 100 * 1024 * 1024;
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<&str>) -> Self {
        match value
            .unwrap_or("development")
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key, reason) => {
                write!(f, "invalid configuration: {}: {}", key, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Access token signing and cookie settings.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub signing: SigningConfig,
    pub max_age_seconds: u64,
    pub http_only: bool,
}

/// Refresh token signing and cookie settings.
#[derive(Debug, Clone)]
pub struct RefreshTokenSettings {
    pub signing: SigningConfig,
    pub max_age_seconds: u64,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub access: TokenSettings,
    pub refresh: RefreshTokenSettings,

    pub max_body_bytes: usize,
    pub request_timeout: Duration,

    pub database_url: Option<String>,
    pub identity_seed_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build and validate a config from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let app_env = AppEnv::parse(get("APP_ENV").as_deref());

        let access = TokenSettings {
            signing: signing_config(
                get("JWT_SECRET"),
                "JWT_SECRET",
                get("JWT_ALGORITHM"),
                "JWT_ALGORITHM",
            )?,
            max_age_seconds: token_max_age(
                get("JWT_MAX_AGE_SECONDS"),
                "JWT_MAX_AGE_SECONDS",
                DEFAULT_ACCESS_MAX_AGE,
            )?,
            http_only: parse_bool(get("JWT_HTTP_ONLY"), "JWT_HTTP_ONLY", true)?,
        };

        let refresh_path = get("REFRESH_TOKEN_PATH").unwrap_or_else(|| "/".to_string());
        if !refresh_path.starts_with('/') {
            return Err(ConfigError::Invalid(
                "REFRESH_TOKEN_PATH",
                "must start with '/'".to_string(),
            ));
        }

        let refresh = RefreshTokenSettings {
            signing: signing_config(
                get("REFRESH_TOKEN_SECRET"),
                "REFRESH_TOKEN_SECRET",
                get("REFRESH_TOKEN_ALGORITHM"),
                "REFRESH_TOKEN_ALGORITHM",
            )?,
            max_age_seconds: token_max_age(
                get("REFRESH_TOKEN_MAX_AGE_SECONDS"),
                "REFRESH_TOKEN_MAX_AGE_SECONDS",
                DEFAULT_REFRESH_MAX_AGE,
            )?,
            path: refresh_path,
            secure: parse_bool(
                get("REFRESH_TOKEN_SECURE"),
                "REFRESH_TOKEN_SECURE",
                app_env.is_production(),
            )?,
            http_only: parse_bool(
                get("REFRESH_TOKEN_HTTP_ONLY"),
                "REFRESH_TOKEN_HTTP_ONLY",
                true,
            )?,
        };

        let max_body_bytes = parse_or(
            get("MAX_BODY_BYTES"),
            "MAX_BODY_BYTES",
            DEFAULT_MAX_BODY_BYTES,
        )?;

        let request_timeout = Duration::from_secs(positive(
            get("REQUEST_TIMEOUT_SECONDS"),
            "REQUEST_TIMEOUT_SECONDS",
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
        )?);

        Ok(Self {
            addr,
            app_env,
            access,
            refresh,
            max_body_bytes,
            request_timeout,
            database_url: get("DATABASE_URL"),
            identity_seed_file: get("IDENTITY_SEED_FILE").map(PathBuf::from),
        })
    }
}

fn signing_config(
    secret: Option<String>,
    secret_key: &'static str,
    algorithm: Option<String>,
    algorithm_key: &'static str,
) -> Result<SigningConfig, ConfigError> {
    let secret = secret.ok_or(ConfigError::Missing(secret_key))?;
    if secret.len() < MIN_SECRET_BYTES {
        return Err(ConfigError::Invalid(
            secret_key,
            format!("must be at least {} bytes", MIN_SECRET_BYTES),
        ));
    }

    let algorithm = match algorithm {
        Some(tag) => tag
            .parse::<SigningAlgorithm>()
            .map_err(|e| ConfigError::Invalid(algorithm_key, e.to_string()))?,
        None => SigningAlgorithm::Hs256,
    };

    Ok(SigningConfig::new(secret, algorithm))
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid(key, format!("cannot parse {:?}", raw))),
        None => Ok(default),
    }
}

fn positive(value: Option<String>, key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match parse_or(value, key, default)? {
        0 => Err(ConfigError::Invalid(key, "must be greater than zero".to_string())),
        n => Ok(n),
    }
}

fn token_max_age(
    value: Option<String>,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match positive(value, key, default)? {
        n if n > MAX_TOKEN_AGE => Err(ConfigError::Invalid(
            key,
            format!("must be at most {} seconds", MAX_TOKEN_AGE),
        )),
        n => Ok(n),
    }
}

fn parse_bool(value: Option<String>, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = value else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid(key, format!("not a boolean: {:?}", raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn base() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("JWT_SECRET", "access-secret"),
            ("REFRESH_TOKEN_SECRET", "refresh-secret"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_apply_when_only_secrets_are_set() {
        let config = load(&base()).unwrap();

        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.app_env, AppEnv::Development);
        assert_eq!(config.access.signing.algorithm(), SigningAlgorithm::Hs256);
        assert_eq!(config.access.max_age_seconds, 900);
        assert!(config.access.http_only);
        assert_eq!(config.refresh.max_age_seconds, 2_592_000);
        assert_eq!(config.refresh.path, "/");
        assert!(!config.refresh.secure);
        assert!(config.refresh.http_only);
        assert_eq!(config.max_body_bytes, 100 * 1024 * 1024);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.database_url.is_none());
        assert!(config.identity_seed_file.is_none());
    }

    #[test]
    fn production_defaults_to_secure_refresh_cookie() {
        let mut vars = base();
        vars.insert("APP_ENV", "production");
        assert!(load(&vars).unwrap().refresh.secure);

        vars.insert("REFRESH_TOKEN_SECURE", "false");
        assert!(!load(&vars).unwrap().refresh.secure);
    }

    #[test]
    fn explicit_values_are_used() {
        let mut vars = base();
        vars.insert("PORT", "8080");
        vars.insert("JWT_ALGORITHM", "HS512");
        vars.insert("JWT_MAX_AGE_SECONDS", "60");
        vars.insert("REFRESH_TOKEN_PATH", "/api/v1/session");
        vars.insert("DATABASE_URL", "postgres://localhost/app");

        let config = load(&vars).unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.access.signing.algorithm(), SigningAlgorithm::Hs512);
        assert_eq!(config.access.max_age_seconds, 60);
        assert_eq!(config.refresh.path, "/api/v1/session");
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/app")
        );
    }

    #[rstest]
    #[case("JWT_SECRET")]
    #[case("REFRESH_TOKEN_SECRET")]
    fn missing_secret_fails(#[case] key: &'static str) {
        let mut vars = base();
        vars.remove(key);
        assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing(key));
    }

    #[rstest]
    #[case("JWT_SECRET", "short")]
    #[case("JWT_ALGORITHM", "RS256")]
    #[case("REFRESH_TOKEN_ALGORITHM", "hs256")]
    #[case("JWT_MAX_AGE_SECONDS", "0")]
    #[case("REFRESH_TOKEN_MAX_AGE_SECONDS", "-5")]
    #[case("JWT_MAX_AGE_SECONDS", "100000000000000")]
    #[case("REFRESH_TOKEN_MAX_AGE_SECONDS", "3153600001")]
    #[case("REFRESH_TOKEN_PATH", "api")]
    #[case("JWT_HTTP_ONLY", "maybe")]
    #[case("PORT", "http")]
    fn invalid_values_fail(#[case] key: &'static str, #[case] value: &'static str) {
        let mut vars = base();
        vars.insert(key, value);
        assert!(matches!(load(&vars), Err(ConfigError::Invalid(k, _)) if k == key));
    }

    #[test]
    fn accepted_max_ages_can_be_issued() {
        use crate::services::auth::factory::build_session_issuer;
        use crate::services::auth::identity::Identity;

        let mut vars = base();
        vars.insert("JWT_MAX_AGE_SECONDS", "3153600000");
        vars.insert("REFRESH_TOKEN_MAX_AGE_SECONDS", "3153600000");
        let config = load(&vars).unwrap();

        let issuer = build_session_issuer(&config);
        let identity = Identity::new(uuid::Uuid::new_v4(), "Grace", "Hopper", ["admin"]);
        assert!(issuer.issue_access_token(&identity, false).is_ok());
        assert!(issuer.issue_refresh_token(identity.id).is_ok());
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut vars = base();
        vars.insert("JWT_SECRET", "   ");
        assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing("JWT_SECRET"));
    }
}
