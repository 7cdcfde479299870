//! Token codec: signs and verifies session claims with a pinned HMAC algorithm.
//!
//! - The algorithm is fixed per codec (access / refresh). The `alg` header of an
//!   incoming token is never trusted to pick the verifier.
//! - Expiry is checked here, not by `jsonwebtoken`, so that an expired token with a
//!   good signature is reported as `valid = false` together with its claims.

use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use crate::services::auth::identity::Identity;

/// HMAC strengths accepted for session tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningAlgorithm {
    Hs256,
    Hs384,
    Hs512,
}

impl SigningAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        }
    }

    fn jwt_algorithm(self) -> Algorithm {
        match self {
            Self::Hs256 => Algorithm::HS256,
            Self::Hs384 => Algorithm::HS384,
            Self::Hs512 => Algorithm::HS512,
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported signing algorithm {0:?} (expected HS256, HS384 or HS512)")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for SigningAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HS256" => Ok(Self::Hs256),
            "HS384" => Ok(Self::Hs384),
            "HS512" => Ok(Self::Hs512),
            other => Err(UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Secret material + algorithm for one token kind.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningConfig {
    secret: Vec<u8>,
    algorithm: SigningAlgorithm,
}

impl SigningConfig {
    pub fn new(secret: impl Into<Vec<u8>>, algorithm: SigningAlgorithm) -> Self {
        Self {
            secret: secret.into(),
            algorithm,
        }
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("SigningConfig")
            .field("algorithm", &self.algorithm)
            .field("secret_len", &self.secret.len())
            .finish()
    }
}

/// Signed payload of a session token.
///
/// Wire shape: `{exp, uuid, firstName, lastName, roles}`. Refresh tokens only carry
/// `uuid` and `exp`; empty display fields and an empty role set are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    exp: i64,
    uuid: Uuid,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    first_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    last_name: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    roles: BTreeSet<String>,
}

impl Claims {
    /// Claims for an access token: identity, display attributes and roles.
    pub fn access(identity: &Identity, expires_at: DateTime<Utc>) -> Self {
        Self {
            exp: expires_at.timestamp(),
            uuid: identity.id,
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            roles: identity.roles.clone(),
        }
    }

    /// Claims for a refresh token: subject only.
    pub fn refresh(subject: Uuid, expires_at: DateTime<Utc>) -> Self {
        Self {
            exp: expires_at.timestamp(),
            uuid: subject,
            first_name: String::new(),
            last_name: String::new(),
            roles: BTreeSet::new(),
        }
    }

    pub fn subject(&self) -> Uuid {
        self.uuid
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Expiry as unix seconds.
    pub fn exp(&self) -> i64 {
        self.exp
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Identity {
            id: claims.uuid,
            first_name: claims.first_name,
            last_name: claims.last_name,
            roles: claims.roles,
        }
    }
}

/// Outcome of a successful signature check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    pub claims: Claims,
    /// `false` when the signature is good but the token has expired.
    pub valid: bool,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("failed to parse token: {0}")]
    Parse(#[source] jsonwebtoken::errors::Error),
}

#[derive(Clone)]
pub struct TokenCodec {
    algorithm: SigningAlgorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    empty_secret: bool,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(config: &SigningConfig) -> Self {
        let mut validation = Validation::new(config.algorithm.jwt_algorithm());
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            algorithm: config.algorithm,
            encoding_key: EncodingKey::from_secret(&config.secret),
            decoding_key: DecodingKey::from_secret(&config.secret),
            validation,
            empty_secret: config.secret.is_empty(),
        }
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        if self.empty_secret {
            return Err(TokenError::Signing(format!(
                "empty secret cannot be used with {}",
                self.algorithm
            )));
        }

        let header = Header::new(self.algorithm.jwt_algorithm());
        jsonwebtoken::encode(&header, claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, algorithm = %self.algorithm, "failed to sign token");
            TokenError::Signing(e.to_string())
        })
    }

    pub fn decode(&self, token: &str) -> Result<DecodedToken, TokenError> {
        self.decode_at(token, Utc::now())
    }

    /// Verify the signature, then judge expiry against `now`.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<DecodedToken, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, algorithm = %self.algorithm, "token rejected");
                TokenError::Parse(e)
            })?;

        let valid = !data.claims.is_expired_at(now);
        Ok(DecodedToken {
            claims: data.claims,
            valid,
        })
    }
}
