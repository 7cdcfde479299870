use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::services::auth::identity::Identity;
use crate::services::auth::jwt::{Claims, DecodedToken, TokenCodec, TokenError};

/// Lifetime of a long-lived access token (privileged, non-interactive callers only).
pub const LONG_LIVED_HOURS: i64 = 24 * 365 * 100;

/// Issues access and refresh tokens.
///
/// - Access tokens carry identity + roles and are signed with the access codec.
/// - Refresh tokens carry only the subject and are signed with the refresh codec.
#[derive(Clone, Debug)]
pub struct SessionIssuer {
    access: TokenCodec,
    access_max_age: u64,
    refresh: TokenCodec,
    refresh_max_age: u64,
}

impl SessionIssuer {
    pub fn new(
        access: TokenCodec,
        access_max_age: u64,
        refresh: TokenCodec,
        refresh_max_age: u64,
    ) -> Self {
        Self {
            access,
            access_max_age,
            refresh,
            refresh_max_age,
        }
    }

    /// Access token max-age in seconds (also the cookie `Max-Age`).
    pub fn access_max_age(&self) -> u64 {
        self.access_max_age
    }

    /// Refresh token max-age in seconds (also the cookie `Max-Age`).
    pub fn refresh_max_age(&self) -> u64 {
        self.refresh_max_age
    }

    pub fn issue_access_token(
        &self,
        identity: &Identity,
        long_lived: bool,
    ) -> Result<String, TokenError> {
        let lifetime = if long_lived {
            Duration::hours(LONG_LIVED_HOURS)
        } else {
            seconds(self.access_max_age)
        };
        let expires_at = expiry_after(lifetime)?;

        debug!(
            subject = %identity.id,
            long_lived,
            expires_at = %expires_at,
            "issuing access token"
        );

        self.access.encode(&Claims::access(identity, expires_at))
    }

    pub fn issue_refresh_token(&self, identity_id: Uuid) -> Result<String, TokenError> {
        let expires_at = expiry_after(seconds(self.refresh_max_age))?;

        debug!(subject = %identity_id, expires_at = %expires_at, "issuing refresh token");

        self.refresh.encode(&Claims::refresh(identity_id, expires_at))
    }

    pub fn decode_access(&self, token: &str) -> Result<DecodedToken, TokenError> {
        self.access.decode(token)
    }

    pub fn decode_refresh(&self, token: &str) -> Result<DecodedToken, TokenError> {
        self.refresh.decode(token)
    }
}

fn seconds(value: u64) -> Duration {
    i64::try_from(value)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

fn expiry_after(lifetime: Duration) -> Result<DateTime<Utc>, TokenError> {
    Utc::now()
        .checked_add_signed(lifetime)
        .ok_or_else(|| TokenError::Signing(format!("lifetime of {lifetime} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::jwt::{SigningAlgorithm, SigningConfig};

    fn issuer() -> SessionIssuer {
        SessionIssuer::new(
            TokenCodec::new(&SigningConfig::new(
                "access-secret",
                SigningAlgorithm::Hs256,
            )),
            300,
            TokenCodec::new(&SigningConfig::new(
                "refresh-secret",
                SigningAlgorithm::Hs512,
            )),
            86_400,
        )
    }

    fn identity() -> Identity {
        Identity::new(Uuid::new_v4(), "Ada", "Lovelace", ["admin"])
    }

    #[test]
    fn access_token_expires_after_max_age() {
        let issuer = issuer();
        let identity = identity();
        let before = Utc::now().timestamp();

        let token = issuer.issue_access_token(&identity, false).unwrap();
        let decoded = issuer.decode_access(&token).unwrap();

        assert!(decoded.valid);
        assert_eq!(decoded.claims.subject(), identity.id);
        assert_eq!(decoded.claims.roles(), &identity.roles);
        let exp = decoded.claims.exp();
        assert!(exp >= before + 300 && exp <= Utc::now().timestamp() + 300);
    }

    #[test]
    fn long_lived_access_token_lasts_decades() {
        let issuer = issuer();
        let token = issuer.issue_access_token(&identity(), true).unwrap();
        let decoded = issuer.decode_access(&token).unwrap();

        let fifty_years = Duration::days(365 * 50).num_seconds();
        assert!(decoded.claims.exp() > Utc::now().timestamp() + fifty_years);
    }

    #[test]
    fn refresh_token_carries_subject_only() {
        let issuer = issuer();
        let identity = identity();

        let token = issuer.issue_refresh_token(identity.id).unwrap();
        let decoded = issuer.decode_refresh(&token).unwrap();

        assert!(decoded.valid);
        assert_eq!(decoded.claims.subject(), identity.id);
        assert!(decoded.claims.roles().is_empty());
        assert!(decoded.claims.first_name().is_empty());
    }

    #[test]
    fn access_and_refresh_tokens_are_not_interchangeable() {
        let issuer = issuer();
        let identity = identity();

        let access = issuer.issue_access_token(&identity, false).unwrap();
        let refresh = issuer.issue_refresh_token(identity.id).unwrap();

        assert!(issuer.decode_refresh(&access).is_err());
        assert!(issuer.decode_access(&refresh).is_err());
    }

    #[test]
    fn unrepresentable_lifetime_is_an_error() {
        let issuer = SessionIssuer::new(
            TokenCodec::new(&SigningConfig::new("access-secret", SigningAlgorithm::Hs256)),
            100_000_000_000_000,
            TokenCodec::new(&SigningConfig::new("refresh-secret", SigningAlgorithm::Hs256)),
            u64::MAX,
        );
        let identity = identity();

        assert!(matches!(
            issuer.issue_access_token(&identity, false),
            Err(TokenError::Signing(_))
        ));
        assert!(matches!(
            issuer.issue_refresh_token(identity.id),
            Err(TokenError::Signing(_))
        ));
    }
}
