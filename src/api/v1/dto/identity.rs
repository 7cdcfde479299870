/*
 * Responsibility
 * - identity / service-token request and response DTOs
 * - validate() for request shape checks
 */
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::auth::Identity;

const MAX_NAME_CHARS: usize = 64;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
}

impl From<&Identity> for IdentityResponse {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            roles: identity.roles.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTokenRequest {
    pub id: Uuid,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl ServiceTokenRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.id.is_nil() {
            return Err("id must not be nil");
        }
        if self.first_name.chars().count() > MAX_NAME_CHARS
            || self.last_name.chars().count() > MAX_NAME_CHARS
        {
            return Err("names must be <= 64 chars");
        }
        if self.roles.iter().any(|role| role.trim().is_empty()) {
            return Err("roles must not be blank");
        }

        Ok(())
    }

    pub fn into_identity(self) -> Identity {
        Identity::new(self.id, self.first_name, self.last_name, self.roles)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTokenResponse {
    pub access_token: String,
    pub expires_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(roles: &[&str]) -> ServiceTokenRequest {
        ServiceTokenRequest {
            id: Uuid::new_v4(),
            first_name: "Build".to_string(),
            last_name: "Bot".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn accepts_well_formed_request() {
        assert_eq!(request(&["ci"]).validate(), Ok(()));
    }

    #[test]
    fn rejects_nil_id_and_blank_roles() {
        let mut nil = request(&[]);
        nil.id = Uuid::nil();
        assert!(nil.validate().is_err());
        assert!(request(&["ci", " "]).validate().is_err());
    }

    #[test]
    fn response_lists_roles_in_order() {
        let identity = Identity::new(Uuid::new_v4(), "A", "B", ["ops", "admin"]);
        let json = serde_json::to_value(IdentityResponse::from(&identity)).unwrap();
        assert_eq!(json["roles"], serde_json::json!(["admin", "ops"]));
        assert_eq!(json["firstName"], "A");
    }
}
