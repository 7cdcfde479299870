//! Identity of an authenticated subject and the lookup contract used by the refresh flow.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap},
    fs,
    path::Path,
};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::repos::error::RepoError;

/// Subject as supplied by the identity store. The core never mutates it.
///
/// Roles are case-sensitive and kept sorted so they are emitted in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Identity {
    pub fn new<R>(
        id: Uuid,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        roles: impl IntoIterator<Item = R>,
    ) -> Self
    where
        R: Into<String>,
    {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("failed to load identity seed file {path}: {reason}")]
    Seed { path: String, reason: String },
}

/// Resolves a subject id into its current identity.
///
/// - `Ok(Some(_))`: subject exists
/// - `Ok(None)`: subject is unknown (refresh is refused)
/// - `Err(_)`: store failure
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    // Backend name for logging.
    fn backend_name(&self) -> &'static str;

    async fn lookup_identity(&self, id: Uuid) -> Result<Option<Identity>, LookupError>;
}

/// Map-backed identity store for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    identities: RwLock<HashMap<Uuid, Identity>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identities(identities: impl IntoIterator<Item = Identity>) -> Self {
        let identities = identities
            .into_iter()
            .map(|identity| (identity.id, identity))
            .collect();
        Self {
            identities: RwLock::new(identities),
        }
    }

    /// Load identities from a JSON array (`[{"id": ..., "firstName": ..., ...}]`).
    pub fn from_seed_file(path: &Path) -> Result<Self, LookupError> {
        let seed_error = |reason: String| LookupError::Seed {
            path: path.display().to_string(),
            reason,
        };

        let raw = fs::read_to_string(path).map_err(|e| seed_error(e.to_string()))?;
        let identities: Vec<Identity> =
            serde_json::from_str(&raw).map_err(|e| seed_error(e.to_string()))?;

        Ok(Self::with_identities(identities))
    }

    /// Insert or replace an identity. Returns the previous value, if any.
    pub async fn upsert(&self, identity: Identity) -> Option<Identity> {
        self.identities.write().await.insert(identity.id, identity)
    }
}

#[async_trait]
impl IdentityLookup for InMemoryIdentityStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn lookup_identity(&self, id: Uuid) -> Result<Option<Identity>, LookupError> {
        Ok(self.identities.read().await.get(&id).cloned())
    }
}
