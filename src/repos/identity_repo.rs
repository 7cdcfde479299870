/*
 * Responsibility
 * - read-only SQLx access to users and their group roles
 * - IdentityLookup adapter used by the refresh flow
 */
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repos::error::RepoError;
use crate::services::auth::identity::{Identity, IdentityLookup, LookupError};

/// One row per (user, role). `role` is `None` when the user's group grants nothing.
#[derive(Debug, FromRow)]
pub struct IdentityRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<String>,
}

/// Identity lookup backed by Postgres.
///
/// Schema assumed:
/// - users.id, users.first_name, users.last_name, users.group_id, users.deleted_at
/// - groups.id, groups.deleted_at
/// - groups_roles.group_id, groups_roles.role_id
/// - roles.id, roles.en_name, roles.deleted_at
#[derive(Clone, Debug)]
pub struct PgIdentityRepo {
    pool: PgPool,
}

impl PgIdentityRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>, RepoError> {
        let rows = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT u.id, u.first_name, u.last_name, r.en_name AS role
            FROM users u
            LEFT JOIN groups g
              ON g.id = u.group_id AND g.deleted_at IS NULL
            LEFT JOIN groups_roles gr
              ON gr.group_id = g.id
            LEFT JOIN roles r
              ON r.id = gr.role_id AND r.deleted_at IS NULL
            WHERE u.id = $1 AND u.deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(fold_rows(rows))
    }
}

/// Collapse the per-role rows of one user into an identity.
fn fold_rows(rows: Vec<IdentityRow>) -> Option<Identity> {
    let mut rows = rows.into_iter();
    let first = rows.next()?;

    let roles = std::iter::once(first.role)
        .chain(rows.map(|row| row.role))
        .flatten();

    Some(Identity::new(first.id, first.first_name, first.last_name, roles))
}

#[async_trait]
impl IdentityLookup for PgIdentityRepo {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn lookup_identity(&self, id: Uuid) -> Result<Option<Identity>, LookupError> {
        Ok(self.find_identity(id).await?)
    }
}
