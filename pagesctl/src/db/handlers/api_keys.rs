//! API key repository.
//!
//! Keys are opaque secrets scoped to a single user, passed as
//! `Authorization: Bearer <key>`. No expiration; revoked by deletion.

use crate::db::errors::Result;
use crate::db::models::users::UserWithProfileDB;
use crate::types::{ApiKeyId, UserId};
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

/// Database response for an API key. The secret is only returned on
/// creation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKeyDBResponse {
    pub id: ApiKeyId,
    pub user_id: UserId,
    pub name: String,
    pub secret: String,
    pub created_at: DateTime<Utc>,
}

pub struct ApiKeys<'c> {
    db: &'c mut PgConnection,
}

impl<'c> ApiKeys<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    pub async fn create(&mut self, user_id: UserId, name: &str, secret: &str) -> Result<ApiKeyDBResponse> {
        let key = sqlx::query_as::<_, ApiKeyDBResponse>(
            "INSERT INTO api_keys (user_id, name, secret)
             VALUES ($1, $2, $3)
             RETURNING id, user_id, name, secret, created_at",
        )
        .bind(user_id)
        .bind(name)
        .bind(secret)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(key)
    }

    pub async fn list_for_user(&mut self, user_id: UserId) -> Result<Vec<ApiKeyDBResponse>> {
        let keys = sqlx::query_as::<_, ApiKeyDBResponse>(
            "SELECT id, user_id, name, secret, created_at FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(keys)
    }

    pub async fn delete(&mut self, user_id: UserId, id: ApiKeyId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Resolve a bearer secret to its owning user (with profile), if any.
    pub async fn authenticate(&mut self, secret: &str) -> Result<Option<UserWithProfileDB>> {
        let user = sqlx::query_as::<_, UserWithProfileDB>(
            "SELECT u.id, u.email, u.display_name, u.is_admin, u.password_hash,
                    p.subscription_tier, p.is_creator
             FROM api_keys ak
             INNER JOIN users u ON u.id = ak.user_id
             INNER JOIN profiles p ON p.user_id = u.id
             WHERE ak.secret = $1",
        )
        .bind(secret)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(user)
    }
}
