//! User account repository.

use crate::db::errors::Result;
use crate::db::models::users::{UserCreateDBRequest, UserDBResponse, UserWithProfileDB};
use crate::types::UserId;
use sqlx::PgConnection;

const USER_COLUMNS: &str = "id, email, display_name, is_admin, auth_source, password_hash, created_at, updated_at";

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Create a user row. The caller is responsible for creating the
    /// matching profile row in the same transaction (see
    /// [`crate::db::handlers::Profiles::create_default`]).
    pub async fn create(&mut self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let user = sqlx::query_as::<_, UserDBResponse>(&format!(
            "INSERT INTO users (email, display_name, is_admin, auth_source, password_hash)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&request.email)
        .bind(&request.display_name)
        .bind(request.is_admin)
        .bind(&request.auth_source)
        .bind(&request.password_hash)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user)
    }

    pub async fn get_by_id(&mut self, id: UserId) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    pub async fn get_by_email(&mut self, email: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    /// Fetch a user joined with their profile, as authentication needs it.
    pub async fn get_with_profile_by_email(&mut self, email: &str) -> Result<Option<UserWithProfileDB>> {
        let user = sqlx::query_as::<_, UserWithProfileDB>(
            "SELECT u.id, u.email, u.display_name, u.is_admin, u.password_hash,
                    p.subscription_tier, p.is_creator
             FROM users u
             INNER JOIN profiles p ON p.user_id = u.id
             WHERE u.email = $1",
        )
        .bind(email)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(user)
    }

    pub async fn set_password_hash(&mut self, id: UserId, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }
}
