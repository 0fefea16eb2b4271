//! Database models for users.

use crate::api::models::users::SubscriptionTier;
use crate::types::UserId;
use chrono::{DateTime, Utc};

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
    pub auth_source: String,
    pub password_hash: Option<String>,
}

/// Database response for a user
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
    pub auth_source: String,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user joined with their profile row, as needed by authentication.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserWithProfileDB {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
    pub password_hash: Option<String>,
    pub subscription_tier: SubscriptionTier,
    pub is_creator: bool,
}
