//! API request/response models for users and sessions.

use crate::db::models::profiles::ProfileDBResponse;
use crate::db::models::users::{UserDBResponse, UserWithProfileDB};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Subscription tier gating monetization features and advanced views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Free,
    Basic,
    Premium,
    Admin,
}

impl SubscriptionTier {
    /// Tiers allowed to use the enhanced analytics/earnings views.
    pub fn has_enhanced_views(&self) -> bool {
        matches!(self, SubscriptionTier::Premium | SubscriptionTier::Admin)
    }
}

/// The authenticated principal, as resolved by the auth extractor.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
    pub subscription_tier: SubscriptionTier,
    pub is_creator: bool,
}

impl From<UserWithProfileDB> for CurrentUser {
    fn from(db: UserWithProfileDB) -> Self {
        Self {
            id: db.id,
            email: db.email,
            display_name: db.display_name,
            is_admin: db.is_admin,
            subscription_tier: db.subscription_tier,
            is_creator: db.is_creator,
        }
    }
}

/// Registration request for native auth.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// Login request for native auth.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Full user response, as returned by `/api/users/me`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
    pub auth_source: String,
    pub subscription_tier: SubscriptionTier,
    pub is_creator: bool,
    /// Credit balance as a string to preserve precision
    #[schema(value_type = String)]
    pub credit_balance: Decimal,
    pub tokens_used: i64,
    pub stories_created: i64,
    pub chapters_generated: i64,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn from_parts(user: UserDBResponse, profile: ProfileDBResponse) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            is_admin: user.is_admin,
            auth_source: user.auth_source,
            subscription_tier: profile.subscription_tier,
            is_creator: profile.is_creator,
            credit_balance: profile.credit_balance,
            tokens_used: profile.tokens_used,
            stories_created: profile.stories_created,
            chapters_generated: profile.chapters_generated,
            created_at: user.created_at,
        }
    }
}

/// Admin request to change a user's tier or creator flag.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TierUpdateRequest {
    pub subscription_tier: SubscriptionTier,
    pub is_creator: Option<bool>,
}
