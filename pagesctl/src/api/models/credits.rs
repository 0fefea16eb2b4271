//! API request/response models for the credit system.

use crate::api::models::users::SubscriptionTier;
use crate::db::models::profiles::ProfileDBResponse;
use crate::types::UserId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for `GET /api/credits/balance`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    /// Current balance as a string to preserve precision
    #[schema(value_type = String)]
    pub balance: Decimal,
    pub subscription_tier: SubscriptionTier,
    pub tokens_used: i64,
    pub stories_created: i64,
    pub chapters_generated: i64,
}

impl From<ProfileDBResponse> for BalanceResponse {
    fn from(db: ProfileDBResponse) -> Self {
        Self {
            user_id: db.user_id,
            balance: db.credit_balance,
            subscription_tier: db.subscription_tier,
            tokens_used: db.tokens_used,
            stories_created: db.stories_created,
            chapters_generated: db.chapters_generated,
        }
    }
}

/// Admin request to grant credits to a user.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreditGrantRequest {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    /// Amount of credits, sent as string to preserve precision
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub description: Option<String>,
}

/// Response for a credit grant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreditGrantResponse {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[schema(value_type = String)]
    pub new_balance: Decimal,
}
