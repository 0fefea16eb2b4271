//! Database models for profiles: the per-user ledger row.

use crate::api::models::users::SubscriptionTier;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Database response for a profile
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileDBResponse {
    pub user_id: UserId,
    pub subscription_tier: SubscriptionTier,
    pub is_creator: bool,
    pub credit_balance: Decimal,
    pub tokens_used: i64,
    pub stories_created: i64,
    pub chapters_generated: i64,
    pub updated_at: DateTime<Utc>,
}

/// Counter increments recorded alongside a billable operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageIncrement {
    pub tokens: i64,
    pub stories: i64,
    pub chapters: i64,
}
