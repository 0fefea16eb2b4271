//! Profile repository: the per-user credit ledger and usage counters.
//!
//! The credit balance is only ever changed through single-statement
//! conditional updates so that concurrent billable operations cannot
//! double-spend. There is no read-modify-write of the balance anywhere in
//! the application.

use crate::api::models::users::SubscriptionTier;
use crate::db::errors::Result;
use crate::db::models::profiles::{ProfileDBResponse, UsageIncrement};
use crate::types::UserId;
use rust_decimal::Decimal;
use sqlx::PgConnection;

const PROFILE_COLUMNS: &str =
    "user_id, subscription_tier, is_creator, credit_balance, tokens_used, stories_created, chapters_generated, updated_at";

pub struct Profiles<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Profiles<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Create the profile row for a freshly created user.
    pub async fn create_default(
        &mut self,
        user_id: UserId,
        tier: SubscriptionTier,
        initial_balance: Decimal,
    ) -> Result<ProfileDBResponse> {
        let profile = sqlx::query_as::<_, ProfileDBResponse>(&format!(
            "INSERT INTO profiles (user_id, subscription_tier, credit_balance)
             VALUES ($1, $2, $3)
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(tier)
        .bind(initial_balance)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(profile)
    }

    pub async fn get(&mut self, user_id: UserId) -> Result<Option<ProfileDBResponse>> {
        let profile = sqlx::query_as::<_, ProfileDBResponse>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(profile)
    }

    pub async fn balance(&mut self, user_id: UserId) -> Result<Decimal> {
        let balance: Option<Decimal> = sqlx::query_scalar("SELECT credit_balance FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(balance.unwrap_or(Decimal::ZERO))
    }

    /// Exactly-once conditional deduction. Returns `true` when the balance
    /// covered the amount and was decremented, `false` otherwise. The check
    /// and the write are a single statement, so concurrent callers cannot
    /// both pass on the same credits.
    pub async fn try_deduct(&mut self, user_id: UserId, amount: Decimal) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE profiles
             SET credit_balance = credit_balance - $2, updated_at = NOW()
             WHERE user_id = $1 AND credit_balance >= $2",
        )
        .bind(user_id)
        .bind(amount)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Deduct as much of `amount` as the balance covers, clamping at zero.
    /// Used when the provider cost is already sunk and the conditional
    /// deduction lost a race. Returns the new balance.
    pub async fn deduct_clamped(&mut self, user_id: UserId, amount: Decimal) -> Result<Decimal> {
        let balance: Decimal = sqlx::query_scalar(
            "UPDATE profiles
             SET credit_balance = GREATEST(credit_balance - $2, 0), updated_at = NOW()
             WHERE user_id = $1
             RETURNING credit_balance",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(balance)
    }

    /// Grant credits. Returns the new balance.
    pub async fn credit(&mut self, user_id: UserId, amount: Decimal) -> Result<Decimal> {
        let balance: Decimal = sqlx::query_scalar(
            "UPDATE profiles
             SET credit_balance = credit_balance + $2, updated_at = NOW()
             WHERE user_id = $1
             RETURNING credit_balance",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(balance)
    }

    /// Bump the cumulative usage counters after a billable operation.
    pub async fn record_usage(&mut self, user_id: UserId, increment: UsageIncrement) -> Result<()> {
        sqlx::query(
            "UPDATE profiles
             SET tokens_used = tokens_used + $2,
                 stories_created = stories_created + $3,
                 chapters_generated = chapters_generated + $4,
                 updated_at = NOW()
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(increment.tokens)
        .bind(increment.stories)
        .bind(increment.chapters)
        .execute(&mut *self.db)
        .await?;

        Ok(())
    }

    pub async fn set_tier(&mut self, user_id: UserId, tier: SubscriptionTier, is_creator: Option<bool>) -> Result<ProfileDBResponse> {
        let profile = sqlx::query_as::<_, ProfileDBResponse>(&format!(
            "UPDATE profiles
             SET subscription_tier = $2, is_creator = COALESCE($3, is_creator), updated_at = NOW()
             WHERE user_id = $1
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(tier)
        .bind(is_creator)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(profile)
    }
}
