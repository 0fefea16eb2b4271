//! API request/response models for usage analytics.

use crate::db::handlers::generation_logs::UsageTotalsDB;
use crate::db::models::generation_logs::{DailyAggregateDB, GenerationOperation, OperationAggregateDB};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for `GET /api/analytics/usage`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UsageQuery {
    /// Restrict to the trailing N days (default: all time)
    pub days: Option<i64>,
    /// Query another user's usage (admin only)
    #[param(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageTotals {
    pub calls: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    #[schema(value_type = String)]
    pub credits_charged: Decimal,
    #[schema(value_type = String)]
    pub usd_cost: Decimal,
}

impl From<UsageTotalsDB> for UsageTotals {
    fn from(db: UsageTotalsDB) -> Self {
        Self {
            calls: db.calls,
            input_tokens: db.input_tokens,
            output_tokens: db.output_tokens,
            credits_charged: db.credits_charged,
            usd_cost: db.usd_cost,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OperationAggregate {
    pub operation: GenerationOperation,
    pub calls: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    #[schema(value_type = String)]
    pub credits_charged: Decimal,
    #[schema(value_type = String)]
    pub usd_cost: Decimal,
}

impl From<OperationAggregateDB> for OperationAggregate {
    fn from(db: OperationAggregateDB) -> Self {
        Self {
            operation: db.operation,
            calls: db.calls,
            input_tokens: db.input_tokens,
            output_tokens: db.output_tokens,
            credits_charged: db.credits_charged,
            usd_cost: db.usd_cost,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DailyAggregate {
    pub day: DateTime<Utc>,
    pub calls: i64,
    #[schema(value_type = String)]
    pub credits_charged: Decimal,
}

impl From<DailyAggregateDB> for DailyAggregate {
    fn from(db: DailyAggregateDB) -> Self {
        Self {
            day: db.day,
            calls: db.calls,
            credits_charged: db.credits_charged,
        }
    }
}

/// Response for `GET /api/analytics/usage`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageResponse {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub totals: UsageTotals,
    pub by_operation: Vec<OperationAggregate>,
    pub by_day: Vec<DailyAggregate>,
}
