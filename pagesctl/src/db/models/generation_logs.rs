//! Database models for generation logs: the append-only record of every
//! LLM call.

use crate::types::{GenerationLogId, StoryId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What kind of generation a log row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GenerationOperation {
    Foundation,
    Chapter,
    Universe,
}

/// Database request for appending a generation log row
#[derive(Debug, Clone)]
pub struct GenerationLogCreateDBRequest {
    pub user_id: UserId,
    pub story_id: Option<StoryId>,
    pub operation: GenerationOperation,
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub credits_charged: Decimal,
    pub usd_cost: Decimal,
    pub cached: bool,
    pub flagged: bool,
}

/// Database response for a generation log row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GenerationLogDBResponse {
    pub id: GenerationLogId,
    pub user_id: UserId,
    pub story_id: Option<StoryId>,
    pub operation: GenerationOperation,
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub credits_charged: Decimal,
    pub usd_cost: Decimal,
    pub cached: bool,
    pub flagged: bool,
    pub created_at: DateTime<Utc>,
}

/// Per-operation aggregate for the analytics endpoint.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OperationAggregateDB {
    pub operation: GenerationOperation,
    pub calls: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub credits_charged: Decimal,
    pub usd_cost: Decimal,
}

/// Per-day aggregate for the analytics endpoint.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailyAggregateDB {
    pub day: DateTime<Utc>,
    pub calls: i64,
    pub credits_charged: Decimal,
}
