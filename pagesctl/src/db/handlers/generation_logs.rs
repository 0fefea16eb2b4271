//! Generation log repository. Rows are append-only.

use crate::db::errors::Result;
use crate::db::models::generation_logs::{
    DailyAggregateDB, GenerationLogCreateDBRequest, GenerationLogDBResponse, OperationAggregateDB,
};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;

const LOG_COLUMNS: &str = "id, user_id, story_id, operation, model, input_tokens, output_tokens, \
     credits_charged, usd_cost, cached, flagged, created_at";

/// Overall usage totals for one user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UsageTotalsDB {
    pub calls: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub credits_charged: Decimal,
    pub usd_cost: Decimal,
}

pub struct GenerationLogs<'c> {
    db: &'c mut PgConnection,
}

impl<'c> GenerationLogs<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    pub async fn create(&mut self, request: &GenerationLogCreateDBRequest) -> Result<GenerationLogDBResponse> {
        let log = sqlx::query_as::<_, GenerationLogDBResponse>(&format!(
            "INSERT INTO generation_logs
                 (user_id, story_id, operation, model, input_tokens, output_tokens,
                  credits_charged, usd_cost, cached, flagged)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {LOG_COLUMNS}"
        ))
        .bind(request.user_id)
        .bind(request.story_id)
        .bind(request.operation)
        .bind(&request.model)
        .bind(request.input_tokens)
        .bind(request.output_tokens)
        .bind(request.credits_charged)
        .bind(request.usd_cost)
        .bind(request.cached)
        .bind(request.flagged)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(log)
    }

    pub async fn list_for_user(&mut self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<GenerationLogDBResponse>> {
        let logs = sqlx::query_as::<_, GenerationLogDBResponse>(&format!(
            "SELECT {LOG_COLUMNS} FROM generation_logs
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             OFFSET $2 LIMIT $3"
        ))
        .bind(user_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(logs)
    }

    pub async fn totals_for_user(&mut self, user_id: UserId, since: Option<DateTime<Utc>>) -> Result<UsageTotalsDB> {
        let totals = sqlx::query_as::<_, UsageTotalsDB>(
            "SELECT COUNT(*) AS calls,
                    COALESCE(SUM(input_tokens), 0)::BIGINT AS input_tokens,
                    COALESCE(SUM(output_tokens), 0)::BIGINT AS output_tokens,
                    COALESCE(SUM(credits_charged), 0) AS credits_charged,
                    COALESCE(SUM(usd_cost), 0) AS usd_cost
             FROM generation_logs
             WHERE user_id = $1 AND ($2::timestamptz IS NULL OR created_at >= $2)",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(totals)
    }

    pub async fn aggregate_by_operation(
        &mut self,
        user_id: UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<OperationAggregateDB>> {
        let rows = sqlx::query_as::<_, OperationAggregateDB>(
            "SELECT operation,
                    COUNT(*) AS calls,
                    COALESCE(SUM(input_tokens), 0)::BIGINT AS input_tokens,
                    COALESCE(SUM(output_tokens), 0)::BIGINT AS output_tokens,
                    COALESCE(SUM(credits_charged), 0) AS credits_charged,
                    COALESCE(SUM(usd_cost), 0) AS usd_cost
             FROM generation_logs
             WHERE user_id = $1 AND ($2::timestamptz IS NULL OR created_at >= $2)
             GROUP BY operation
             ORDER BY operation",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(rows)
    }

    pub async fn aggregate_by_day(&mut self, user_id: UserId, since: Option<DateTime<Utc>>) -> Result<Vec<DailyAggregateDB>> {
        let rows = sqlx::query_as::<_, DailyAggregateDB>(
            "SELECT date_trunc('day', created_at) AS day,
                    COUNT(*) AS calls,
                    COALESCE(SUM(credits_charged), 0) AS credits_charged
             FROM generation_logs
             WHERE user_id = $1 AND ($2::timestamptz IS NULL OR created_at >= $2)
             GROUP BY day
             ORDER BY day",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(rows)
    }

    /// Generation spend attributed to a set of stories, for the enhanced
    /// earnings view.
    pub async fn spend_for_story(&mut self, story_id: crate::types::StoryId) -> Result<Decimal> {
        let spend: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(usd_cost), 0) FROM generation_logs WHERE story_id = $1",
        )
        .bind(story_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(spend)
    }
}
