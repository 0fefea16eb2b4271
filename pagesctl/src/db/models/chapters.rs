//! Database models for chapters.

use crate::types::{ChapterId, StoryId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Database request for appending a chapter. The chapter number is assigned
/// by the repository inside the insert transaction.
#[derive(Debug, Clone)]
pub struct ChapterCreateDBRequest {
    pub story_id: StoryId,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub word_count: i64,
    pub credits_spent: Decimal,
    pub usd_cost: Decimal,
}

/// Database response for a chapter
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChapterDBResponse {
    pub id: ChapterId,
    pub story_id: StoryId,
    pub chapter_number: i64,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub word_count: i64,
    pub credits_spent: Decimal,
    pub usd_cost: Decimal,
    pub created_at: DateTime<Utc>,
}
