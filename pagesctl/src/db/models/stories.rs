//! Database models for stories.

use crate::api::models::stories::StoryStatus;
use crate::pricing::StoryLength;
use crate::types::{StoryId, UserId};
use crate::validation::CreationMode;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Database request for creating a draft story
#[derive(Debug, Clone)]
pub struct StoryCreateDBRequest {
    pub owner: UserId,
    pub title: String,
    pub genre: String,
    pub premise: String,
    pub mode: CreationMode,
    pub length: StoryLength,
}

/// Database request for updating a story. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct StoryUpdateDBRequest {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub status: Option<StoryStatus>,
    /// JSON text of the typed foundation
    pub foundation: Option<String>,
}

/// Database response for a story
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoryDBResponse {
    pub id: StoryId,
    pub owner: UserId,
    pub title: String,
    pub genre: String,
    pub premise: String,
    pub mode: CreationMode,
    pub length: StoryLength,
    pub foundation: Option<String>,
    pub status: StoryStatus,
    pub word_count: i64,
    pub chapter_count: i64,
    pub credits_spent: Decimal,
    pub usd_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
