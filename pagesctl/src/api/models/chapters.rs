//! API request/response models for chapters.

use crate::api::models::stories::GenerationMeta;
use crate::db::models::chapters::ChapterDBResponse;
use crate::pricing::StoryLength;
use crate::types::{ChapterId, StoryId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for `POST /api/stories/{id}/chapters`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ChapterCreateRequest {
    /// Requested chapter length; defaults to the story's length
    #[serde(default)]
    pub length: Option<StoryLength>,
    /// Optional direction for this chapter, folded into the prompt
    #[serde(default)]
    pub guidance: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChapterResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ChapterId,
    #[schema(value_type = String, format = "uuid")]
    pub story_id: StoryId,
    pub chapter_number: i64,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub word_count: i64,
    #[schema(value_type = String)]
    pub credits_spent: Decimal,
    #[schema(value_type = String)]
    pub usd_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<ChapterDBResponse> for ChapterResponse {
    fn from(db: ChapterDBResponse) -> Self {
        Self {
            id: db.id,
            story_id: db.story_id,
            chapter_number: db.chapter_number,
            title: db.title,
            content: db.content,
            summary: db.summary,
            word_count: db.word_count,
            credits_spent: db.credits_spent,
            usd_cost: db.usd_cost,
            created_at: db.created_at,
        }
    }
}

/// Response body for `POST /api/stories/{id}/chapters`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChapterCreateResponse {
    pub chapter: ChapterResponse,
    pub generation: GenerationMeta,
}
