//! Database models for story facts (SFSL cache).

use crate::types::StoryId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Category of a stored fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    Character,
    Location,
    Plot,
}

impl FactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactKind::Character => "character",
            FactKind::Location => "location",
            FactKind::Plot => "plot",
        }
    }
}

/// Database request for upserting a fact. (story_id, kind, key) is unique;
/// a newer extraction replaces the detail.
#[derive(Debug, Clone)]
pub struct StoryFactUpsertDBRequest {
    pub story_id: StoryId,
    pub kind: FactKind,
    pub key: String,
    pub detail: String,
    pub source_chapter: Option<i64>,
}

/// Database response for a fact
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoryFactDBResponse {
    pub id: Uuid,
    pub story_id: StoryId,
    pub kind: FactKind,
    pub key: String,
    pub detail: String,
    pub source_chapter: Option<i64>,
    pub created_at: DateTime<Utc>,
}
