//! API request/response models for stories.

use crate::api::models::foundation::Foundation;
use crate::api::models::pagination::Pagination;
use crate::db::models::stories::StoryDBResponse;
use crate::llm::client::TokenUsage;
use crate::pricing::StoryLength;
use crate::types::{StoryId, UserId};
use crate::validation::{CreationMode, StoryForm};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Story lifecycle status. Advanced draft → in_progress/completed →
/// published; completed stories may be reopened to in_progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    Draft,
    InProgress,
    Completed,
    Published,
}

impl StoryStatus {
    /// Whether a direct transition from `self` to `next` is allowed.
    pub fn can_transition(self, next: StoryStatus) -> bool {
        use StoryStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Draft, InProgress) | (Draft, Completed) => true,
            (InProgress, Completed) | (InProgress, Published) => true,
            (Completed, Published) | (Completed, InProgress) => true,
            _ => false,
        }
    }
}

/// Request body for `POST /api/stories`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StoryCreateRequest {
    /// Creation mode tag; unknown tags fall back to `story` with a warning
    #[serde(default)]
    pub mode: Option<String>,
    /// Requested length; defaults to `standard`
    #[serde(default)]
    pub length: Option<StoryLength>,
    #[serde(flatten)]
    pub form: StoryForm,
}

/// Request body for `PATCH /api/stories/{id}`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct StoryUpdateRequest {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub status: Option<StoryStatus>,
}

/// Query parameters for listing stories.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListStoriesQuery {
    /// Filter by status
    pub status: Option<StoryStatus>,
    /// List another user's stories (admin only)
    #[param(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
}

/// A story as returned by the API. The foundation is the typed contract,
/// never raw text.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: StoryId,
    #[schema(value_type = String, format = "uuid")]
    pub owner: UserId,
    pub title: String,
    pub genre: String,
    pub premise: String,
    pub mode: CreationMode,
    pub length: StoryLength,
    pub status: StoryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foundation: Option<Foundation>,
    pub word_count: i64,
    pub chapter_count: i64,
    /// Credits spent on this story, as a string to preserve precision
    #[schema(value_type = String)]
    pub credits_spent: Decimal,
    #[schema(value_type = String)]
    pub usd_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoryDBResponse> for StoryResponse {
    fn from(db: StoryDBResponse) -> Self {
        // Stored foundations were validated on the way in; tolerate (and log)
        // rather than fail a whole read if an old row doesn't parse.
        let foundation = db.foundation.as_deref().and_then(|json| match Foundation::from_stored(json) {
            Ok(f) => Some(f),
            Err(e) => {
                tracing::warn!("story {} has an unparseable stored foundation: {}", db.id, e);
                None
            }
        });

        Self {
            id: db.id,
            owner: db.owner,
            title: db.title,
            genre: db.genre,
            premise: db.premise,
            mode: db.mode,
            length: db.length,
            status: db.status,
            foundation,
            word_count: db.word_count,
            chapter_count: db.chapter_count,
            credits_spent: db.credits_spent,
            usd_cost: db.usd_cost,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Coarse progress counter for UI display only.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Progress {
    pub current_step: u32,
    pub total_steps: u32,
    pub stage: String,
}

/// Billing and generation metadata returned alongside a generated resource.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerationMeta {
    pub progress: Progress,
    /// Actual credits charged (not the estimate)
    #[schema(value_type = String)]
    pub credits_charged: Decimal,
    /// Balance after the charge
    #[schema(value_type = String)]
    pub credits_remaining: Decimal,
    pub usage: TokenUsage,
    /// True when the completion came from the response cache
    pub cached: bool,
    /// True when the moderation filter flagged the generated content
    pub flagged: bool,
    pub warnings: Vec<String>,
}

/// Response body for `POST /api/stories`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoryCreateResponse {
    pub story: StoryResponse,
    pub generation: GenerationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use StoryStatus::*;
        assert!(Draft.can_transition(InProgress));
        assert!(Draft.can_transition(Completed));
        assert!(InProgress.can_transition(Completed));
        assert!(InProgress.can_transition(Published));
        assert!(Completed.can_transition(Published));
        assert!(Completed.can_transition(InProgress));
        // No un-publishing, no skipping back to draft
        assert!(!Published.can_transition(Draft));
        assert!(!Published.can_transition(InProgress));
        assert!(!Completed.can_transition(Draft));
        assert!(!Draft.can_transition(Published));
        // Self-transitions are no-ops, not errors
        assert!(Published.can_transition(Published));
    }
}
