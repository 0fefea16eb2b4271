//! API request/response models for creator earnings.

use crate::types::StoryId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for `GET /api/creators/earnings`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct EarningsQuery {
    /// View selector: "basic" (default) or "enhanced" (premium/admin only)
    pub view: Option<String>,
}

/// Per-story breakdown, enhanced view only.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoryEarnings {
    #[schema(value_type = String, format = "uuid")]
    pub story_id: StoryId,
    pub title: String,
    pub word_count: i64,
    #[schema(value_type = String)]
    pub earnings_usd: Decimal,
    /// Generation spend attributed to this story
    #[schema(value_type = String)]
    pub generation_cost_usd: Decimal,
    #[schema(value_type = String)]
    pub margin_usd: Decimal,
}

/// Response for `GET /api/creators/earnings`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EarningsResponse {
    pub view: String,
    pub published_stories: i64,
    pub published_words: i64,
    #[schema(value_type = String)]
    pub estimated_earnings_usd: Decimal,
    /// Present in the enhanced view only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Vec<StoryEarnings>>,
}
