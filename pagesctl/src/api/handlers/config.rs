//! Public runtime configuration for frontend clients.

use crate::{
    AppState,
    validation::{KNOWN_GENRES, content_limits},
};
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContentLimits {
    pub title_max_length: usize,
    pub premise_max_length: usize,
    pub description_max_length: usize,
    pub min_endings: u32,
    pub max_endings: u32,
}

/// Public, non-sensitive runtime metadata.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicConfig {
    pub site_url: String,
    pub model: String,
    pub modes: Vec<String>,
    pub lengths: Vec<String>,
    pub genres: Vec<String>,
    pub limits: ContentLimits,
    pub native_auth_enabled: bool,
}

/// Public configuration
#[utoipa::path(
    get,
    path = "/config",
    tag = "config",
    summary = "Public configuration",
    responses((status = 200, description = "Runtime metadata for clients", body = PublicConfig))
)]
#[tracing::instrument(skip_all)]
pub async fn get_config(State(state): State<AppState>) -> Json<PublicConfig> {
    Json(PublicConfig {
        site_url: state.config.site_url.clone(),
        model: state.config.anthropic.model.clone(),
        modes: ["story", "novel", "choice_book", "ai_builder"].map(String::from).to_vec(),
        lengths: ["flash", "short", "standard", "long", "epic"].map(String::from).to_vec(),
        genres: KNOWN_GENRES.iter().map(|g| g.to_string()).collect(),
        limits: ContentLimits {
            title_max_length: content_limits::TITLE_MAX_LENGTH,
            premise_max_length: content_limits::PREMISE_MAX_LENGTH,
            description_max_length: content_limits::DESCRIPTION_MAX_LENGTH,
            min_endings: content_limits::MIN_ENDINGS,
            max_endings: content_limits::MAX_ENDINGS,
        },
        native_auth_enabled: state.config.auth.native.enabled,
    })
}

#[cfg(test)]
mod tests {
    use crate::test_utils::*;
    use sqlx::PgPool;

    // Test: config is public and carries the limits clients validate against
    #[sqlx::test]
    #[test_log::test]
    async fn test_public_config(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let response = app.get("/api/config").await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["limits"]["premise_max_length"], 2000);
        assert!(body["modes"].as_array().unwrap().iter().any(|m| m == "choice_book"));
    }
}
