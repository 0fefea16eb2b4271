//! HTTP handlers for creator earnings.

use crate::{
    AppState,
    api::models::{
        creators::{EarningsQuery, EarningsResponse, StoryEarnings},
        stories::StoryStatus,
        users::CurrentUser,
    },
    auth::permissions,
    db::handlers::{GenerationLogs, Repository, Stories, stories::StoryFilter},
    errors::{Error, Result},
    pricing,
    types::{Operation, Resource},
};
use axum::{
    extract::{Query, State},
    response::Json,
};

/// Creator earnings
#[utoipa::path(
    get,
    path = "/creators/earnings",
    tag = "creators",
    summary = "Creator earnings",
    description = "Earnings summary derived from published stories. view=enhanced adds a per-story breakdown with generation-cost margins (premium or admin tier required).",
    params(EarningsQuery),
    responses(
        (status = 200, description = "Earnings summary", body = EarningsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - creator access or premium subscription required"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_earnings(
    State(state): State<AppState>,
    Query(query): Query<EarningsQuery>,
    current_user: CurrentUser,
) -> Result<Json<EarningsResponse>> {
    permissions::require(&current_user, Resource::Earnings, Operation::ReadOwn)?;

    let view = query.view.as_deref().unwrap_or("basic");
    let enhanced = match view {
        "enhanced" => {
            if !current_user.subscription_tier.has_enhanced_views() {
                return Err(Error::TierRequired {
                    message: "Premium subscription required for the enhanced earnings view".to_string(),
                });
            }
            true
        }
        // Unknown views degrade to basic rather than erroring; admins see
        // whatever they ask for
        _ => false,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let published = {
        let mut stories_repo = Stories::new(&mut conn);
        stories_repo
            .list(&StoryFilter {
                owner: Some(current_user.id),
                status: Some(StoryStatus::Published),
                skip: 0,
                limit: crate::api::models::pagination::MAX_LIMIT,
            })
            .await?
    };

    let published_stories = published.len() as i64;
    let published_words: i64 = published.iter().map(|s| s.word_count).sum();
    let estimated_earnings_usd = pricing::creator_earnings(published_words);

    let breakdown = if enhanced {
        let mut logs_repo = GenerationLogs::new(&mut conn);
        let mut rows = Vec::with_capacity(published.len());
        for story in &published {
            let generation_cost_usd = logs_repo.spend_for_story(story.id).await?;
            let earnings_usd = pricing::creator_earnings(story.word_count);
            rows.push(StoryEarnings {
                story_id: story.id,
                title: story.title.clone(),
                word_count: story.word_count,
                earnings_usd,
                generation_cost_usd,
                margin_usd: earnings_usd - generation_cost_usd,
            });
        }
        Some(rows)
    } else {
        None
    };

    Ok(Json(EarningsResponse {
        view: if enhanced { "enhanced" } else { "basic" }.to_string(),
        published_stories,
        published_words,
        estimated_earnings_usd,
        breakdown,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::models::users::SubscriptionTier;
    use crate::test_utils::*;
    use sqlx::PgPool;

    // Test: non-creator requests are forbidden
    #[sqlx::test]
    #[test_log::test]
    async fn test_non_creator_gets_403(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, SubscriptionTier::Premium, false, false).await;

        app.get("/api/creators/earnings")
            .add_header(PROXY_AUTH_HEADER, &user.email)
            .await
            .assert_status_forbidden();
    }

    // Test: free-tier creator asking for the enhanced view gets 403 with
    // the premium message
    #[sqlx::test]
    #[test_log::test]
    async fn test_free_tier_enhanced_view_requires_premium(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let creator = create_test_user(&pool, SubscriptionTier::Free, true, false).await;

        let response = app
            .get("/api/creators/earnings?view=enhanced")
            .add_header(PROXY_AUTH_HEADER, &creator.email)
            .await;

        response.assert_status_forbidden();
        let body: serde_json::Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("Premium subscription required"));
    }

    // Test: the basic view works for a free-tier creator
    #[sqlx::test]
    #[test_log::test]
    async fn test_basic_view_for_free_creator(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let creator = create_test_user(&pool, SubscriptionTier::Free, true, false).await;

        let response = app
            .get("/api/creators/earnings")
            .add_header(PROXY_AUTH_HEADER, &creator.email)
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["view"], "basic");
        assert_eq!(body["published_stories"], 0);
        assert!(body.get("breakdown").is_none() || body["breakdown"].is_null());
    }

    // Test: admin tier gets 200 for any view value
    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_any_view_is_200(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, SubscriptionTier::Admin, false, true).await;

        for view in ["basic", "enhanced", "bogus"] {
            app.get(&format!("/api/creators/earnings?view={view}"))
                .add_header(PROXY_AUTH_HEADER, &admin.email)
                .await
                .assert_status_ok();
        }
    }

    // Test: premium creator sees the enhanced breakdown for published work
    #[sqlx::test]
    #[test_log::test]
    async fn test_enhanced_breakdown_for_premium_creator(pool: PgPool) {
        let llm = mock_llm_server(story_foundation_text(), 1000, 1000).await;
        let app = create_test_app_with_llm(pool.clone(), &llm.uri()).await;
        let creator = create_test_user(&pool, SubscriptionTier::Premium, true, false).await;

        // Create, add a chapter (for word count), publish
        let created: serde_json::Value = app
            .post("/api/stories")
            .add_header(PROXY_AUTH_HEADER, &creator.email)
            .json(&story_create_body())
            .await
            .json();
        let story_id = created["story"]["id"].as_str().unwrap();

        app.post(&format!("/api/stories/{story_id}/chapters"))
            .add_header(PROXY_AUTH_HEADER, &creator.email)
            .json(&serde_json::json!({}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        app.patch(&format!("/api/stories/{story_id}"))
            .add_header(PROXY_AUTH_HEADER, &creator.email)
            .json(&serde_json::json!({"status": "published"}))
            .await
            .assert_status_ok();

        let body: serde_json::Value = app
            .get("/api/creators/earnings?view=enhanced")
            .add_header(PROXY_AUTH_HEADER, &creator.email)
            .await
            .json();

        assert_eq!(body["view"], "enhanced");
        assert_eq!(body["published_stories"], 1);
        let breakdown = body["breakdown"].as_array().unwrap();
        assert_eq!(breakdown.len(), 1);
        assert_eq!(breakdown[0]["story_id"].as_str().unwrap(), story_id);
        // Generation spend was recorded against the story
        assert_ne!(breakdown[0]["generation_cost_usd"], "0");
    }
}
