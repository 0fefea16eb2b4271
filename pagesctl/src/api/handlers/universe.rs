//! HTTP handlers for universe setup: reading, replacing, and patching a
//! story's typed foundation.

use crate::{
    AppState,
    api::models::{foundation, foundation::Foundation, stories::StoryStatus, users::CurrentUser},
    db::{
        handlers::{Repository, Stories, StoryFacts},
        models::stories::StoryUpdateDBRequest,
    },
    errors::{Error, Result},
    generation::facts,
    types::StoryId,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use super::stories::fetch_owned_story;

/// Read the universe setup
#[utoipa::path(
    get,
    path = "/stories/{id}/universe/setup",
    tag = "universe",
    summary = "Get the story foundation",
    params(("id" = String, Path, description = "Story ID")),
    responses(
        (status = 200, description = "The typed foundation", body = Foundation),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Story not found or no foundation yet"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_setup(
    State(state): State<AppState>,
    Path(id): Path<StoryId>,
    current_user: CurrentUser,
) -> Result<Json<Foundation>> {
    let story = fetch_owned_story(&state, &current_user, id).await?;

    let stored = story.foundation.ok_or_else(|| Error::NotFound {
        resource: "Universe setup".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(Foundation::from_stored(&stored)?))
}

/// Replace the universe setup
#[utoipa::path(
    post,
    path = "/stories/{id}/universe/setup",
    tag = "universe",
    summary = "Set the story foundation",
    description = "Replace the foundation with a client-supplied one. The body must match the typed foundation contract and the story's mode.",
    params(("id" = String, Path, description = "Story ID")),
    request_body = Foundation,
    responses(
        (status = 200, description = "Foundation stored", body = Foundation),
        (status = 400, description = "Foundation does not match the contract or the story's mode"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Story not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_setup(
    State(state): State<AppState>,
    Path(id): Path<StoryId>,
    current_user: CurrentUser,
    Json(new_foundation): Json<Foundation>,
) -> Result<(StatusCode, Json<Foundation>)> {
    let story = fetch_owned_story(&state, &current_user, id).await?;
    new_foundation.ensure_mode(story.mode)?;

    store_foundation(&state, id, story.status, &new_foundation).await?;

    Ok((StatusCode::OK, Json(new_foundation)))
}

/// Patch the universe setup
#[utoipa::path(
    patch,
    path = "/stories/{id}/universe/setup",
    tag = "universe",
    summary = "Patch the story foundation",
    description = "Apply a merge patch to the stored foundation. The merged result is re-validated through the typed contract.",
    params(("id" = String, Path, description = "Story ID")),
    responses(
        (status = 200, description = "Patched foundation", body = Foundation),
        (status = 400, description = "Patched foundation no longer matches the contract"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Story not found or no foundation yet"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_setup(
    State(state): State<AppState>,
    Path(id): Path<StoryId>,
    current_user: CurrentUser,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<Foundation>> {
    let story = fetch_owned_story(&state, &current_user, id).await?;

    let stored = story.foundation.ok_or_else(|| Error::NotFound {
        resource: "Universe setup".to_string(),
        id: id.to_string(),
    })?;

    let patched = foundation::merge_patch(&stored, &patch)?;
    patched.ensure_mode(story.mode)?;

    store_foundation(&state, id, story.status, &patched).await?;

    Ok(Json(patched))
}

/// Persist a foundation and refresh the fact cache from it. A draft story
/// acquiring its first foundation moves to in_progress.
async fn store_foundation(state: &AppState, id: StoryId, status: StoryStatus, new_foundation: &Foundation) -> Result<()> {
    let json = new_foundation.to_json()?;
    let next_status = (status == StoryStatus::Draft).then_some(StoryStatus::InProgress);

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    {
        let mut stories_repo = Stories::new(&mut tx);
        stories_repo
            .update(
                id,
                &StoryUpdateDBRequest {
                    title: None,
                    genre: None,
                    status: next_status,
                    foundation: Some(json),
                },
            )
            .await?;
    }

    {
        let mut facts_repo = StoryFacts::new(&mut tx);
        facts_repo.upsert_many(&facts::extract_from_foundation(id, new_foundation)).await?;
    }

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::api::models::users::SubscriptionTier;
    use crate::test_utils::*;
    use serde_json::json;
    use sqlx::PgPool;

    async fn create_story(app: &axum_test::TestServer, email: &str) -> String {
        let created: serde_json::Value = app
            .post("/api/stories")
            .add_header(PROXY_AUTH_HEADER, email)
            .json(&story_create_body())
            .await
            .json();
        created["story"]["id"].as_str().unwrap().to_string()
    }

    // Test: GET returns the generated foundation; PATCH merges and GET
    // reflects the change
    #[sqlx::test]
    #[test_log::test]
    async fn test_get_and_patch_setup(pool: PgPool) {
        let llm = mock_llm_server(story_foundation_text(), 100, 100).await;
        let app = create_test_app_with_llm(pool.clone(), &llm.uri()).await;
        let user = create_test_user(&pool, SubscriptionTier::Free, false, false).await;
        let story_id = create_story(&app, &user.email).await;

        let setup: serde_json::Value = app
            .get(&format!("/api/stories/{story_id}/universe/setup"))
            .add_header(PROXY_AUTH_HEADER, &user.email)
            .await
            .json();
        assert_eq!(setup["type"], "story");

        let response = app
            .patch(&format!("/api/stories/{story_id}/universe/setup"))
            .add_header(PROXY_AUTH_HEADER, &user.email)
            .json(&json!({"setting": {"atmosphere": "serene"}}))
            .await;
        response.assert_status_ok();

        let after: serde_json::Value = app
            .get(&format!("/api/stories/{story_id}/universe/setup"))
            .add_header(PROXY_AUTH_HEADER, &user.email)
            .await
            .json();
        assert_eq!(after["setting"]["atmosphere"], "serene");
    }

    // Test: POST validates the tagged union and the mode match
    #[sqlx::test]
    #[test_log::test]
    async fn test_post_setup_validates_contract(pool: PgPool) {
        let llm = mock_llm_server(story_foundation_text(), 100, 100).await;
        let app = create_test_app_with_llm(pool.clone(), &llm.uri()).await;
        let user = create_test_user(&pool, SubscriptionTier::Free, false, false).await;
        let story_id = create_story(&app, &user.email).await;

        // A novel foundation on a story-mode story is rejected
        let novel_foundation = json!({
            "type": "novel",
            "characters": [{"name": "Ada", "role": "hero"}],
            "setting": {"world": "somewhere"},
            "plot_outline": ["a"],
            "chapter_plan": [{"number": 1, "title": "One"}]
        });
        let response = app
            .post(&format!("/api/stories/{story_id}/universe/setup"))
            .add_header(PROXY_AUTH_HEADER, &user.email)
            .json(&novel_foundation)
            .await;
        response.assert_status_bad_request();

        // A matching story foundation is accepted
        let story_foundation = json!({
            "type": "story",
            "characters": [{"name": "Bel", "role": "rival"}],
            "setting": {"world": "elsewhere"},
            "plot_outline": ["b"]
        });
        app.post(&format!("/api/stories/{story_id}/universe/setup"))
            .add_header(PROXY_AUTH_HEADER, &user.email)
            .json(&story_foundation)
            .await
            .assert_status_ok();

        let after: serde_json::Value = app
            .get(&format!("/api/stories/{story_id}/universe/setup"))
            .add_header(PROXY_AUTH_HEADER, &user.email)
            .await
            .json();
        assert_eq!(after["characters"][0]["name"], "Bel");
    }

    // Test: a patch that breaks the contract is a 400 and changes nothing
    #[sqlx::test]
    #[test_log::test]
    async fn test_breaking_patch_rejected(pool: PgPool) {
        let llm = mock_llm_server(story_foundation_text(), 100, 100).await;
        let app = create_test_app_with_llm(pool.clone(), &llm.uri()).await;
        let user = create_test_user(&pool, SubscriptionTier::Free, false, false).await;
        let story_id = create_story(&app, &user.email).await;

        app.patch(&format!("/api/stories/{story_id}/universe/setup"))
            .add_header(PROXY_AUTH_HEADER, &user.email)
            .json(&json!({"characters": "nobody"}))
            .await
            .assert_status_bad_request();

        let after: serde_json::Value = app
            .get(&format!("/api/stories/{story_id}/universe/setup"))
            .add_header(PROXY_AUTH_HEADER, &user.email)
            .await
            .json();
        assert!(after["characters"].is_array());
    }
}
