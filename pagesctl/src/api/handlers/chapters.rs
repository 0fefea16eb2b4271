//! HTTP handlers for chapter endpoints.

use crate::{
    AppState,
    api::models::{
        chapters::{ChapterCreateRequest, ChapterCreateResponse, ChapterResponse},
        users::CurrentUser,
    },
    db::handlers::Chapters,
    errors::{Error, Result},
    generation::dispatcher,
    types::StoryId,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use super::stories::fetch_owned_story;

/// Generate the next chapter of a story
#[utoipa::path(
    post,
    path = "/stories/{id}/chapters",
    tag = "chapters",
    summary = "Generate the next chapter",
    description = "Generate the next chapter against the story's foundation and cached facts",
    params(("id" = String, Path, description = "Story ID")),
    request_body = ChapterCreateRequest,
    responses(
        (status = 201, description = "Chapter generated", body = ChapterCreateResponse),
        (status = 400, description = "No foundation yet, published story, or insufficient credits"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Story not found"),
        (status = 429, description = "Generation rate limit exceeded"),
        (status = 503, description = "Generation service unavailable"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_chapter(
    State(state): State<AppState>,
    Path(id): Path<StoryId>,
    current_user: CurrentUser,
    Json(request): Json<ChapterCreateRequest>,
) -> Result<(StatusCode, Json<ChapterCreateResponse>)> {
    let story = fetch_owned_story(&state, &current_user, id).await?;

    let outcome = dispatcher::generate_chapter(&state, current_user.id, &story, &request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ChapterCreateResponse {
            chapter: ChapterResponse::from(outcome.chapter),
            generation: outcome.meta,
        }),
    ))
}

/// List a story's chapters
#[utoipa::path(
    get,
    path = "/stories/{id}/chapters",
    tag = "chapters",
    summary = "List chapters",
    params(("id" = String, Path, description = "Story ID")),
    responses(
        (status = 200, description = "Chapters ordered by chapter number", body = Vec<ChapterResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Story not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_chapters(
    State(state): State<AppState>,
    Path(id): Path<StoryId>,
    current_user: CurrentUser,
) -> Result<Json<Vec<ChapterResponse>>> {
    let story = fetch_owned_story(&state, &current_user, id).await?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Chapters::new(&mut conn);
    let chapters = repo.list_for_story(story.id).await?;

    Ok(Json(chapters.into_iter().map(ChapterResponse::from).collect()))
}

/// Get one chapter by number
#[utoipa::path(
    get,
    path = "/stories/{id}/chapters/{number}",
    tag = "chapters",
    summary = "Get a chapter",
    params(
        ("id" = String, Path, description = "Story ID"),
        ("number" = i64, Path, description = "Chapter number"),
    ),
    responses(
        (status = 200, description = "Chapter", body = ChapterResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Story or chapter not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_chapter(
    State(state): State<AppState>,
    Path((id, number)): Path<(StoryId, i64)>,
    current_user: CurrentUser,
) -> Result<Json<ChapterResponse>> {
    let story = fetch_owned_story(&state, &current_user, id).await?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Chapters::new(&mut conn);

    let chapter = repo.get_by_number(story.id, number).await?.ok_or_else(|| Error::NotFound {
        resource: "Chapter".to_string(),
        id: format!("{id}/{number}"),
    })?;

    Ok(Json(ChapterResponse::from(chapter)))
}
