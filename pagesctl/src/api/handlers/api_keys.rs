//! HTTP handlers for API key self-service.

use crate::{
    AppState,
    api::models::users::CurrentUser,
    crypto,
    db::handlers::ApiKeys,
    errors::{Error, Result},
    types::ApiKeyId,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ApiKeyCreate {
    pub name: String,
}

/// An API key. The secret is only present in the creation response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiKeyResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ApiKeyId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Create an API key
#[utoipa::path(
    post,
    path = "/users/me/api-keys",
    tag = "users",
    summary = "Create an API key",
    description = "Create an API key for the current user. The secret is returned once and cannot be retrieved again.",
    request_body = ApiKeyCreate,
    responses(
        (status = 201, description = "Key created, secret included", body = ApiKeyResponse),
        (status = 400, description = "Bad request - empty name"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_api_key(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ApiKeyCreate>,
) -> Result<(StatusCode, Json<ApiKeyResponse>)> {
    if request.name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "name must not be empty".to_string(),
        });
    }

    let secret = crypto::generate_api_key();

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = ApiKeys::new(&mut conn);
    let key = repo.create(current_user.id, request.name.trim(), &secret).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiKeyResponse {
            id: key.id,
            name: key.name,
            secret: Some(key.secret),
            created_at: key.created_at,
        }),
    ))
}

/// List API keys (secrets redacted)
#[utoipa::path(
    get,
    path = "/users/me/api-keys",
    tag = "users",
    summary = "List API keys",
    responses(
        (status = 200, description = "Keys without secrets", body = Vec<ApiKeyResponse>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_api_keys(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<Vec<ApiKeyResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = ApiKeys::new(&mut conn);
    let keys = repo.list_for_user(current_user.id).await?;

    Ok(Json(
        keys.into_iter()
            .map(|key| ApiKeyResponse {
                id: key.id,
                name: key.name,
                secret: None,
                created_at: key.created_at,
            })
            .collect(),
    ))
}

/// Revoke an API key
#[utoipa::path(
    delete,
    path = "/users/me/api-keys/{id}",
    tag = "users",
    summary = "Revoke an API key",
    params(("id" = String, Path, description = "Key ID")),
    responses(
        (status = 204, description = "Key revoked"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Key not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_api_key(
    State(state): State<AppState>,
    Path(id): Path<ApiKeyId>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = ApiKeys::new(&mut conn);

    if !repo.delete(current_user.id, id).await? {
        return Err(Error::NotFound {
            resource: "API key".to_string(),
            id: id.to_string(),
        });
    }

    Ok(StatusCode::NO_CONTENT)
}
