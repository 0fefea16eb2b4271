//! HTTP handlers for user self-service and admin tier management.

use crate::{
    AppState,
    api::models::users::{CurrentUser, TierUpdateRequest, UserResponse},
    auth::permissions,
    db::handlers::{Profiles, Users},
    errors::{Error, Result},
    types::UserId,
};
use axum::{
    extract::{Path, State},
    response::Json,
};

/// The authenticated user's account
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    summary = "Get the current account",
    responses(
        (status = 200, description = "Account with profile", body = UserResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_me(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let user = {
        let mut users_repo = Users::new(&mut conn);
        users_repo.get_by_id(current_user.id).await?.ok_or_else(|| Error::NotFound {
            resource: "User".to_string(),
            id: current_user.id.to_string(),
        })?
    };

    let profile = {
        let mut profiles_repo = Profiles::new(&mut conn);
        profiles_repo.get(current_user.id).await?.ok_or_else(|| Error::NotFound {
            resource: "Profile".to_string(),
            id: current_user.id.to_string(),
        })?
    };

    Ok(Json(UserResponse::from_parts(user, profile)))
}

/// Change a user's subscription tier (admin only)
#[utoipa::path(
    patch,
    path = "/users/{id}/tier",
    tag = "users",
    summary = "Update a user's tier",
    params(("id" = String, Path, description = "User ID")),
    request_body = TierUpdateRequest,
    responses(
        (status = 200, description = "Updated account", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin required"),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_tier(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    current_user: CurrentUser,
    Json(request): Json<TierUpdateRequest>,
) -> Result<Json<UserResponse>> {
    permissions::require_admin(&current_user)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let user = {
        let mut users_repo = Users::new(&mut conn);
        users_repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
            resource: "User".to_string(),
            id: id.to_string(),
        })?
    };

    let profile = {
        let mut profiles_repo = Profiles::new(&mut conn);
        profiles_repo.set_tier(id, request.subscription_tier, request.is_creator).await?
    };

    Ok(Json(UserResponse::from_parts(user, profile)))
}

#[cfg(test)]
mod tests {
    use crate::api::models::users::SubscriptionTier;
    use crate::test_utils::*;
    use serde_json::json;
    use sqlx::PgPool;

    // Test: /users/me joins user and profile
    #[sqlx::test]
    #[test_log::test]
    async fn test_get_me(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, SubscriptionTier::Premium, true, false).await;

        let body: serde_json::Value = app
            .get("/api/users/me")
            .add_header(PROXY_AUTH_HEADER, &user.email)
            .await
            .json();

        assert_eq!(body["email"], user.email);
        assert_eq!(body["subscription_tier"], "premium");
        assert_eq!(body["is_creator"], true);
    }

    // Test: tier update is admin-only and takes effect
    #[sqlx::test]
    #[test_log::test]
    async fn test_tier_update(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, SubscriptionTier::Admin, false, true).await;
        let user = create_test_user(&pool, SubscriptionTier::Free, false, false).await;

        app.patch(&format!("/api/users/{}/tier", user.id))
            .add_header(PROXY_AUTH_HEADER, &user.email)
            .json(&json!({"subscription_tier": "premium"}))
            .await
            .assert_status_forbidden();

        let updated: serde_json::Value = app
            .patch(&format!("/api/users/{}/tier", user.id))
            .add_header(PROXY_AUTH_HEADER, &admin.email)
            .json(&json!({"subscription_tier": "premium", "is_creator": true}))
            .await
            .json();
        assert_eq!(updated["subscription_tier"], "premium");
        assert_eq!(updated["is_creator"], true);

        // The change is visible to the user
        let me: serde_json::Value = app
            .get("/api/users/me")
            .add_header(PROXY_AUTH_HEADER, &user.email)
            .await
            .json();
        assert_eq!(me["subscription_tier"], "premium");
    }
}
