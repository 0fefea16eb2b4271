//! HTTP handlers for native authentication.

use crate::{
    AppState,
    api::models::users::{CurrentUser, LoginRequest, RegisterRequest, SubscriptionTier, UserResponse},
    auth::{password, session},
    db::handlers::{Profiles, Users},
    db::models::users::UserCreateDBRequest,
    errors::{Error, Result},
};
use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{AppendHeaders, IntoResponse, Json},
};

const MIN_PASSWORD_LENGTH: usize = 8;

fn ensure_native_auth(state: &AppState) -> Result<()> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }
    Ok(())
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/authentication/register",
    tag = "authentication",
    summary = "Register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid email/password, or native auth disabled"),
        (status = 409, description = "Email already registered"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    ensure_native_auth(&state)?;

    if !request.email.contains('@') {
        return Err(Error::BadRequest {
            message: "A valid email address is required".to_string(),
        });
    }
    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::BadRequest {
            message: format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        });
    }

    let password_hash = password::hash_string(&request.password)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let user = {
        let mut users_repo = Users::new(&mut tx);
        users_repo
            .create(&UserCreateDBRequest {
                email: request.email,
                display_name: request.display_name,
                is_admin: false,
                auth_source: "native".to_string(),
                password_hash: Some(password_hash),
            })
            .await?
    };

    let profile = {
        let mut profiles_repo = Profiles::new(&mut tx);
        profiles_repo
            .create_default(user.id, SubscriptionTier::Free, state.config.credits.initial_balance)
            .await?
    };

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(UserResponse::from_parts(user, profile))))
}

/// Log in, receiving a session cookie
#[utoipa::path(
    post,
    path = "/authentication/login",
    tag = "authentication",
    summary = "Log in",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session established", body = CurrentUser),
        (status = 401, description = "Invalid email or password"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<impl IntoResponse> {
    ensure_native_auth(&state)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut users_repo = Users::new(&mut conn);

    let user = users_repo.get_with_profile_by_email(&request.email).await?;

    // Same error for unknown email and wrong password
    let invalid = || Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    };

    let user = user.ok_or_else(invalid)?;
    let hash = user.password_hash.clone().ok_or_else(invalid)?;
    if !password::verify_string(&request.password, &hash)? {
        return Err(invalid());
    }

    let current_user = CurrentUser::from(user);
    let token = session::create_session_token(&current_user, &state.config)?;

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        state.config.auth.native.session.cookie_name,
        token,
        state.config.auth.security.jwt_expiry.as_secs()
    );

    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), Json(current_user)))
}

/// Log out, clearing the session cookie
#[utoipa::path(
    post,
    path = "/authentication/logout",
    tag = "authentication",
    summary = "Log out",
    responses((status = 204, description = "Session cleared"))
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        state.config.auth.native.session.cookie_name
    );

    (StatusCode::NO_CONTENT, AppendHeaders([(header::SET_COOKIE, cookie)]))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::*;
    use serde_json::json;
    use sqlx::PgPool;

    // Test: register -> login -> session cookie authenticates /api requests
    #[sqlx::test]
    #[test_log::test]
    async fn test_register_login_session_flow(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let response = app
            .post("/authentication/register")
            .json(&json!({"email": "writer@example.com", "password": "correct-horse-battery", "display_name": "Writer"}))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let user: serde_json::Value = response.json();
        assert_eq!(user["email"], "writer@example.com");
        assert_eq!(user["subscription_tier"], "free");
        let balance: rust_decimal::Decimal = user["credit_balance"].as_str().unwrap().parse().unwrap();
        assert_eq!(balance, default_test_balance());

        let login = app
            .post("/authentication/login")
            .json(&json!({"email": "writer@example.com", "password": "correct-horse-battery"}))
            .await;
        login.assert_status_ok();
        let cookie = login.cookie("pagesctl_session");

        let me = app.get("/api/credits/balance").add_cookie(cookie).await;
        me.assert_status_ok();
    }

    // Test: wrong password and unknown email both yield the same 401
    #[sqlx::test]
    #[test_log::test]
    async fn test_login_rejects_bad_credentials(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        app.post("/authentication/register")
            .json(&json!({"email": "writer@example.com", "password": "correct-horse-battery"}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let wrong_password = app
            .post("/authentication/login")
            .json(&json!({"email": "writer@example.com", "password": "wrong"}))
            .await;
        wrong_password.assert_status_unauthorized();

        let unknown_email = app
            .post("/authentication/login")
            .json(&json!({"email": "nobody@example.com", "password": "whatever1"}))
            .await;
        unknown_email.assert_status_unauthorized();

        let a: serde_json::Value = wrong_password.json();
        let b: serde_json::Value = unknown_email.json();
        assert_eq!(a["error"], b["error"]);
    }

    // Test: duplicate registration conflicts
    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_email_conflicts(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let body = json!({"email": "writer@example.com", "password": "correct-horse-battery"});
        app.post("/authentication/register").json(&body).await.assert_status(axum::http::StatusCode::CREATED);

        let response = app.post("/authentication/register").json(&body).await;
        response.assert_status(axum::http::StatusCode::CONFLICT);
        let error: serde_json::Value = response.json();
        assert!(error["error"].as_str().unwrap().contains("already exists"));
    }

    // Test: password length is enforced
    #[sqlx::test]
    #[test_log::test]
    async fn test_short_password_rejected(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        app.post("/authentication/register")
            .json(&json!({"email": "writer@example.com", "password": "short"}))
            .await
            .assert_status_bad_request();
    }
}
