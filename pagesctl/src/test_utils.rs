//! Test utilities for integration testing.

use axum_test::TestServer;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::api::models::users::{SubscriptionTier, UserResponse};
use crate::config::Config;
use crate::db::handlers::{Profiles, Users};
use crate::db::models::users::UserCreateDBRequest;
use crate::types::UserId;
use crate::{AppState, Application};

/// The proxy auth header tests authenticate with.
pub const PROXY_AUTH_HEADER: &str = "x-pages-user";

/// Signup balance used by the test config (the CreditsConfig default).
pub fn default_test_balance() -> Decimal {
    Decimal::new(50, 0)
}

pub fn create_test_config() -> Config {
    let mut config = Config {
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        admin_email: "admin@test.com".to_string(),
        admin_password: None,
        enable_request_logging: false,
        enable_metrics: false,
        ..Default::default()
    };
    config.auth.proxy_header.enabled = true;
    // Deterministic billing in tests: no cross-request cache hits
    config.cache.enabled = false;
    // Window limiting off by default so tests can hammer endpoints
    config.limits.generation.max_per_minute = 0;
    config.anthropic.api_key = Some("test-key".to_string());
    config
}

/// AppState for extractor-level tests that don't need a router.
pub fn create_test_app_state(pool: PgPool) -> AppState {
    let config = create_test_config();
    AppState::from_config(pool, config).expect("failed to build test app state")
}

pub async fn create_test_app(pool: PgPool) -> TestServer {
    let config = create_test_config();
    let app = Application::new_with_pool(config, pool).await.expect("Failed to create application");
    app.into_test_server()
}

/// Test app whose LLM client points at a wiremock server.
pub async fn create_test_app_with_llm(pool: PgPool, llm_base_url: &str) -> TestServer {
    let mut config = create_test_config();
    config.anthropic.base_url = llm_base_url.parse().expect("mock server URL should parse");
    let app = Application::new_with_pool(config, pool).await.expect("Failed to create application");
    app.into_test_server()
}

pub async fn create_test_user(pool: &PgPool, tier: SubscriptionTier, is_creator: bool, is_admin: bool) -> UserResponse {
    let mut tx = pool.begin().await.expect("Failed to begin transaction");

    let email = format!("testuser_{}@example.com", Uuid::new_v4().simple());
    let user = {
        let mut users_repo = Users::new(&mut tx);
        users_repo
            .create(&UserCreateDBRequest {
                email,
                display_name: Some("Test User".to_string()),
                is_admin,
                auth_source: "test".to_string(),
                password_hash: None,
            })
            .await
            .expect("Failed to create test user")
    };

    let profile = {
        let mut profiles_repo = Profiles::new(&mut tx);
        let profile = profiles_repo
            .create_default(user.id, tier, default_test_balance())
            .await
            .expect("Failed to create test profile");
        if is_creator {
            profiles_repo
                .set_tier(user.id, tier, Some(true))
                .await
                .expect("Failed to mark test user as creator")
        } else {
            profile
        }
    };

    tx.commit().await.expect("Failed to commit transaction");

    UserResponse::from_parts(user, profile)
}

pub async fn set_balance(pool: &PgPool, user_id: UserId, balance: Decimal) {
    sqlx::query("UPDATE profiles SET credit_balance = $2 WHERE user_id = $1")
        .bind(user_id)
        .bind(balance)
        .execute(pool)
        .await
        .expect("Failed to set balance");
}

pub async fn get_balance(pool: &PgPool, user_id: UserId) -> Decimal {
    sqlx::query_scalar("SELECT credit_balance FROM profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read balance")
}

/// A valid `POST /api/stories` body for story mode.
pub fn story_create_body() -> serde_json::Value {
    json!({
        "mode": "story",
        "length": "standard",
        "title": "The Clockwork Garden",
        "genre": "fantasy",
        "premise": "A gardener discovers the hedges rearrange themselves at night."
    })
}

/// Completion text carrying a valid story-mode foundation.
pub fn story_foundation_text() -> String {
    json!({
        "type": "story",
        "characters": [
            {"name": "Ada", "role": "protagonist", "description": "a stubborn gardener"},
            {"name": "The Maze", "role": "antagonist", "description": "the garden itself"}
        ],
        "setting": {"world": "a clockwork garden", "atmosphere": "uncanny"},
        "plot_outline": ["The hedges move", "Ada maps the night paths", "The garden bargains"],
        "themes": ["order vs growth"]
    })
    .to_string()
}

/// Mount a Messages API mock returning `text` with the given token usage.
pub async fn mock_llm_server(text: String, input_tokens: i64, output_tokens: i64) -> MockServer {
    let server = MockServer::start().await;
    mount_llm_mock(&server, text, input_tokens, output_tokens, None).await;
    server
}

/// Like [`mock_llm_server`] but asserting an exact number of provider calls.
pub async fn mock_llm_server_with_expect(text: String, input_tokens: i64, output_tokens: i64, expect: u64) -> MockServer {
    let server = MockServer::start().await;
    mount_llm_mock(&server, text, input_tokens, output_tokens, Some(expect)).await;
    server
}

async fn mount_llm_mock(server: &MockServer, text: String, input_tokens: i64, output_tokens: i64, expect: Option<u64>) {
    let body = json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-5-sonnet-20241022",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": input_tokens, "output_tokens": output_tokens}
    });

    let mut mock = Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body));

    if let Some(expect) = expect {
        mock = mock.expect(expect);
    }

    mock.mount(server).await;
}

/// A provider that is down: every call returns an overloaded error.
pub async fn mock_llm_failure_server() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_json(json!({
            "type": "error",
            "error": {"type": "overloaded_error", "message": "Overloaded"}
        })))
        .mount(&server)
        .await;

    server
}
