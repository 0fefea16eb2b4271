//! OpenAPI documentation configuration.
//!
//! The rendered docs are served at `/api/docs` via Scalar.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api::handlers;
use crate::api::models;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "BearerAuth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
            components.add_security_scheme(
                "CookieAuth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("pagesctl_session"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Infinite Pages Control Layer",
        description = "Backend for AI-assisted story generation: story/chapter CRUD, credit metering, creator analytics, and error monitoring."
    ),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::config::get_config,
        handlers::users::get_me,
        handlers::users::update_tier,
        handlers::api_keys::create_api_key,
        handlers::api_keys::list_api_keys,
        handlers::api_keys::delete_api_key,
        handlers::stories::create_story,
        handlers::stories::list_stories,
        handlers::stories::get_story,
        handlers::stories::update_story,
        handlers::chapters::create_chapter,
        handlers::chapters::list_chapters,
        handlers::chapters::get_chapter,
        handlers::universe::get_setup,
        handlers::universe::create_setup,
        handlers::universe::update_setup,
        handlers::creators::get_earnings,
        handlers::credits::get_balance,
        handlers::credits::grant_credits,
        handlers::analytics::get_usage,
        handlers::error_reports::report_error,
        handlers::error_reports::list_error_reports,
        handlers::error_reports::resolve_error_report,
    ),
    components(schemas(
        models::users::CurrentUser,
        models::users::UserResponse,
        models::users::RegisterRequest,
        models::users::LoginRequest,
        models::users::TierUpdateRequest,
        models::users::SubscriptionTier,
        models::foundation::Foundation,
        models::foundation::Character,
        models::foundation::Setting,
        models::foundation::ChapterPlan,
        models::foundation::Branch,
        models::foundation::Ending,
        models::stories::StoryCreateRequest,
        models::stories::StoryCreateResponse,
        models::stories::StoryUpdateRequest,
        models::stories::StoryResponse,
        models::stories::StoryStatus,
        models::stories::GenerationMeta,
        models::stories::Progress,
        models::chapters::ChapterCreateRequest,
        models::chapters::ChapterCreateResponse,
        models::chapters::ChapterResponse,
        models::creators::EarningsResponse,
        models::creators::StoryEarnings,
        models::credits::BalanceResponse,
        models::credits::CreditGrantRequest,
        models::credits::CreditGrantResponse,
        models::analytics::UsageResponse,
        models::analytics::UsageTotals,
        models::analytics::OperationAggregate,
        models::analytics::DailyAggregate,
        models::error_reports::ErrorReportCreate,
        models::error_reports::ErrorReportResponse,
        handlers::api_keys::ApiKeyCreate,
        handlers::api_keys::ApiKeyResponse,
        handlers::config::PublicConfig,
        handlers::config::ContentLimits,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "authentication", description = "Register, login, logout"),
        (name = "stories", description = "Story creation and management"),
        (name = "chapters", description = "Chapter generation"),
        (name = "universe", description = "Foundation management"),
        (name = "creators", description = "Creator earnings"),
        (name = "credits", description = "Credit balance and grants"),
        (name = "analytics", description = "Usage analytics"),
        (name = "errors", description = "Error monitoring"),
        (name = "users", description = "Accounts and API keys"),
        (name = "config", description = "Public configuration"),
    )
)]
pub struct ApiDoc;
