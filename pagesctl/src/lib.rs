//! # pagesctl: The Infinite Pages Control Layer
//!
//! `pagesctl` is the backend for an AI-assisted story generation platform.
//! It exposes a RESTful API for creating stories and chapters (generated via
//! the Anthropic Messages API), manages a per-user credit ledger for
//! metering generation, and serves creator earnings, usage analytics, and
//! error-monitoring endpoints.
//!
//! ## Overview
//!
//! A generation request flows through a single pipeline: the mode-specific
//! form validator, a content moderation pre-scan, a credit estimate checked
//! against the user's balance, a draft row, the provider call (behind an
//! in-memory response cache and a generation limiter), a typed parse of the
//! returned foundation, and finally one transaction that persists the
//! result, deducts the actual cost with a conditional update, appends a
//! generation log row, and refreshes the story-fact cache.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer and uses PostgreSQL for all persistence. It can run with
//! an embedded PostgreSQL instance (useful for development) or an external
//! database (recommended for production).
//!
//! The **API layer** ([`api`]) exposes the management surface under `/api`
//! and native authentication under `/authentication`. The **authentication
//! layer** ([`auth`]) resolves API keys, JWT session cookies, and trusted
//! proxy headers into a [`api::models::users::CurrentUser`]. The **database
//! layer** ([`db`]) uses the repository pattern; each table has a
//! repository that encapsulates its queries. The **generation layer**
//! ([`generation`]) orchestrates the billable pipeline on top of the
//! [`llm`] client wrapper.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use pagesctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = pagesctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     pagesctl::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
mod crypto;
pub mod db;
pub mod errors;
pub mod generation;
pub mod limits;
pub mod llm;
pub mod moderation;
mod openapi;
pub mod pricing;
mod request_logging;
pub mod telemetry;
pub mod types;
pub mod validation;

#[cfg(test)]
pub mod test_utils;

use crate::{
    auth::password,
    db::handlers::{Profiles, Users},
    db::models::users::UserCreateDBRequest,
    limits::Limiters,
    llm::AnthropicClient,
    moderation::ModerationFilter,
    openapi::ApiDoc,
};
use api::models::users::SubscriptionTier;
use axum::{
    Router,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{ChapterId, StoryId, UserId};

/// Application state shared across all request handlers.
///
/// Holds the database pool, configuration, the generation client (with its
/// response cache), the moderation filter, and the generation limiters.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub llm: AnthropicClient,
    pub moderation: ModerationFilter,
    pub limiters: Limiters,
}

impl AppState {
    /// Build the state (LLM client, moderation filter, limiters) from
    /// configuration.
    pub fn from_config(db: PgPool, config: Config) -> errors::Result<Self> {
        let llm = AnthropicClient::new(config.anthropic.clone(), &config.cache)?;
        let moderation = config.moderation.to_filter();
        let limiters = Limiters::new(&config.limits.generation);

        Ok(AppState::builder()
            .db(db)
            .config(config)
            .llm(llm)
            .moderation(moderation)
            .limiters(limiters)
            .build())
    }
}

/// Get the pagesctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: creates the admin account (with an admin-tier profile) on
/// first startup, or updates the password on later startups when one is
/// configured.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(config: &Config, db: &PgPool) -> anyhow::Result<UserId> {
    let password_hash = match config.admin_password.as_deref() {
        Some(pwd) => Some(password::hash_string(pwd).map_err(|e| anyhow::anyhow!("Failed to hash admin password: {e}"))?),
        None => None,
    };

    let mut tx = db.begin().await?;
    let mut user_repo = Users::new(&mut tx);

    if let Some(existing) = user_repo.get_by_email(&config.admin_email).await? {
        if let Some(hash) = password_hash {
            user_repo.set_password_hash(existing.id, &hash).await?;
        }
        tx.commit().await?;
        return Ok(existing.id);
    }

    let user = user_repo
        .create(&UserCreateDBRequest {
            email: config.admin_email.clone(),
            display_name: Some("Administrator".to_string()),
            is_admin: true,
            auth_source: "system".to_string(),
            password_hash,
        })
        .await?;

    let mut profiles_repo = Profiles::new(&mut tx);
    profiles_repo
        .create_default(user.id, SubscriptionTier::Admin, config.credits.initial_balance)
        .await?;

    tx.commit().await?;
    info!("Created initial admin user {}", config.admin_email);
    Ok(user.id)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.security.cors;
    let wildcard = cors_config.allowed_origins.iter().any(|o| o == "*");

    let mut cors = if wildcard {
        CorsLayer::new().allow_origin(tower_http::cors::Any)
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            origins.push(origin.parse::<HeaderValue>()?);
        }
        CorsLayer::new().allow_origin(origins)
    };

    // Credentials cannot be combined with a wildcard origin
    if cors_config.allow_credentials && !wildcard {
        cors = cors.allow_credentials(true);
    }

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    use api::handlers;

    // Authentication routes at root level
    let auth_routes = Router::new()
        .route("/authentication/register", post(handlers::auth::register))
        .route("/authentication/login", post(handlers::auth::login))
        .route("/authentication/logout", post(handlers::auth::logout))
        .with_state(state.clone());

    // Management API under /api
    let api_routes = Router::new()
        .route("/config", get(handlers::config::get_config))
        // Account self-service
        .route("/users/me", get(handlers::users::get_me))
        .route("/users/me/api-keys", get(handlers::api_keys::list_api_keys))
        .route("/users/me/api-keys", post(handlers::api_keys::create_api_key))
        .route("/users/me/api-keys/{id}", delete(handlers::api_keys::delete_api_key))
        .route("/users/{id}/tier", patch(handlers::users::update_tier))
        // Stories and generation
        .route("/stories", get(handlers::stories::list_stories))
        .route("/stories", post(handlers::stories::create_story))
        .route("/stories/{id}", get(handlers::stories::get_story))
        .route("/stories/{id}", patch(handlers::stories::update_story))
        .route("/stories/{id}/chapters", get(handlers::chapters::list_chapters))
        .route("/stories/{id}/chapters", post(handlers::chapters::create_chapter))
        .route("/stories/{id}/chapters/{number}", get(handlers::chapters::get_chapter))
        .route(
            "/stories/{id}/universe/setup",
            get(handlers::universe::get_setup)
                .post(handlers::universe::create_setup)
                .patch(handlers::universe::update_setup),
        )
        // Monetization and analytics
        .route("/creators/earnings", get(handlers::creators::get_earnings))
        .route("/credits/balance", get(handlers::credits::get_balance))
        .route("/credits/grants", post(handlers::credits::grant_credits))
        .route("/analytics/usage", get(handlers::analytics::get_usage))
        // Error monitoring
        .route("/errors", post(handlers::error_reports::report_error))
        .route("/admin/errors", get(handlers::error_reports::list_error_reports))
        .route("/admin/errors/{id}", patch(handlers::error_reports::resolve_error_report))
        .with_state(state.clone());

    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(auth_routes)
        .nest("/api", api_routes)
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()));

    // Request logging into the request_logs table
    if state.config.enable_request_logging {
        router = router.layer(from_fn_with_state(state.clone(), request_logging::log_requests));
    }

    // CORS from config
    router = router.layer(create_cors_layer(&state.config)?);

    // Prometheus metrics
    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    // Tracing
    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects the database, runs
///    migrations, seeds the admin user, and builds the router
/// 2. **Serve**: [`Application::serve`] binds a TCP port and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
    #[cfg(feature = "embedded-db")]
    embedded_db: Option<db::embedded::EmbeddedDatabase>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        tracing::debug!("Starting control layer with configuration: {:#?}", config);

        #[cfg(feature = "embedded-db")]
        let mut embedded: Option<db::embedded::EmbeddedDatabase> = None;

        let database_url = match &config.database {
            config::DatabaseConfig::Embedded { data_dir, persistent } => {
                info!("Starting with embedded database (persistent: {})", persistent);
                if !persistent {
                    info!("persistent=false: database will be ephemeral and data will be lost on shutdown");
                }
                #[cfg(feature = "embedded-db")]
                {
                    let embedded_db = db::embedded::EmbeddedDatabase::start(data_dir.clone(), *persistent).await?;
                    let url = embedded_db.connection_string().to_string();
                    embedded = Some(embedded_db);
                    url
                }
                #[cfg(not(feature = "embedded-db"))]
                {
                    let _ = (data_dir, persistent);
                    anyhow::bail!(
                        "Embedded database is configured but the feature is not enabled. \
                         Rebuild with --features embedded-db to use embedded database."
                    );
                }
            }
            config::DatabaseConfig::External { url } => {
                info!("Using external database");
                url.clone()
            }
        };

        let pool = PgPool::connect(&database_url).await?;

        let app = Self::new_with_pool(config, pool).await?;

        #[cfg(feature = "embedded-db")]
        let app = Application {
            embedded_db: embedded,
            ..app
        };

        Ok(app)
    }

    /// Create an application on an existing pool (used by tests).
    pub async fn new_with_pool(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        migrator().run(&pool).await?;

        create_initial_admin_user(&config, &pool).await?;

        let app_state = AppState::from_config(pool.clone(), config.clone())?;
        let router = build_router(&app_state)?;

        Ok(Self {
            router,
            config,
            pool,
            #[cfg(feature = "embedded-db")]
            embedded_db: None,
        })
    }

    /// Convert the application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Control layer listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        #[cfg(feature = "embedded-db")]
        if let Some(embedded_db) = self.embedded_db {
            info!("Shutting down embedded database...");
            embedded_db.stop().await?;
        }

        Ok(())
    }
}
