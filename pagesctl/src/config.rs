//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The configuration file path defaults to `config.yaml` but can
//! be specified via `-f` flag or `PAGESCTL_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Sources are merged in order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `PAGESCTL_`
//! 3. **DATABASE_URL** - Special case: overrides `database.url` if set
//!
//! For nested values, use double underscores: `PAGESCTL_DATABASE__TYPE=external`
//! sets the `database.type` field.

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::errors::Error;
use crate::moderation::{ModerationFilter, Severity, Thresholds};

/// Simple CLI args - just for specifying the config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "PAGESCTL_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// The root structure loaded from YAML and environment variables. All fields
/// have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Base URL where the frontend is served, used in public config metadata
    pub site_url: String,
    /// Database configuration - either embedded or external PostgreSQL
    pub database: DatabaseConfig,
    /// Email address for the initial admin user (created on first startup)
    pub admin_email: String,
    /// Password for the initial admin user (optional, can be set via environment)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    /// Secret key for JWT signing (required when native auth is enabled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    /// Generation provider (Anthropic Messages API) configuration
    pub anthropic: AnthropicConfig,
    /// Credit system configuration
    pub credits: CreditsConfig,
    /// LLM response cache configuration
    pub cache: CacheConfig,
    /// Resource limits for generation traffic
    pub limits: LimitsConfig,
    /// Content moderation thresholds
    pub moderation: ModerationConfig,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// Enable Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Enable request logging to the `request_logs` table
    pub enable_request_logging: bool,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            site_url: "http://localhost:3000".to_string(),
            database: DatabaseConfig::default(),
            admin_email: "admin@localhost".to_string(),
            admin_password: None,
            secret_key: None,
            anthropic: AnthropicConfig::default(),
            credits: CreditsConfig::default(),
            cache: CacheConfig::default(),
            limits: LimitsConfig::default(),
            moderation: ModerationConfig::default(),
            auth: AuthConfig::default(),
            enable_metrics: false,
            enable_request_logging: true,
            enable_otel_export: false,
        }
    }
}

/// Database configuration - embedded PostgreSQL for development or an
/// external database for production.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DatabaseConfig {
    /// Embedded PostgreSQL instance (requires the `embedded-db` feature)
    Embedded {
        /// Data directory; a temp directory when unset
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data_dir: Option<PathBuf>,
        /// Keep data across restarts
        #[serde(default)]
        persistent: bool,
    },
    /// External PostgreSQL database
    External { url: String },
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig::Embedded {
            data_dir: None,
            persistent: false,
        }
    }
}

/// Anthropic Messages API client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnthropicConfig {
    /// API key; read from PAGESCTL_ANTHROPIC__API_KEY in production
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL of the API (overridable for tests and proxies)
    pub base_url: Url,
    /// Fixed model identifier used for all generations
    pub model: String,
    /// anthropic-version header value
    pub version: String,
    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Url::parse("https://api.anthropic.com").expect("static URL"),
            model: "claude-3-5-sonnet-20241022".to_string(),
            version: "2023-06-01".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Credit system configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreditsConfig {
    /// Balance granted to newly registered users
    pub initial_balance: Decimal,
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self {
            initial_balance: Decimal::new(50, 0),
        }
    }
}

/// LLM response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Maximum number of cached completions
    pub capacity: u64,
    /// Time-to-live for cached completions
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 1024,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Resource limits for protecting system capacity.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    pub generation: GenerationLimitsConfig,
}

/// Limits applied to generation endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationLimitsConfig {
    /// Maximum concurrent generations across all users (0 = unlimited)
    pub max_concurrent: usize,
    /// Maximum requests waiting for a slot (0 = unlimited waiting)
    pub max_waiting: usize,
    /// Maximum seconds to wait for a slot
    pub max_wait_secs: u64,
    /// Maximum generation requests per user per minute (0 = unlimited)
    pub max_per_minute: usize,
}

impl Default for GenerationLimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            max_waiting: 32,
            max_wait_secs: 30,
            max_per_minute: 10,
        }
    }
}

/// Content moderation thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModerationConfig {
    /// Score at which severity becomes Medium
    pub medium_at: u32,
    /// Score at which severity becomes High
    pub high_at: u32,
    /// Severity at or above which user input is blocked
    pub block_threshold: Severity,
    /// Severity at or above which generated output is flagged
    pub flag_threshold: Severity,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            medium_at: 3,
            high_at: 6,
            block_threshold: Severity::High,
            flag_threshold: Severity::Medium,
        }
    }
}

impl ModerationConfig {
    pub fn to_filter(&self) -> ModerationFilter {
        ModerationFilter::new(
            Thresholds {
                medium_at: self.medium_at,
                high_at: self.high_at,
            },
            self.block_threshold,
            self.flag_threshold,
        )
    }
}

/// Authentication configuration for the supported auth methods.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub native: NativeAuthConfig,
    pub proxy_header: ProxyHeaderAuthConfig,
    pub security: SecurityConfig,
}

/// Native (password + JWT session cookie) authentication.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NativeAuthConfig {
    pub enabled: bool,
    pub session: SessionConfig,
}

impl Default for NativeAuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            session: SessionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Name of the session cookie
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "pagesctl_session".to_string(),
        }
    }
}

/// Trusted proxy header authentication (for SSO deployments and tests).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyHeaderAuthConfig {
    pub enabled: bool,
    /// Header carrying the authenticated user's email
    pub header_name: String,
    /// Create unknown users on first sight
    pub auto_create_users: bool,
}

impl Default for ProxyHeaderAuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            header_name: "x-pages-user".to_string(),
            auto_create_users: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// JWT session lifetime
    #[serde(with = "humantime_serde")]
    pub jwt_expiry: Duration,
    pub cors: CorsConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_expiry: Duration::from_secs(24 * 3600),
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins; "*" allows any origin
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
    /// Preflight max-age in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: false,
            max_age: None,
        }
    }
}

impl Config {
    /// Load configuration from the YAML file and environment overrides.
    pub fn load(args: &Args) -> Result<Self, Error> {
        let mut figment = Figment::new().merge(Yaml::file(&args.config)).merge(
            Env::prefixed("PAGESCTL_")
                .split("__")
                .ignore(&["CONFIG"]),
        );

        // DATABASE_URL convenience override
        if let Ok(url) = std::env::var("DATABASE_URL") {
            figment = figment
                .merge(("database.type", "external"))
                .merge(("database.url", url));
        }

        let config: Config = figment.extract().map_err(|e| Error::Internal {
            operation: format!("load configuration: {e}"),
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Check invariants that figment cannot express.
    pub fn validate(&self) -> Result<(), Error> {
        if self.auth.native.enabled && self.secret_key.is_none() {
            return Err(Error::Internal {
                operation: "validate configuration: secret_key is required when native auth is enabled".to_string(),
            });
        }

        if !self.auth.native.enabled && !self.auth.proxy_header.enabled {
            return Err(Error::Internal {
                operation: "validate configuration: at least one authentication method must be enabled".to_string(),
            });
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
