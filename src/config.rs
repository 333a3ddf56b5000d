use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_SESSION_TTL_SECS: u64 = 8 * 60 * 60;
const MIN_SESSION_TTL_SECS: u64 = 300;
const MAX_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const DEV_DEFAULT_JWT_SECRET: &str = "dev_only_estoque_signing_key_replace_before_going_live_xyz";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// HS256 signing key for session tokens (minimum 32 characters)
    #[validate(length(min = 32), custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// JWT issuer name
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    /// Session lifetime in seconds (5min - 7d)
    #[serde(default = "default_session_ttl_secs")]
    #[validate(range(min = 300, max = 604800))]
    pub session_ttl_secs: u64,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1))]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Default page size for paginated API responses
    #[serde(default = "default_api_page_size")]
    #[validate(range(min = 1))]
    pub api_default_page_size: u64,

    /// Maximum page size allowed for paginated API responses
    #[serde(default = "default_api_max_page_size")]
    #[validate(range(min = 1, max = 1000))]
    pub api_max_page_size: u64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Store name printed on report headers
    #[serde(default = "default_store_name")]
    #[validate(length(min = 1, max = 120))]
    pub store_name: String,

    /// Currency code used when rendering money values
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,

    /// Supervisor created at startup when the employees table is empty
    #[serde(default)]
    pub bootstrap_supervisor_name: Option<String>,
    #[serde(default)]
    pub bootstrap_supervisor_phone: Option<String>,
    #[serde(default)]
    pub bootstrap_supervisor_password: Option<String>,
}

impl AppConfig {
    /// Creates a configuration with defaults for everything but the essentials
    pub fn new(
        database_url: String,
        jwt_secret: String,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            auth_issuer: default_auth_issuer(),
            session_ttl_secs: default_session_ttl_secs(),
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            api_default_page_size: default_api_page_size(),
            api_max_page_size: default_api_max_page_size(),
            event_channel_capacity: default_event_channel_capacity(),
            store_name: default_store_name(),
            currency: default_currency(),
            bootstrap_supervisor_name: None,
            bootstrap_supervisor_phone: None,
            bootstrap_supervisor_password: None,
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Returns the bootstrap supervisor as `(name, phone, password)` when all three are set
    pub fn bootstrap_supervisor(&self) -> Option<(&str, &str, &str)> {
        match (
            self.bootstrap_supervisor_name.as_deref(),
            self.bootstrap_supervisor_phone.as_deref(),
            self.bootstrap_supervisor_password.as_deref(),
        ) {
            (Some(name), Some(phone), Some(password))
                if !name.trim().is_empty() && !phone.trim().is_empty() && !password.is_empty() =>
            {
                Some((name, phone, password))
            }
            _ => None,
        }
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if !self.is_development() && self.jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            let mut err = ValidationError::new("jwt_secret_default_dev");
            err.message = Some(
                "The bundled development JWT secret must not be used outside development. Set APP__JWT_SECRET to a unique, secure value."
                    .into(),
            );
            errors.add("jwt_secret", err);
        }

        if self.api_default_page_size > self.api_max_page_size {
            let mut err = ValidationError::new("api_default_page_size");
            err.message = Some("api_default_page_size cannot exceed api_max_page_size".into());
            errors.add("api_default_page_size", err);
        }

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections cannot exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        let bootstrap_fields = [
            self.bootstrap_supervisor_name.is_some(),
            self.bootstrap_supervisor_phone.is_some(),
            self.bootstrap_supervisor_password.is_some(),
        ];
        let configured = bootstrap_fields.iter().filter(|set| **set).count();
        if configured > 0 && configured < bootstrap_fields.len() {
            let mut err = ValidationError::new("bootstrap_supervisor_incomplete");
            err.message = Some(
                "bootstrap_supervisor_name, bootstrap_supervisor_phone and bootstrap_supervisor_password must be set together".into(),
            );
            errors.add("bootstrap_supervisor_name", err);
        }

        if let Some(password) = self.bootstrap_supervisor_password.as_deref() {
            if password.chars().count() < crate::auth::password::MIN_PASSWORD_LENGTH {
                let mut err = ValidationError::new("bootstrap_supervisor_password");
                err.message = Some("bootstrap supervisor password is too short".into());
                errors.add("bootstrap_supervisor_password", err);
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Session lifetime as a chrono duration
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_ttl_secs.min(MAX_SESSION_TTL_SECS) as i64)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_api_page_size() -> u64 {
    20
}

fn default_api_max_page_size() -> u64 {
    100
}

fn default_store_name() -> String {
    "Loja".to_string()
}

fn default_currency() -> String {
    "BRL".to_string()
}

fn default_auth_issuer() -> String {
    "estoque-api".to_string()
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    if trimmed.len() < 32 {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some("JWT secret must be at least 32 characters".into());
        return Err(err);
    }

    const DISALLOWED: [&str; 4] = [
        "CHANGE_THIS_SECRET_IN_PRODUCTION",
        "INSECURE_DEFAULT_DO_NOT_USE_IN_PRODUCTION",
        "your-secret-key",
        "default-secret-key",
    ];
    if DISALLOWED
        .iter()
        .any(|&bad| trimmed.eq_ignore_ascii_case(bad))
    {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some("JWT secret must be overridden with a secure random value".into());
        return Err(err);
    }

    if let Some(first) = trimmed.chars().next() {
        if trimmed.chars().all(|c| c == first) {
            let mut err = ValidationError::new("jwt_secret");
            err.message = Some("JWT secret cannot be a repeated character sequence".into());
            return Err(err);
        }
    }

    let lower = trimmed.to_ascii_lowercase();
    let weak_fragments = ["changeme", "password", "12345", "abcdef"];
    if weak_fragments.iter().any(|pattern| lower.contains(pattern)) {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some(
            "JWT secret appears to be weak; use a cryptographically strong random string".into(),
        );
        return Err(err);
    }

    let unique_chars: std::collections::HashSet<char> = trimmed.chars().collect();
    if unique_chars.len() < 10 {
        let mut err = ValidationError::new("jwt_secret");
        err.message =
            Some("JWT secret must have at least 10 unique characters for adequate entropy".into());
        return Err(err);
    }

    Ok(())
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("event_channel_capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("estoque_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // jwt_secret has no default; it must come from a file or APP__JWT_SECRET.
    let config = Config::builder()
        .set_default("database_url", "sqlite://estoque.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("session_ttl_secs", DEFAULT_SESSION_TTL_SECS as i64)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET with a random string of at least 32 characters.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    debug_assert!(app_config.session_ttl_secs >= MIN_SESSION_TTL_SECS);
    info!("Configuration loaded successfully");
    Ok(app_config)
}
