use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const DEFAULT_SYNC_INTERVAL_HOURS: u64 = 24;
const DEFAULT_SYNC_DOMAIN_TOKEN: &str = "primefire";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to create missing tables on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Comma-separated list of allowed CORS origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Whether CORS responses allow credentials
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// Root directory for uploaded files (resumes, ticket attachments)
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Azure AD tenant the API validates bearer tokens against
    #[validate(length(min = 1))]
    pub tenant_id: String,

    /// Azure AD application (client) ID of this backend; tokens must carry
    /// the `api://{backend_client_id}` audience
    #[validate(length(min = 1))]
    pub backend_client_id: String,

    /// Leeway in seconds applied to token expiry checks
    #[serde(default = "default_token_leeway")]
    pub token_leeway_secs: u64,

    /// Microsoft Graph tenant for the service-to-service sync client
    #[serde(default)]
    pub graph_tenant_id: String,

    /// Microsoft Graph client ID (client-credential flow)
    #[serde(default)]
    pub graph_client_id: String,

    /// Microsoft Graph client secret (client-credential flow)
    #[serde(default)]
    pub graph_client_secret: String,

    /// Graph API base URL; overridable for tests
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,

    /// Token endpoint override; defaults to the tenant's v2.0 endpoint
    #[serde(default)]
    pub graph_token_url: Option<String>,

    /// Run a directory sync on startup and keep the periodic timer armed
    #[serde(default)]
    pub sync_enabled: bool,

    /// Hours between automatic directory syncs
    #[serde(default = "default_sync_interval_hours")]
    pub sync_interval_hours: u64,

    /// Domain label that marks an address as belonging to the organization
    /// (matched exactly against the dot-separated labels of the email domain)
    #[serde(default = "default_sync_domain_token")]
    pub sync_domain_token: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_upload_dir() -> String {
    DEFAULT_UPLOAD_DIR.to_string()
}

fn default_token_leeway() -> u64 {
    60
}

fn default_graph_base_url() -> String {
    DEFAULT_GRAPH_BASE_URL.to_string()
}

fn default_sync_interval_hours() -> u64 {
    DEFAULT_SYNC_INTERVAL_HOURS
}

fn default_sync_domain_token() -> String {
    DEFAULT_SYNC_DOMAIN_TOKEN.to_string()
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        matches!(self.environment.as_str(), "development" | "dev" | "local")
    }

    /// Audience expected on incoming bearer tokens
    pub fn api_audience(&self) -> String {
        format!("api://{}", self.backend_client_id)
    }

    /// Issuer expected on incoming bearer tokens
    pub fn api_issuer(&self) -> String {
        format!("https://sts.windows.net/{}/", self.tenant_id)
    }

    /// Token endpoint used by the Graph sync client
    pub fn graph_token_url(&self) -> String {
        self.graph_token_url.clone().unwrap_or_else(|| {
            format!(
                "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
                self.graph_tenant_id
            )
        })
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
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

    let builder = Config::builder()
        .set_default("database_url", "sqlite://primefire.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("tenant_id", "common")?
        .set_default("backend_client_id", "primefire-backend")?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

/// Initialize the tracing subscriber from the configured level
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("primefire_api={},tower_http=debug", level);
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
