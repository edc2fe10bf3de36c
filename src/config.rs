use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::Validate;

/// Default values for configuration
const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_TTL_HOURS: i64 = 24;
const CONFIG_DIR: &str = "config";

/// Application configuration. The signing key is the only field with no
/// default: it must come from the environment or a config file, which keeps
/// an insecure placeholder from ever reaching production.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Secret key for approval-token HMAC signatures (minimum 32 characters).
    /// Rotating it invalidates every outstanding token.
    #[validate(length(min = 32))]
    pub signing_key: String,

    /// Hours before a row's `last_checked` goes stale, and the approval
    /// token TTL.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,

    /// Base URL used to build approval links in owner emails.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Recipient of approval requests and failure alerts.
    #[validate(email)]
    #[serde(default = "default_owner_email")]
    pub owner_email: String,

    /// Enforce one resolution per token (see DESIGN.md). Off by default.
    #[serde(default)]
    pub single_use_tokens: bool,

    /// Ledger backend: "in-memory" today; the spreadsheet-backed store is an
    /// external collaborator addressed through the same gateway contract.
    #[serde(default = "default_ledger_backend")]
    pub ledger_backend: String,

    /// External spreadsheet document id (unused by the in-memory backend).
    #[serde(default)]
    pub sheet_id: String,

    #[serde(default = "default_inventory_tab")]
    pub inventory_tab: String,

    #[serde(default = "default_po_log_tab")]
    pub po_log_tab: String,

    /// Mailer backend: "relay" posts to the HTTP mail relay, anything else
    /// captures mail in memory.
    #[serde(default = "default_mailer_backend")]
    pub mailer_backend: String,

    /// HTTP mail relay endpoint (the SMTP-equivalent transport).
    #[serde(default)]
    pub mail_relay_url: String,

    /// Bearer token for the mail relay; optional, secret, no default.
    #[serde(default)]
    pub mail_relay_token: Option<String>,

    #[serde(default = "default_mail_from")]
    pub mail_from: String,

    /// Server bind address
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,
}

fn default_ttl_hours() -> i64 {
    DEFAULT_TTL_HOURS
}
fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_owner_email() -> String {
    "owner@example.com".to_string()
}
fn default_ledger_backend() -> String {
    "in-memory".to_string()
}
fn default_inventory_tab() -> String {
    "Sheet1".to_string()
}
fn default_po_log_tab() -> String {
    "po_log".to_string()
}
fn default_mailer_backend() -> String {
    "in-memory".to_string()
}
fn default_mail_from() -> String {
    "restock@example.com".to_string()
}
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("restock_api={},tower_http=debug", level);
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

    let config = Config::builder()
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // Check for signing_key before deserialization to give a clear error.
    if config.get_string("signing_key").is_err() {
        error!("Signing key is not configured. Set APP__SIGNING_KEY with a secure random string (minimum 32 characters).");
        error!("Generate one with: openssl rand -base64 32");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "signing_key is required but not configured. Set APP__SIGNING_KEY.".into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
