use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
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
pub const DEFAULT_RECORD_STORE_URL: &str = "https://api.airtable.com/v0";

/// Environment names used by earlier deployments, read as defaults beneath the `APP__` layer.
const LEGACY_ENV_DEFAULTS: [(&str, &str); 6] = [
    ("AIRTABLE_BASE_ID", "record_store.base_id"),
    ("AIRTABLE_API_KEY", "record_store.api_key"),
    ("AIRTABLE_TABLE_ENTRADA_INSUMOS", "record_store.tables.entrada_insumos"),
    ("AIRTABLE_TABLE_INSUMOS", "record_store.tables.insumos"),
    (
        "AIRTABLE_TABLE_EQUIPO_LABORATORIO",
        "record_store.tables.equipo_laboratorio",
    ),
    ("JWT_SECRET", "jwt_secret"),
];

/// Table identifiers inside the record store base
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableIds {
    /// Stock entries (Entrada Insumos)
    #[serde(default)]
    pub entrada_insumos: Option<String>,

    /// Supply items (Insumos Laboratorio)
    #[serde(default)]
    pub insumos: Option<String>,

    /// Laboratory staff (Equipo Laboratorio)
    #[serde(default)]
    pub equipo_laboratorio: Option<String>,
}

/// Remote record store connection settings.
///
/// Every identifier is optional at load time; the handler that needs a
/// missing one answers with a configuration error instead.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordStoreConfig {
    /// Base URL of the store's REST API
    #[serde(default = "default_record_store_url")]
    pub api_url: String,

    /// Base identifier
    #[serde(default)]
    pub base_id: Option<String>,

    /// Personal access token / API key
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub tables: TableIds,

    /// Comma-separated staff record ids hidden from the staff listing
    #[serde(default)]
    pub excluded_responsables: Option<String>,
}

impl Default for RecordStoreConfig {
    fn default() -> Self {
        Self {
            api_url: default_record_store_url(),
            base_id: None,
            api_key: None,
            tables: TableIds::default(),
            excluded_responsables: None,
        }
    }
}

impl RecordStoreConfig {
    pub fn new(
        api_url: impl Into<String>,
        base_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            base_id: Some(base_id.into()),
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// Staff record ids that must never be listed
    pub fn excluded_responsables(&self) -> Vec<&str> {
        split_csv(self.excluded_responsables.as_deref())
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Shared HS256 secret of the session tokens
    #[validate(length(min = 32), custom = "validate_jwt_secret")]
    pub jwt_secret: String,

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

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// Comma-separated override of the paths reachable without a session
    #[serde(default)]
    pub public_paths: Option<String>,

    #[serde(default)]
    pub record_store: RecordStoreConfig,
}

impl AppConfig {
    /// Creates a new configuration
    pub fn new(
        jwt_secret: String,
        host: String,
        port: u16,
        environment: String,
        record_store: RecordStoreConfig,
    ) -> Self {
        Self {
            jwt_secret,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            public_paths: None,
            record_store,
        }
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        !split_csv(self.cors_allowed_origins.as_deref()).is_empty()
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Configured allow-list override, if any
    pub fn public_paths(&self) -> Option<Vec<String>> {
        let paths: Vec<String> = split_csv(self.public_paths.as_deref())
            .into_iter()
            .map(str::to_string)
            .collect();
        if paths.is_empty() {
            None
        } else {
            Some(paths)
        }
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
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

        if url::Url::parse(&self.record_store.api_url).is_err() {
            let mut err = ValidationError::new("record_store_api_url");
            err.message = Some("record_store.api_url must be an absolute URL".into());
            errors.add("record_store", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn split_csv(raw: Option<&str>) -> Vec<&str> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_record_store_url() -> String {
    DEFAULT_RECORD_STORE_URL.to_string()
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

    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("datalab_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

fn with_legacy_defaults(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    legacy_defaults_from(builder, |var| env::var(var).ok())
}

fn legacy_defaults_from(
    mut builder: ConfigBuilder<DefaultState>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let present = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

    for (var, key) in LEGACY_ENV_DEFAULTS {
        if let Some(value) = present(var) {
            builder = builder.set_default(key, value)?;
        }
    }

    // Personal access tokens replaced API keys; accept either.
    if present("AIRTABLE_API_KEY").is_none() {
        if let Some(pat) = present("AIRTABLE_PAT") {
            builder = builder.set_default("record_store.api_key", pat)?;
        }
    }

    Ok(builder)
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults and legacy `AIRTABLE_*` / `JWT_SECRET` variables
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Docker config (config/docker.toml) if DOCKER env var is set
/// 5. Environment variables (APP__*)
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
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("record_store.api_url", DEFAULT_RECORD_STORE_URL)?;

    let mut builder = with_legacy_defaults(builder)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    if env::var("DOCKER").is_ok() {
        info!("Docker environment detected");
        builder =
            builder.add_source(File::with_name(&format!("{}/docker", CONFIG_DIR)).required(false));
    }

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET (or JWT_SECRET) to the secret shared with the login flow.");
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

    info!("Configuration loaded successfully");
    Ok(app_config)
}
