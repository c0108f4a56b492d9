//! TOML-based configuration for ProfitLens.
//!
//! Supports a config file (profitlens.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [warehouse]
//! driver = "snowflake"
//! timeout_seconds = 120
//!
//! [snowflake]
//! user = "${SNOWFLAKE_USER}"
//! password = "${SNOWFLAKE_PASSWORD}"
//! account = "xy12345.eu-west-1"
//! warehouse = "COMPUTE_WH"
//! database = "FOOD_DELIVERY"
//! schema = "ANALYTICS"
//!
//! [worker]
//! path = "./profitlens-worker"
//!
//! [cache]
//! ttl_seconds = 600
//!
//! [assistant]
//! provider = "cortex"
//! model = "llama3-8b"
//!
//! [server]
//! port = 8501
//! theme = "dark"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::connection::{Credentials, Driver, CREDENTIAL_KEYS};
use crate::chart::Theme;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing secret: snowflake.{0}")]
    MissingSecret(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Which warehouse to talk to.
    pub warehouse: WarehouseSettings,

    /// Secret store for explicit Snowflake credentials.
    pub snowflake: SnowflakeSecrets,

    /// Driver worker configuration.
    pub worker: WorkerSettings,

    /// Result cache configuration.
    pub cache: CacheSettings,

    /// Natural-language assistant configuration.
    pub assistant: AssistantSettings,

    /// HTTP server configuration.
    pub server: ServerSettings,
}

/// Warehouse selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WarehouseSettings {
    /// snowflake or duckdb.
    pub driver: Driver,

    /// DuckDB file (duckdb driver only).
    pub path: Option<String>,

    /// Attempt the ambient managed session before credentials.
    pub prefer_managed_session: bool,

    /// Per-statement timeout.
    pub timeout_seconds: u64,
}

impl Default for WarehouseSettings {
    fn default() -> Self {
        Self {
            driver: Driver::Snowflake,
            path: None,
            prefer_managed_session: true,
            timeout_seconds: 120,
        }
    }
}

impl WarehouseSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// The `[snowflake]` secret section. Every value supports `${ENV_VAR}`
/// expansion; unset keys fall back to `SNOWFLAKE_<KEY>`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SnowflakeSecrets {
    pub user: Option<String>,
    pub password: Option<String>,
    pub account: Option<String>,
    pub warehouse: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub role: Option<String>,
}

impl SnowflakeSecrets {
    fn raw(&self, key: &str) -> Option<&String> {
        match key {
            "user" => self.user.as_ref(),
            "password" => self.password.as_ref(),
            "account" => self.account.as_ref(),
            "warehouse" => self.warehouse.as_ref(),
            "database" => self.database.as_ref(),
            "schema" => self.schema.as_ref(),
            "role" => self.role.as_ref(),
            _ => None,
        }
    }

    fn resolve_key(&self, key: &str) -> Result<Option<String>, SettingsError> {
        if let Some(value) = self.raw(key) {
            let expanded = expand_env_vars(value)?;
            if !expanded.is_empty() {
                return Ok(Some(expanded));
            }
        }
        Ok(env::var(format!("SNOWFLAKE_{}", key.to_uppercase()))
            .ok()
            .filter(|v| !v.is_empty()))
    }

    /// Resolve a complete credential set.
    ///
    /// Fails on the first required key that is absent from both the file and
    /// the environment.
    pub fn credentials(&self) -> Result<Credentials, SettingsError> {
        let mut values = Vec::with_capacity(CREDENTIAL_KEYS.len());
        for key in CREDENTIAL_KEYS {
            let value = self
                .resolve_key(key)?
                .ok_or_else(|| SettingsError::MissingSecret(key.to_string()))?;
            values.push(value);
        }
        let role = self.resolve_key("role")?;

        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();
        Ok(Credentials {
            user: next(),
            password: next(),
            account: next(),
            warehouse: next(),
            database: next(),
            schema: next(),
            role,
        })
    }
}

/// Worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WorkerSettings {
    /// Path to the driver worker binary.
    pub path: Option<String>,

    /// Connection pool settings.
    pub pool: PoolSettings,
}

/// Connection pool settings forwarded to the worker.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Maximum number of idle connections.
    pub max_idle_conns: u32,

    /// Maximum number of open connections.
    pub max_open_conns: u32,

    /// Maximum connection lifetime (e.g., "30m", "1h").
    pub conn_max_lifetime: String,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_idle_conns: 2,
            max_open_conns: 4,
            conn_max_lifetime: "30m".to_string(),
        }
    }
}

impl PoolSettings {
    /// Convert to worker command-line arguments.
    pub fn to_worker_args(&self) -> Vec<String> {
        vec![
            "-pool".to_string(),
            format!("-pool-max-idle={}", self.max_idle_conns),
            format!("-pool-max-open={}", self.max_open_conns),
            format!("-pool-conn-lifetime={}", self.conn_max_lifetime),
        ]
    }
}

/// Result cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Lifetime of a cached query result.
    pub ttl_seconds: u64,

    /// Lifetime of the generated portal summary.
    pub summary_ttl_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_seconds: 600,
            summary_ttl_seconds: 3600,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn summary_ttl(&self) -> Duration {
        Duration::from_secs(self.summary_ttl_seconds)
    }
}

/// Which completion backend the assistant uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    /// `SNOWFLAKE.CORTEX.COMPLETE` executed in the warehouse.
    #[default]
    Cortex,
    /// Any OpenAI-compatible chat completions endpoint.
    OpenAi,
}

/// Natural-language assistant configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssistantSettings {
    pub provider: ModelProvider,
    pub model: String,

    /// Base URL for the openai provider.
    pub base_url: String,

    /// API key for the openai provider (supports ${ENV_VAR}).
    pub api_key: Option<String>,

    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            provider: ModelProvider::Cortex,
            model: "llama3-8b".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            max_tokens: 1024,
            temperature: 0.0,
            timeout_seconds: 60,
        }
    }
}

impl AssistantSettings {
    /// The API key with environment variables expanded.
    pub fn resolved_api_key(&self) -> Result<Option<String>, SettingsError> {
        self.api_key.as_deref().map(expand_env_vars).transpose()
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,

    /// Chart theme when a request does not name one.
    pub theme: Theme,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            theme: Theme::Light,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `PROFITLENS_CONFIG`
    /// 2. `./profitlens.toml`
    /// 3. `~/.config/profitlens/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("PROFITLENS_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("profitlens.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("profitlens").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.cache.ttl_seconds == 0 {
            return Err(SettingsError::InvalidConfig(
                "cache.ttl_seconds must be greater than zero".to_string(),
            ));
        }
        if self.warehouse.driver == Driver::DuckDb && self.warehouse.path.is_none() {
            return Err(SettingsError::InvalidConfig(
                "warehouse.path is required for the duckdb driver".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the worker binary path.
    ///
    /// Returns the configured path or searches common locations and `PATH`.
    pub fn worker_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.worker.path {
            let expanded = expand_env_vars(path).ok()?;
            return Some(PathBuf::from(expanded));
        }

        let candidates = ["./profitlens-worker", "./worker/profitlens-worker"];
        for candidate in candidates {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(output) = std::process::Command::new("which")
            .arg("profitlens-worker")
            .output()
        {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(PathBuf::from(path));
                }
            }
        }

        None
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // Lone $
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
