//! Configuration module for ProfitLens.
//!
//! Handles warehouse credentials, environment variables, and settings.

mod connection;
mod settings;

pub use connection::{
    duckdb_connection_string, ConnectionError, Credentials, Driver, CREDENTIAL_KEYS,
};
pub use settings::{
    expand_env_vars, AssistantSettings, CacheSettings, ModelProvider, PoolSettings,
    ServerSettings, Settings, SettingsError, SnowflakeSecrets, WarehouseSettings, WorkerSettings,
};
