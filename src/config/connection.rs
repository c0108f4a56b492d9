//! Warehouse connection configuration.
//!
//! Credentials can be supplied through the `[snowflake]` section of the
//! settings file or through environment variables:
//! - `SNOWFLAKE_USER`, `SNOWFLAKE_PASSWORD`, `SNOWFLAKE_ACCOUNT`
//! - `SNOWFLAKE_WAREHOUSE`, `SNOWFLAKE_DATABASE`, `SNOWFLAKE_SCHEMA`
//! - `SNOWFLAKE_ROLE` (optional)

use std::env;

use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Error type for connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Missing required credential: {0}")]
    MissingCredential(String),

    #[error("Unsupported driver: {0}. Supported: snowflake, duckdb")]
    UnsupportedDriver(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Supported warehouse drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// Snowflake (managed session or credentials)
    #[default]
    Snowflake,
    /// DuckDB file holding a local extract of the same schema
    DuckDb,
}

impl Driver {
    /// Parse driver from string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConnectionError> {
        match s.to_lowercase().as_str() {
            "snowflake" | "sf" => Ok(Driver::Snowflake),
            "duckdb" | "duck" => Ok(Driver::DuckDb),
            other => Err(ConnectionError::UnsupportedDriver(other.to_string())),
        }
    }

    /// Get the driver name for the worker.
    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Snowflake => "snowflake",
            Driver::DuckDb => "duckdb",
        }
    }
}

/// The keys every credential set must carry.
pub const CREDENTIAL_KEYS: [&str; 6] = [
    "user",
    "password",
    "account",
    "warehouse",
    "database",
    "schema",
];

/// Explicit Snowflake credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    pub account: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub role: Option<String>,
}

// Keeps the password out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"********")
            .field("account", &self.account)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("role", &self.role)
            .finish()
    }
}

impl Credentials {
    /// Load credentials from `SNOWFLAKE_*` environment variables.
    pub fn from_env() -> Result<Self, ConnectionError> {
        let var = |key: &str| {
            let name = format!("SNOWFLAKE_{}", key.to_uppercase());
            env::var(&name).map_err(|_| ConnectionError::MissingCredential(name))
        };

        Ok(Self {
            user: var("user")?,
            password: var("password")?,
            account: var("account")?,
            warehouse: var("warehouse")?,
            database: var("database")?,
            schema: var("schema")?,
            role: env::var("SNOWFLAKE_ROLE").ok(),
        })
    }

    /// Build the DSN understood by the worker's Snowflake driver:
    /// `user:password@account/database/schema?warehouse=WH`.
    ///
    /// User and password are percent-encoded.
    pub fn to_connection_string(&self) -> Result<String, ConnectionError> {
        let invalid = |what: &str| ConnectionError::InvalidConfig(format!("invalid {what}"));

        let mut url = Url::parse(&format!("snowflake://{}", self.account))
            .map_err(|_| invalid("account"))?;
        url.set_username(&self.user).map_err(|_| invalid("user"))?;
        url.set_password(Some(&self.password))
            .map_err(|_| invalid("password"))?;
        url.set_path(&format!("{}/{}", self.database, self.schema));
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("warehouse", &self.warehouse);
            if let Some(role) = &self.role {
                query.append_pair("role", role);
            }
        }

        Ok(url
            .as_str()
            .trim_start_matches("snowflake://")
            .to_string())
    }
}

/// Connection string for a DuckDB extract.
pub fn duckdb_connection_string(path: &str) -> String {
    if path.is_empty() || path == ":memory:" {
        ":memory:".to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials {
            user: "analyst".into(),
            password: "s3cret".into(),
            account: "xy12345.eu-west-1".into(),
            warehouse: "COMPUTE_WH".into(),
            database: "FOOD_DELIVERY".into(),
            schema: "ANALYTICS".into(),
            role: None,
        }
    }

    #[test]
    fn test_snowflake_dsn() {
        let dsn = creds().to_connection_string().unwrap();
        assert_eq!(
            dsn,
            "analyst:s3cret@xy12345.eu-west-1/FOOD_DELIVERY/ANALYTICS?warehouse=COMPUTE_WH"
        );
    }

    #[test]
    fn test_snowflake_dsn_escapes_password() {
        let mut c = creds();
        c.password = "p@ss:word".into();
        c.role = Some("REPORTER".into());
        let dsn = c.to_connection_string().unwrap();
        assert!(dsn.starts_with("analyst:p%40ss%3Aword@"));
        assert!(dsn.ends_with("&role=REPORTER"));
    }

    #[test]
    fn test_debug_hides_password() {
        let rendered = format!("{:?}", creds());
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("analyst"));
    }

    #[test]
    fn test_duckdb_paths() {
        assert_eq!(duckdb_connection_string("./extract.duckdb"), "./extract.duckdb");
        assert_eq!(duckdb_connection_string(""), ":memory:");
    }

    #[test]
    fn test_driver_parsing() {
        assert_eq!(Driver::from_str("Snowflake").unwrap(), Driver::Snowflake);
        assert_eq!(Driver::from_str("duckdb").unwrap(), Driver::DuckDb);
        assert!(Driver::from_str("mssql").is_err());
    }
}
