//! Warehouse access.
//!
//! Two backend shapes sit behind the [`Warehouse`] trait:
//!
//! ```text
//! ┌──────────────────────────┐      ┌──────────────────────────────────┐
//! │ SqlApiWarehouse          │      │ ConnectorWarehouse               │
//! │  managed session token   │      │  WorkerClient (child process)    │
//! │  POST /api/v2/statements │      │  NDJSON over stdin/stdout        │
//! └──────────────────────────┘      └──────────────────────────────────┘
//! ```
//!
//! [`ConnectionManager`] picks one at startup; the query runner only sees
//! the trait.

mod connect;
mod error;
mod fixture;
pub mod protocol;
mod result;
mod sql_api;
mod worker;

use async_trait::async_trait;
use serde::Serialize;

pub use connect::{first_available, Connection, ConnectionManager};
pub use error::{WarehouseError, WarehouseResult};
pub use fixture::FixtureWarehouse;
pub use result::{value_as_f64, Column, QueryResult};
pub use sql_api::{ManagedSession, SqlApiWarehouse, SESSION_TOKEN_PATH};
pub use worker::{ConnectorWarehouse, WorkerClient};

use crate::sql::Statement;

/// Which backend shape a warehouse handle uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    ManagedSession,
    Connector,
    Fixture,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BackendKind::ManagedSession => "managed_session",
            BackendKind::Connector => "connector",
            BackendKind::Fixture => "fixture",
        })
    }
}

/// A read-only SQL backend.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Execute one statement with its bound parameters.
    async fn execute(&self, statement: &Statement) -> WarehouseResult<QueryResult>;

    fn kind(&self) -> BackendKind;

    /// Cheap connectivity check.
    async fn ping(&self) -> WarehouseResult<()> {
        self.execute(&Statement::raw("SELECT 1")).await.map(|_| ())
    }
}
