//! Establishes the single process-wide warehouse connection.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use super::error::{WarehouseError, WarehouseResult};
use super::sql_api::{ManagedSession, SqlApiWarehouse};
use super::worker::{ConnectorWarehouse, WorkerClient};
use super::Warehouse;
use crate::config::{duckdb_connection_string, Driver, Settings};
use crate::sql::Dialect;

/// A live warehouse handle and the dialect its statements are rendered in.
#[derive(Clone)]
pub struct Connection {
    pub warehouse: Arc<dyn Warehouse>,
    pub dialect: Dialect,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("kind", &self.warehouse.kind())
            .field("dialect", &self.dialect)
            .finish()
    }
}

/// Builds the connection from settings.
///
/// For Snowflake the managed session is tried first (unless disabled), then
/// explicit credentials through the driver worker. When both fail the
/// returned [`WarehouseError::Unavailable`] is meant to halt startup.
pub struct ConnectionManager<'a> {
    settings: &'a Settings,
}

impl<'a> ConnectionManager<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    pub async fn connect(&self) -> WarehouseResult<Connection> {
        match self.settings.warehouse.driver {
            Driver::DuckDb => self.connect_duckdb().await,
            Driver::Snowflake => self.connect_snowflake().await,
        }
    }

    async fn connect_duckdb(&self) -> WarehouseResult<Connection> {
        let path = self.settings.warehouse.path.as_deref().ok_or_else(|| {
            WarehouseError::Credentials("warehouse.path is required for duckdb".into())
        })?;
        let client = WorkerClient::spawn_with_settings(self.settings).await?;
        let warehouse =
            ConnectorWarehouse::new(client, Driver::DuckDb.as_str(), duckdb_connection_string(path));
        warehouse.verify().await?;
        info!(path, "connected to duckdb extract");
        Ok(Connection {
            warehouse: Arc::new(warehouse),
            dialect: Dialect::DuckDb,
        })
    }

    async fn connect_snowflake(&self) -> WarehouseResult<Connection> {
        let settings = self.settings;
        let warehouse = first_available(
            settings.warehouse.prefer_managed_session,
            move || async move {
                let session = ManagedSession::discover()?;
                let warehouse = SqlApiWarehouse::new(session, settings.warehouse.timeout())?;
                warehouse.ping().await?;
                Ok::<_, WarehouseError>(Arc::new(warehouse) as Arc<dyn Warehouse>)
            },
            move || async move {
                let credentials = settings.snowflake.credentials()?;
                let dsn = credentials.to_connection_string()?;
                let client = WorkerClient::spawn_with_settings(settings).await?;
                let warehouse = ConnectorWarehouse::new(client, Driver::Snowflake.as_str(), dsn);
                warehouse.verify().await?;
                Ok::<_, WarehouseError>(Arc::new(warehouse) as Arc<dyn Warehouse>)
            },
        )
        .await?;
        Ok(Connection {
            warehouse,
            dialect: Dialect::Snowflake,
        })
    }
}

/// Try the managed session, then credentials; fail with both reasons.
pub async fn first_available<M, MF, C, CF>(
    prefer_managed: bool,
    managed: M,
    credentials: C,
) -> WarehouseResult<Arc<dyn Warehouse>>
where
    M: FnOnce() -> MF,
    MF: Future<Output = WarehouseResult<Arc<dyn Warehouse>>>,
    C: FnOnce() -> CF,
    CF: Future<Output = WarehouseResult<Arc<dyn Warehouse>>>,
{
    let managed_reason = if prefer_managed {
        match managed().await {
            Ok(warehouse) => {
                info!("connected through the managed session");
                return Ok(warehouse);
            }
            Err(e) => {
                warn!(error = %e, "managed session unavailable, falling back to credentials");
                e.to_string()
            }
        }
    } else {
        "disabled by configuration".to_string()
    };

    match credentials().await {
        Ok(warehouse) => {
            info!("connected with configured credentials");
            Ok(warehouse)
        }
        Err(e) => Err(WarehouseError::Unavailable {
            managed: managed_reason,
            credentials: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::{BackendKind, FixtureWarehouse};

    fn fixture(kind: BackendKind) -> WarehouseResult<Arc<dyn Warehouse>> {
        Ok(Arc::new(FixtureWarehouse::new().with_kind(kind)) as Arc<dyn Warehouse>)
    }

    #[tokio::test]
    async fn test_managed_session_wins() {
        let wh = first_available(
            true,
            || async { fixture(BackendKind::ManagedSession) },
            || async { fixture(BackendKind::Connector) },
        )
        .await
        .unwrap();
        assert_eq!(wh.kind(), BackendKind::ManagedSession);
    }

    #[tokio::test]
    async fn test_falls_back_to_credentials() {
        let wh = first_available(
            true,
            || async { Err(WarehouseError::Auth("no token".into())) },
            || async { fixture(BackendKind::Connector) },
        )
        .await
        .unwrap();
        assert_eq!(wh.kind(), BackendKind::Connector);
    }

    #[tokio::test]
    async fn test_both_failing_is_fatal() {
        let err = first_available(
            true,
            || async { Err(WarehouseError::Auth("no token".into())) },
            || async { Err(WarehouseError::Credentials("missing secret: snowflake.password".into())) },
        )
        .await
        .err()
        .unwrap();
        match err {
            WarehouseError::Unavailable { managed, credentials } => {
                assert!(managed.contains("no token"));
                assert!(credentials.contains("snowflake.password"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_managed_session_skipped_when_disabled() {
        let err = first_available(
            false,
            || async { fixture(BackendKind::ManagedSession) },
            || async { Err(WarehouseError::Credentials("missing".into())) },
        )
        .await
        .err()
        .unwrap();
        assert!(err.to_string().contains("disabled by configuration"));
    }

    #[tokio::test]
    async fn test_duckdb_without_path_fails() {
        let mut settings = Settings::default();
        settings.warehouse.driver = Driver::DuckDb;
        let err = ConnectionManager::new(&settings).connect().await.err().unwrap();
        assert!(matches!(err, WarehouseError::Credentials(_)));
    }
}
