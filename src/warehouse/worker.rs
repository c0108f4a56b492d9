//! Cursor-style connector: a driver worker child process speaking NDJSON.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

use super::error::{WarehouseError, WarehouseResult};
use super::protocol::{
    methods, ConnectionParams, ErrorInfo, ExecuteQueryParams, ExecuteQueryResponse, PingParams,
    PingResponse, RequestEnvelope, ResponseEnvelope,
};
use super::result::QueryResult;
use super::{BackendKind, Warehouse};
use crate::config::Settings;
use crate::sql::Statement;

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<ResponseEnvelope>>>>;

/// Async client for the driver worker.
///
/// Requests carry a unique id, so many can be in flight over one process.
pub struct WorkerClient {
    stdin: Arc<Mutex<BufWriter<ChildStdin>>>,
    pending: PendingMap,
    _child: Child,
    reader_task: tokio::task::JoinHandle<()>,
    timeout: Duration,
}

impl WorkerClient {
    /// Spawn the worker binary with arguments and a request timeout.
    pub async fn spawn<P: AsRef<Path>>(
        worker_path: P,
        args: &[String],
        timeout: Duration,
    ) -> WarehouseResult<Self> {
        let mut child = Command::new(worker_path.as_ref())
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(WarehouseError::SpawnFailed)?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                return Err(WarehouseError::SpawnFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "worker stdio not captured",
                )))
            }
        };

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_task = Self::spawn_reader_task(stdout, pending.clone());

        Ok(Self {
            stdin: Arc::new(Mutex::new(BufWriter::new(stdin))),
            pending,
            _child: child,
            reader_task,
            timeout,
        })
    }

    /// Spawn using the configured binary path, pool and timeout.
    pub async fn spawn_with_settings(settings: &Settings) -> WarehouseResult<Self> {
        let path = settings.worker_path().ok_or_else(|| {
            WarehouseError::SpawnFailed(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "worker binary not found; set worker.path in the config",
            ))
        })?;
        let args = settings.worker.pool.to_worker_args();
        Self::spawn(&path, &args, settings.warehouse.timeout()).await
    }

    fn spawn_reader_task(stdout: ChildStdout, pending: PendingMap) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(_) => match serde_json::from_str::<ResponseEnvelope>(&line) {
                        Ok(resp) => {
                            let mut pending = pending.lock().await;
                            if let Some(tx) = pending.remove(&resp.id) {
                                let _ = tx.send(resp);
                            }
                        }
                        Err(e) => warn!(error = %e, "worker: unparseable response line"),
                    },
                    Err(e) => {
                        warn!(error = %e, "worker: read error");
                        break;
                    }
                }
            }

            // Fail everything still waiting.
            let mut pending = pending.lock().await;
            for (id, tx) in pending.drain() {
                let _ = tx.send(ResponseEnvelope {
                    id,
                    success: false,
                    result: None,
                    error: Some(ErrorInfo {
                        code: "WORKER_EXITED".to_string(),
                        message: "Worker process exited unexpectedly".to_string(),
                    }),
                });
            }
        })
    }

    /// Send a request and wait for its response.
    pub async fn request<P, R>(&self, method: &str, params: P) -> WarehouseResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = uuid::Uuid::new_v4().to_string();
        let request = RequestEnvelope {
            id: id.clone(),
            method: method.to_string(),
            params: serde_json::to_value(params).map_err(WarehouseError::SerializeFailed)?,
        };
        let line = serde_json::to_string(&request).map_err(WarehouseError::SerializeFailed)? + "\n";

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        if let Err(e) = self.write_line(&line).await {
            self.pending.lock().await.remove(&id);
            return Err(WarehouseError::WriteFailed(e));
        }

        let response = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(_)) => return Err(WarehouseError::ChannelClosed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(WarehouseError::Timeout(self.timeout.as_secs()));
            }
        };

        if response.success {
            let result = response.result.unwrap_or(serde_json::Value::Null);
            serde_json::from_value(result).map_err(|e| WarehouseError::DecodeFailed(e.to_string()))
        } else {
            let error = response.error.unwrap_or_else(|| ErrorInfo {
                code: "UNKNOWN".to_string(),
                message: "Unknown error".to_string(),
            });
            Err(Self::classify_error(&error.code, &error.message))
        }
    }

    async fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await
    }

    /// Requests still waiting for a response.
    pub async fn in_flight(&self) -> usize {
        self.pending.lock().await.len()
    }

    fn classify_error(code: &str, message: &str) -> WarehouseError {
        match code {
            "CONNECTION_FAILED" | "DRIVER_NOT_FOUND" => {
                WarehouseError::ConnectionFailed(message.to_string())
            }
            "WORKER_EXITED" => WarehouseError::WorkerExited,
            _ => WarehouseError::remote(code, message),
        }
    }

    /// Whether the worker process is still running.
    pub fn is_alive(&self) -> bool {
        !self.reader_task.is_finished()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// A [`Warehouse`] backed by the driver worker and one connection string.
pub struct ConnectorWarehouse {
    client: WorkerClient,
    connection: ConnectionParams,
}

impl ConnectorWarehouse {
    pub fn new(client: WorkerClient, driver: &str, connection_string: String) -> Self {
        Self {
            client,
            connection: ConnectionParams {
                driver: driver.to_string(),
                connection_string,
            },
        }
    }

    /// Round-trip a ping so a bad connection string fails at startup.
    pub async fn verify(&self) -> WarehouseResult<()> {
        let resp: PingResponse = self
            .client
            .request(
                methods::PING,
                PingParams {
                    connection: self.connection.clone(),
                },
            )
            .await?;
        debug!(
            driver = %self.connection.driver,
            version = resp.server_version.as_deref().unwrap_or("unknown"),
            "connector verified"
        );
        Ok(())
    }
}

#[async_trait]
impl Warehouse for ConnectorWarehouse {
    async fn execute(&self, statement: &Statement) -> WarehouseResult<QueryResult> {
        let resp: ExecuteQueryResponse = self
            .client
            .request(
                methods::EXECUTE_QUERY,
                ExecuteQueryParams {
                    connection: self.connection.clone(),
                    sql: statement.sql.clone(),
                    args: statement.json_args(),
                },
            )
            .await?;
        Ok(resp.into())
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Connector
    }
}
