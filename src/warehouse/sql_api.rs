//! Managed-session backend: the Snowflake SQL API with an ambient token.
//!
//! Inside a Snowflake-managed container the platform mounts an OAuth token
//! at [`SESSION_TOKEN_PATH`] and exports `SNOWFLAKE_HOST`. Statements are
//! submitted to `/api/v2/statements`; long-running ones answer `202` and
//! are polled by handle, and large results arrive in extra partitions.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::error::{WarehouseError, WarehouseResult};
use super::result::{Column, QueryResult};
use super::{BackendKind, Warehouse};
use crate::sql::{BindValue, Statement};

/// Where the platform mounts the session token.
pub const SESSION_TOKEN_PATH: &str = "/snowflake/session/token";

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Session context for the SQL API.
#[derive(Debug, Clone)]
pub struct ManagedSession {
    pub base_url: String,
    pub token: String,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub warehouse: Option<String>,
    pub role: Option<String>,
}

impl ManagedSession {
    /// Discover the ambient session from the container environment.
    pub fn discover() -> WarehouseResult<Self> {
        Self::discover_at(Path::new(SESSION_TOKEN_PATH))
    }

    pub fn discover_at(token_path: &Path) -> WarehouseResult<Self> {
        let token = std::fs::read_to_string(token_path)
            .map_err(|e| {
                WarehouseError::Auth(format!(
                    "no session token at {}: {}",
                    token_path.display(),
                    e
                ))
            })?
            .trim()
            .to_string();
        if token.is_empty() {
            return Err(WarehouseError::Auth("session token is empty".into()));
        }

        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        let host = env("SNOWFLAKE_HOST")
            .or_else(|| env("SNOWFLAKE_ACCOUNT").map(|a| format!("{}.snowflakecomputing.com", a)))
            .ok_or_else(|| {
                WarehouseError::Auth("neither SNOWFLAKE_HOST nor SNOWFLAKE_ACCOUNT is set".into())
            })?;
        let base_url = if host.starts_with("http") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", host.trim_end_matches('/'))
        };

        Ok(Self {
            base_url,
            token,
            database: env("SNOWFLAKE_DATABASE"),
            schema: env("SNOWFLAKE_SCHEMA"),
            warehouse: env("SNOWFLAKE_WAREHOUSE"),
            role: env("SNOWFLAKE_ROLE"),
        })
    }
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    bindings: BTreeMap<String, Binding>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Binding {
    #[serde(rename = "type")]
    kind: &'static str,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    statement_handle: Option<String>,
    #[serde(default)]
    result_set_meta_data: Option<ResultSetMetaData>,
    #[serde(default)]
    data: Option<Vec<Vec<Value>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetaData {
    #[serde(default)]
    row_type: Vec<RowType>,
    #[serde(default)]
    partition_info: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RowType {
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
}

/// SQL API bindings are 1-based and carry every value as text.
fn bindings(params: &[BindValue]) -> BTreeMap<String, Binding> {
    params
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let binding = match value {
                BindValue::Text(s) => Binding { kind: "TEXT", value: Some(s.clone()) },
                BindValue::Int(n) => Binding { kind: "FIXED", value: Some(n.to_string()) },
                BindValue::Float(f) if f.is_finite() => Binding { kind: "REAL", value: Some(f.to_string()) },
                BindValue::Float(_) | BindValue::Null => Binding { kind: "TEXT", value: None },
                BindValue::Bool(b) => Binding { kind: "BOOLEAN", value: Some(b.to_string()) },
                BindValue::Date(d) => Binding { kind: "TEXT", value: Some(d.format("%Y-%m-%d").to_string()) },
            };
            ((i + 1).to_string(), binding)
        })
        .collect()
}

/// A [`Warehouse`] talking to the SQL API over the managed session.
pub struct SqlApiWarehouse {
    session: ManagedSession,
    client: Client,
    timeout: Duration,
}

impl SqlApiWarehouse {
    pub fn new(session: ManagedSession, timeout: Duration) -> WarehouseResult<Self> {
        let client = Client::builder()
            .timeout(timeout + Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            session,
            client,
            timeout,
        })
    }

    fn statements_url(&self) -> String {
        format!("{}/api/v2/statements", self.session.base_url)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.bearer_auth(&self.session.token)
            .header("X-Snowflake-Authorization-Token-Type", "OAUTH")
            .header("Accept", "application/json")
            .header("User-Agent", concat!("profitlens/", env!("CARGO_PKG_VERSION")))
    }

    async fn submit(&self, statement: &Statement) -> WarehouseResult<(StatusCode, StatementResponse)> {
        let body = StatementRequest {
            statement: &statement.sql,
            timeout: self.timeout.as_secs(),
            database: self.session.database.as_deref(),
            schema: self.session.schema.as_deref(),
            warehouse: self.session.warehouse.as_deref(),
            role: self.session.role.as_deref(),
            bindings: bindings(&statement.params),
        };
        let resp = self
            .authorized(self.client.post(self.statements_url()))
            .json(&body)
            .send()
            .await?;
        Self::read(resp).await
    }

    async fn fetch(
        &self,
        handle: &str,
        partition: Option<usize>,
    ) -> WarehouseResult<(StatusCode, StatementResponse)> {
        let mut req = self.client.get(format!("{}/{}", self.statements_url(), handle));
        if let Some(p) = partition {
            req = req.query(&[("partition", p)]);
        }
        let resp = self.authorized(req).send().await?;
        Self::read(resp).await
    }

    async fn read(resp: reqwest::Response) -> WarehouseResult<(StatusCode, StatementResponse)> {
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let text = resp.text().await.unwrap_or_default();
            return Err(WarehouseError::Auth(format!("{}: {}", status, text)));
        }
        let text = resp.text().await?;
        let body: StatementResponse = serde_json::from_str(&text)
            .map_err(|e| WarehouseError::DecodeFailed(format!("{} ({})", e, status)))?;
        if status.is_success() {
            Ok((status, body))
        } else {
            Err(WarehouseError::remote(
                body.code.unwrap_or_else(|| status.as_u16().to_string()),
                body.message.unwrap_or_else(|| status.to_string()),
            ))
        }
    }
}

#[async_trait]
impl Warehouse for SqlApiWarehouse {
    async fn execute(&self, statement: &Statement) -> WarehouseResult<QueryResult> {
        let started = Instant::now();
        let (mut status, mut body) = self.submit(statement).await?;

        while status == StatusCode::ACCEPTED {
            if started.elapsed() > self.timeout {
                return Err(WarehouseError::Timeout(self.timeout.as_secs()));
            }
            let handle = body
                .statement_handle
                .clone()
                .ok_or_else(|| WarehouseError::DecodeFailed("202 without statementHandle".into()))?;
            debug!(handle = %handle, "statement still running");
            tokio::time::sleep(POLL_INTERVAL).await;
            (status, body) = self.fetch(&handle, None).await?;
        }

        let meta = body
            .result_set_meta_data
            .ok_or_else(|| WarehouseError::DecodeFailed("response without resultSetMetaData".into()))?;
        let columns = meta
            .row_type
            .into_iter()
            .map(|r| Column::new(r.name, r.kind))
            .collect();
        let mut rows = body.data.unwrap_or_default();

        if meta.partition_info.len() > 1 {
            let handle = body
                .statement_handle
                .ok_or_else(|| WarehouseError::DecodeFailed("partitioned result without handle".into()))?;
            for partition in 1..meta.partition_info.len() {
                let (_, part) = self.fetch(&handle, Some(partition)).await?;
                rows.extend(part.data.unwrap_or_default());
            }
        }

        info!(
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sql api statement finished"
        );
        Ok(QueryResult::new(columns, rows))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::ManagedSession
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_bindings_are_one_based_text() {
        let params = vec![
            BindValue::from("Pune"),
            BindValue::Int(3),
            BindValue::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()),
            BindValue::Float(f64::NAN),
        ];
        let b = bindings(&params);
        assert_eq!(b["1"], Binding { kind: "TEXT", value: Some("Pune".into()) });
        assert_eq!(b["2"], Binding { kind: "FIXED", value: Some("3".into()) });
        assert_eq!(b["3"].value.as_deref(), Some("2024-01-31"));
        assert_eq!(b["4"].value, None);
    }

    #[test]
    fn test_request_omits_empty_bindings() {
        let body = StatementRequest {
            statement: "SELECT 1",
            timeout: 60,
            database: None,
            schema: None,
            warehouse: None,
            role: None,
            bindings: BTreeMap::new(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("bindings").is_none());
        assert_eq!(json["timeout"], 60);
    }

    #[test]
    fn test_response_parses_row_type() {
        let json = r#"{
            "code": "090001",
            "statementHandle": "01b2-abc",
            "resultSetMetaData": {
                "numRows": 1,
                "rowType": [{"name": "CITY", "type": "text"}, {"name": "GMV", "type": "fixed"}],
                "partitionInfo": [{"rowCount": 1}]
            },
            "data": [["Pune", "1200.50"]]
        }"#;
        let resp: StatementResponse = serde_json::from_str(json).unwrap();
        let meta = resp.result_set_meta_data.unwrap();
        assert_eq!(meta.row_type[1].kind, "fixed");
        assert_eq!(resp.data.unwrap()[0][1], "1200.50");
    }

    #[test]
    fn test_discover_without_token_is_auth_error() {
        let result = ManagedSession::discover_at(Path::new("/nonexistent/session/token"));
        assert!(matches!(result, Err(WarehouseError::Auth(_))));
    }
}
