//! Protocol types for the driver worker.
//!
//! One JSON object per line in each direction; responses are correlated to
//! requests by `id`.

use serde::{Deserialize, Serialize};

use super::result::{Column, QueryResult};

/// Request envelope sent to the worker.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEnvelope {
    /// Unique request ID for correlation.
    pub id: String,
    /// Method name (e.g., "query.execute").
    pub method: String,
    /// Method-specific parameters.
    pub params: serde_json::Value,
}

/// Response envelope received from the worker.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    pub id: String,
    pub success: bool,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<ErrorInfo>,
}

/// Error information in a failed response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

/// Database connection parameters, flattened into every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Driver name ("snowflake" or "duckdb").
    pub driver: String,
    /// Driver-specific connection string.
    pub connection_string: String,
}

/// Parameters for `query.execute`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteQueryParams {
    #[serde(flatten)]
    pub connection: ConnectionParams,
    pub sql: String,
    /// Positional bind values for `?` placeholders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<serde_json::Value>>,
}

/// Parameters for `connection.ping`.
#[derive(Debug, Clone, Serialize)]
pub struct PingParams {
    #[serde(flatten)]
    pub connection: ConnectionParams,
}

/// Response from `query.execute`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteQueryResponse {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    pub row_count: i64,
}

impl From<ExecuteQueryResponse> for QueryResult {
    fn from(resp: ExecuteQueryResponse) -> Self {
        QueryResult::new(resp.columns, resp.rows)
    }
}

/// Response from `connection.ping`.
#[derive(Debug, Clone, Deserialize)]
pub struct PingResponse {
    #[serde(default)]
    pub server_version: Option<String>,
}

/// Worker method names.
pub mod methods {
    pub const EXECUTE_QUERY: &str = "query.execute";
    pub const PING: &str = "connection.ping";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_params_flatten_connection() {
        let params = ExecuteQueryParams {
            connection: ConnectionParams {
                driver: "duckdb".into(),
                connection_string: "./extract.duckdb".into(),
            },
            sql: "SELECT CITY FROM V_PLATFORM_PROFITABILITY WHERE CITY IN (?)".into(),
            args: Some(vec![serde_json::json!("Pune")]),
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["driver"], "duckdb");
        assert_eq!(json["args"][0], "Pune");
    }

    #[test]
    fn test_args_omitted_when_absent() {
        let params = ExecuteQueryParams {
            connection: ConnectionParams {
                driver: "duckdb".into(),
                connection_string: "x".into(),
            },
            sql: "SELECT 1".into(),
            args: None,
        };
        let json = serde_json::to_string(&params).unwrap();
        assert!(!json.contains("args"));
    }

    #[test]
    fn test_response_envelope_deserialization() {
        let json = r#"{
            "id": "req-1",
            "success": true,
            "result": {"columns": [{"name": "CITY", "data_type": "TEXT"}], "rows": [["Pune"]], "row_count": 1}
        }"#;
        let response: ResponseEnvelope = serde_json::from_str(json).unwrap();
        assert!(response.success);
        let result: ExecuteQueryResponse =
            serde_json::from_value(response.result.unwrap()).unwrap();
        let result = QueryResult::from(result);
        assert_eq!(result.row_count(), 1);
        assert_eq!(result.columns[0].name, "CITY");
    }

    #[test]
    fn test_error_response_deserialization() {
        let json = r#"{"id": "req-2", "success": false,
            "error": {"code": "CONNECTION_FAILED", "message": "Unable to connect"}}"#;
        let response: ResponseEnvelope = serde_json::from_str(json).unwrap();
        assert!(!response.success);
        assert_eq!(response.error.unwrap().code, "CONNECTION_FAILED");
    }
}
