//! Warehouse error types.

use std::io;
use thiserror::Error;

use crate::config::{ConnectionError, SettingsError};

/// Result type for warehouse operations.
pub type WarehouseResult<T> = Result<T, WarehouseError>;

/// Errors raised while connecting to or querying the warehouse.
#[derive(Error, Debug)]
pub enum WarehouseError {
    /// Failed to spawn the driver worker process.
    #[error("failed to spawn worker process: {0}")]
    SpawnFailed(#[source] io::Error),

    /// Failed to write to worker stdin.
    #[error("failed to write to worker: {0}")]
    WriteFailed(#[source] io::Error),

    /// Failed to serialize a request.
    #[error("failed to serialize request: {0}")]
    SerializeFailed(#[source] serde_json::Error),

    /// Failed to decode a response.
    #[error("failed to decode response: {0}")]
    DecodeFailed(String),

    /// Request timed out waiting for a response.
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// Worker process exited unexpectedly.
    #[error("worker process exited unexpectedly")]
    WorkerExited,

    /// Response channel was closed (internal error).
    #[error("response channel closed unexpectedly")]
    ChannelClosed,

    /// The backend reported a failed statement.
    #[error("warehouse error: {message} (code: {code})")]
    Remote { code: String, message: String },

    /// Could not establish a connection.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// HTTP transport failure against the SQL API.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Managed session token missing or rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Credentials missing or malformed.
    #[error("credentials unavailable: {0}")]
    Credentials(String),

    /// Neither the managed session nor the credential connection worked.
    #[error("unable to connect to the warehouse (managed session: {managed}; credentials: {credentials})")]
    Unavailable { managed: String, credentials: String },
}

impl WarehouseError {
    /// Create a remote error from an error response.
    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Check if this error indicates the worker has exited.
    pub fn is_worker_exited(&self) -> bool {
        matches!(self, Self::WorkerExited | Self::ChannelClosed)
    }

    /// Whether a retry could plausibly succeed. Nothing retries automatically.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::WorkerExited | Self::ChannelClosed
        )
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for WarehouseError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Self::ChannelClosed
    }
}

impl From<SettingsError> for WarehouseError {
    fn from(err: SettingsError) -> Self {
        Self::Credentials(err.to_string())
    }
}

impl From<ConnectionError> for WarehouseError {
    fn from(err: ConnectionError) -> Self {
        Self::Credentials(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable() {
        assert!(WarehouseError::Timeout(5).is_retriable());
        assert!(WarehouseError::WorkerExited.is_retriable());
        assert!(!WarehouseError::remote("002003", "no such table").is_retriable());
        assert!(!WarehouseError::Auth("expired".into()).is_retriable());
    }

    #[test]
    fn test_unavailable_message_names_both_paths() {
        let err = WarehouseError::Unavailable {
            managed: "no session token".into(),
            credentials: "missing secret: password".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("no session token"));
        assert!(msg.contains("missing secret: password"));
    }
}
