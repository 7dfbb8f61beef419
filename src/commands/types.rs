//! Command types: parameters, results, and execution context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::PeerInfo;

/// Wrapper around command parameters with helper methods.
#[derive(Debug, Clone)]
pub struct CommandParams {
    inner: serde_json::Value,
}

impl CommandParams {
    /// Create new command parameters from a JSON value.
    pub fn new(value: serde_json::Value) -> Self {
        Self { inner: value }
    }

    /// Get an optional string parameter.
    pub fn get_optional_string(&self, key: &str) -> Option<String> {
        self.inner
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Check if a parameter exists.
    pub fn has(&self, key: &str) -> bool {
        self.inner.get(key).is_some()
    }
}

impl From<serde_json::Value> for CommandParams {
    fn from(value: serde_json::Value) -> Self {
        Self::new(value)
    }
}

/// Result of command execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,
    /// Result data on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl CommandResult {
    /// Create a success result with data.
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }

    /// Create a success result with no payload.
    pub fn success_empty() -> Self {
        Self {
            success: true,
            data: None,
        }
    }
}

/// Execution context for a command.
///
/// Contains metadata about the request and the connected peer.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Unique identifier for this request.
    pub request_id: Uuid,
    /// Information about the connected peer.
    pub peer: PeerInfo,
    /// Timestamp when the request was received.
    pub timestamp: u64,
    /// The command being executed.
    pub command: String,
}

impl ExecutionContext {
    /// Create a new execution context.
    pub fn new(request_id: Uuid, peer: PeerInfo, timestamp: u64, command: String) -> Self {
        Self {
            request_id,
            peer,
            timestamp,
            command,
        }
    }
}
