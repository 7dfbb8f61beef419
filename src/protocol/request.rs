//! Request types for the daemon protocol.

use serde::{Deserialize, Serialize};

/// A request from a client.
///
/// The daemon trusts local peers by UID (see the auth module), so
/// requests carry no signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// The command to execute (e.g., "forwarder.control").
    pub command: String,

    /// Command parameters as a JSON object.
    #[serde(default)]
    pub params: serde_json::Value,
}

impl Request {
    /// Create a new request with empty parameters (for testing purposes).
    #[cfg(test)]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            params: serde_json::json!({}),
        }
    }

    /// Add a parameter to the request (builder pattern, for testing).
    #[cfg(test)]
    pub fn with_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        if let Some(obj) = self.params.as_object_mut() {
            obj.insert(key.to_string(), value.into());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = Request::new("forwarder.control").with_param("command", "start");

        let json = serde_json::to_string(&request).unwrap();
        let parsed: Request = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.command, "forwarder.control");
        assert_eq!(parsed.params["command"], "start");
    }

    #[test]
    fn test_missing_params_defaults_to_null() {
        let parsed: Request = serde_json::from_str(r#"{"command": "system.ping"}"#).unwrap();
        assert_eq!(parsed.command, "system.ping");
        assert!(parsed.params.is_null());
    }

    #[test]
    fn test_missing_command_is_rejected() {
        let parsed = serde_json::from_str::<Request>(r#"{"params": {}}"#);
        assert!(parsed.is_err());
    }
}
