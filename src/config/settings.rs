//! Configuration settings for the socks-bridge daemon.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::DaemonError;

/// Main configuration structure for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub socket: SocketConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub forwarder: ForwarderConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Socket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SocketConfig {
    /// Path to the Unix socket file.
    pub path: PathBuf,
    /// Socket file permissions (e.g., "0660").
    #[serde(default = "default_socket_permissions")]
    pub permissions: String,
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    /// List of allowed peer UIDs. An empty list rejects all peers.
    #[serde(default)]
    pub allowed_peer_uids: Vec<u32>,
}

/// Forwarder unit configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ForwarderConfig {
    /// Systemd unit controlled by the daemon.
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Service-control program invoked for state transitions.
    #[serde(default = "default_systemctl")]
    pub program: String,
    /// Timeout for a single state transition in seconds.
    #[serde(default = "default_control_timeout")]
    pub timeout_seconds: u64,
}

/// Diagnostics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticsConfig {
    /// Diagnostic tool invoked for readings; output is captured verbatim.
    #[serde(default = "default_hci_tool")]
    pub program: String,
    /// Timeout for a diagnostic read in seconds.
    #[serde(default = "default_diagnostic_timeout")]
    pub timeout_seconds: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Limits configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Socket read/write timeout in seconds.
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout_seconds: u64,
    /// Maximum concurrent connections.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

// Default value functions
fn default_socket_permissions() -> String {
    "0660".to_string()
}

fn default_unit() -> String {
    "socks-forwarder".to_string()
}

fn default_systemctl() -> String {
    "systemctl".to_string()
}

fn default_control_timeout() -> u64 {
    120
}

fn default_hci_tool() -> String {
    "hciconfig".to_string()
}

fn default_diagnostic_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_max_message_size() -> usize {
    65_536 // requests here are tiny
}

fn default_socket_timeout() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    16
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            unit: default_unit(),
            program: default_systemctl(),
            timeout_seconds: default_control_timeout(),
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            program: default_hci_tool(),
            timeout_seconds: default_diagnostic_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            socket_timeout_seconds: default_socket_timeout(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DaemonError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DaemonError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        let settings: Settings = toml::from_str(&content).map_err(|e| DaemonError::Config {
            message: format!("Failed to parse config file '{}': {}", path.display(), e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), DaemonError> {
        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(DaemonError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        // Validate log format
        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(DaemonError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        // Validate socket permissions format
        if !self.socket.permissions.chars().all(|c| c.is_ascii_digit()) {
            return Err(DaemonError::Config {
                message: format!(
                    "Invalid socket permissions '{}'. Must be octal (e.g., '0660')",
                    self.socket.permissions
                ),
            });
        }

        validate_unit_name(&self.forwarder.unit)?;

        Ok(())
    }
}

/// Validate the configured unit name.
///
/// The unit name is passed as a positional argument to the
/// service-control program, so it must never be empty and must stay
/// within the systemd unit-name character set.
fn validate_unit_name(unit: &str) -> Result<(), DaemonError> {
    if unit.is_empty() {
        return Err(DaemonError::Config {
            message: "Forwarder unit name cannot be empty".to_string(),
        });
    }

    let valid = unit
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | ':'));
    if !valid || unit.starts_with('-') {
        return Err(DaemonError::Config {
            message: format!("Invalid forwarder unit name '{}'", unit),
        });
    }

    Ok(())
}
