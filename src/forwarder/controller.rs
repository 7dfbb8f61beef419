//! Service controller for the forwarder unit.

use std::time::Duration;

use tracing::{info, warn};

use crate::config::ForwarderConfig;
use crate::error::{CommandErrorKind, DaemonError};
use crate::executor::{sanitize_output, SubprocessBuilder};

use super::command::ServiceCommand;

/// Controls a single systemd unit through the system service manager.
///
/// The unit name and the service-control program come from
/// configuration; the same instance is shared by every registration
/// point that needs to drive the unit. The controller issues exactly
/// one invocation per [`apply`](Self::apply) call and holds no state of
/// its own. Systemd remains the owner of the unit's state and the
/// serialization point for concurrent requests.
#[derive(Debug, Clone)]
pub struct ServiceController {
    unit: String,
    program: String,
    timeout: Duration,
}

impl ServiceController {
    /// Create a controller for the given unit.
    pub fn new(unit: &str, program: &str, timeout: Duration) -> Self {
        Self {
            unit: unit.to_string(),
            program: program.to_string(),
            timeout,
        }
    }

    /// Create a controller from daemon configuration.
    pub fn from_config(config: &ForwarderConfig) -> Self {
        Self::new(
            &config.unit,
            &config.program,
            Duration::from_secs(config.timeout_seconds),
        )
    }

    /// The unit this controller manages.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Request a state transition for the unit.
    ///
    /// Start and stop are idempotent (systemd treats repeated requests
    /// as no-ops); restart always cycles the unit. A spawn failure or a
    /// non-zero exit is returned to the caller, never swallowed here,
    /// so callers can tell "state changed" from "attempt failed".
    pub fn apply(&self, command: ServiceCommand) -> Result<(), DaemonError> {
        info!(
            unit = %self.unit,
            command = %command,
            "Applying service transition"
        );

        let result = SubprocessBuilder::new(&self.program)
            .arg(command.verb())
            .arg(&self.unit)
            .timeout(self.timeout)
            .run()?;

        if !result.success {
            warn!(
                unit = %self.unit,
                command = %command,
                exit_code = ?result.exit_code,
                "Service transition failed"
            );
            return Err(DaemonError::Command {
                kind: CommandErrorKind::ExecutionFailed {
                    message: format!(
                        "{} {} {} failed: {}",
                        self.program,
                        command.verb(),
                        self.unit,
                        sanitize_output(&result.stderr, 5)
                    ),
                },
            });
        }

        info!(
            unit = %self.unit,
            command = %command,
            "Service transition applied"
        );

        Ok(())
    }
}
