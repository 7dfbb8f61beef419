//! Best-effort Bluetooth HCI diagnostics.

use std::time::Duration;

use tracing::debug;

use crate::config::DiagnosticsConfig;
use crate::error::{CommandErrorKind, DaemonError};
use crate::executor::{sanitize_output, SubprocessBuilder};

/// Captures the output of the HCI diagnostic tool.
///
/// The tool is invoked with no arguments and its stdout is returned
/// verbatim, with no parsing and no schema. Whether the tool is usable
/// is part of each call's result; the probe keeps no availability state.
#[derive(Debug, Clone)]
pub struct HciProbe {
    program: String,
    timeout: Duration,
}

impl HciProbe {
    /// Create a probe for the given diagnostic tool.
    pub fn new(program: &str, timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            timeout,
        }
    }

    /// Create a probe from daemon configuration.
    pub fn from_config(config: &DiagnosticsConfig) -> Self {
        Self::new(&config.program, Duration::from_secs(config.timeout_seconds))
    }

    /// Capture the diagnostic tool's stdout verbatim.
    ///
    /// Fails if the tool cannot be spawned or exits non-zero. The
    /// soft-failure policy for readings lives in the caller; the probe
    /// always surfaces the error.
    pub fn read(&self) -> Result<String, DaemonError> {
        let result = SubprocessBuilder::new(&self.program)
            .timeout(self.timeout)
            .run()?;

        if !result.success {
            return Err(DaemonError::Command {
                kind: CommandErrorKind::ExecutionFailed {
                    message: format!(
                        "{} failed: {}",
                        self.program,
                        sanitize_output(&result.stderr, 5)
                    ),
                },
            });
        }

        debug!(
            program = %self.program,
            bytes = result.stdout.len(),
            "Diagnostic reading captured"
        );

        Ok(result.stdout)
    }
}
