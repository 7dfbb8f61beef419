//! Safe subprocess execution.
//!
//! Runs external commands with no shell interpretation, captured
//! stdout/stderr, and a hard deadline. A process that outlives its
//! deadline is killed and reaped.

use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{CommandErrorKind, DaemonError};

/// How often a running child is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn execution_error(message: String) -> DaemonError {
    DaemonError::Command {
        kind: CommandErrorKind::ExecutionFailed { message },
    }
}

/// Result of a subprocess execution.
#[derive(Debug, Clone)]
pub struct SubprocessResult {
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
    /// The exit code, if available.
    pub exit_code: Option<i32>,
    /// Captured stdout as a string.
    pub stdout: String,
    /// Captured stderr as a string.
    pub stderr: String,
}

impl From<Output> for SubprocessResult {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Builder for subprocess execution.
pub struct SubprocessBuilder {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl SubprocessBuilder {
    /// Create a new subprocess builder.
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Add arguments to the command.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Set the deadline for the command.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute the command and wait for completion, enforcing the deadline.
    pub fn run(self) -> Result<SubprocessResult, DaemonError> {
        debug!(
            program = %self.program,
            args = ?self.args,
            timeout_secs = self.timeout.as_secs(),
            "Executing subprocess"
        );

        let started = Instant::now();
        let deadline = started + self.timeout;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| execution_error(format!("Failed to spawn {}: {}", self.program, e)))?;

        loop {
            let exited = child
                .try_wait()
                .map_err(|e| execution_error(format!("Failed to check process status: {}", e)))?
                .is_some();

            if exited {
                let output = child.wait_with_output().map_err(|e| {
                    execution_error(format!("Failed to get output from {}: {}", self.program, e))
                })?;
                let result = SubprocessResult::from(output);
                debug!(
                    success = result.success,
                    exit_code = ?result.exit_code,
                    duration_ms = started.elapsed().as_millis(),
                    "Subprocess completed"
                );
                return Ok(result);
            }

            if Instant::now() >= deadline {
                warn!(
                    program = %self.program,
                    timeout_secs = self.timeout.as_secs(),
                    "Process deadline exceeded, killing"
                );
                if let Err(e) = child.kill() {
                    warn!(error = %e, "Failed to kill timed-out process");
                }
                // Reap the zombie
                let _ = child.wait();
                return Err(DaemonError::Command {
                    kind: CommandErrorKind::Timeout {
                        timeout_secs: self.timeout.as_secs(),
                    },
                });
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Run a command with the given arguments and deadline.
///
/// Convenience wrapper around [`SubprocessBuilder`] for simple
/// invocations.
pub fn run_command(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<SubprocessResult, DaemonError> {
    SubprocessBuilder::new(program)
        .args(args.iter().copied())
        .timeout(timeout)
        .run()
}
