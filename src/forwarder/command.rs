//! Logical commands accepted by the service controller.

use std::fmt;
use std::str::FromStr;

use crate::error::{DaemonError, ValidationErrorKind};

/// A state transition request for the forwarder unit.
///
/// This is the full set of transitions the daemon understands. Parsing
/// rejects anything else before any external process is spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCommand {
    /// Idempotently start the unit.
    Start,
    /// Idempotently stop the unit.
    Stop,
    /// Unconditionally cycle the unit, whatever its current state.
    Restart,
}

impl ServiceCommand {
    /// The verb passed to the service-control program.
    pub fn verb(&self) -> &'static str {
        match self {
            ServiceCommand::Start => "start",
            ServiceCommand::Stop => "stop",
            ServiceCommand::Restart => "restart",
        }
    }
}

impl fmt::Display for ServiceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

impl FromStr for ServiceCommand {
    type Err = DaemonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(ServiceCommand::Start),
            "stop" => Ok(ServiceCommand::Stop),
            "restart" => Ok(ServiceCommand::Restart),
            other => Err(DaemonError::Validation {
                kind: ValidationErrorKind::UnrecognizedCommand {
                    command: other.to_string(),
                },
            }),
        }
    }
}
