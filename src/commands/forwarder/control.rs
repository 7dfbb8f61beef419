//! Forwarder control command.
//!
//! Translates a `{"command": "start"|"stop"|"restart"}` request into a
//! state transition on the configured unit.

use std::sync::Arc;

use tracing::{debug, info};

use crate::commands::traits::Command;
use crate::commands::types::{CommandParams, CommandResult, ExecutionContext};
use crate::error::{DaemonError, ValidationErrorKind};
use crate::forwarder::{ServiceCommand, ServiceController};

/// Start, stop or restart the forwarder unit.
pub struct ControlForwarderCommand {
    controller: Arc<ServiceController>,
}

impl ControlForwarderCommand {
    /// Create the control command backed by the shared controller.
    pub fn new(controller: Arc<ServiceController>) -> Self {
        Self { controller }
    }
}

/// Extract and parse the `"command"` parameter.
///
/// A missing key and an unrecognized value are distinct failures; both
/// are reported before any external process is spawned.
fn parse_command(params: &CommandParams) -> Result<ServiceCommand, DaemonError> {
    let value = params
        .get_optional_string("command")
        .ok_or(DaemonError::Validation {
            kind: ValidationErrorKind::MissingCommand,
        })?;
    value.parse()
}

impl Command for ControlForwarderCommand {
    fn name(&self) -> &'static str {
        "forwarder.control"
    }

    fn validate(&self, params: &CommandParams) -> Result<(), DaemonError> {
        parse_command(params).map(|_| ())
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        params: CommandParams,
    ) -> Result<CommandResult, DaemonError> {
        let command = parse_command(&params)?;

        debug!(
            request_id = %ctx.request_id,
            unit = %self.controller.unit(),
            command = %command,
            "Dispatching control command"
        );

        self.controller.apply(command)?;

        info!(
            request_id = %ctx.request_id,
            unit = %self.controller.unit(),
            command = %command,
            "Control command completed"
        );

        // Successful handling returns no payload
        Ok(CommandResult::success_empty())
    }
}
