//! Forwarder readings command.
//!
//! Serves the HCI diagnostic reading. Readings are best-effort
//! telemetry: a failed capture is logged and reported as an empty
//! reading rather than a hard failure.

use std::sync::Arc;

use tracing::warn;

use crate::commands::traits::Command;
use crate::commands::types::{CommandParams, CommandResult, ExecutionContext};
use crate::error::DaemonError;
use crate::forwarder::HciProbe;

/// Label under which the captured diagnostic text is returned.
const READING_KEY: &str = "hciconfig";

/// Return the HCI diagnostic reading.
pub struct ForwarderReadingsCommand {
    probe: Arc<HciProbe>,
}

impl ForwarderReadingsCommand {
    /// Create the readings command backed by the shared probe.
    pub fn new(probe: Arc<HciProbe>) -> Self {
        Self { probe }
    }
}

impl Command for ForwarderReadingsCommand {
    fn name(&self) -> &'static str {
        "forwarder.readings"
    }

    fn validate(&self, _params: &CommandParams) -> Result<(), DaemonError> {
        // Readings take no parameters
        Ok(())
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        _params: CommandParams,
    ) -> Result<CommandResult, DaemonError> {
        match self.probe.read() {
            Ok(text) => Ok(CommandResult::success(
                serde_json::json!({ READING_KEY: text }),
            )),
            Err(e) => {
                warn!(
                    request_id = %ctx.request_id,
                    error = %e,
                    "Diagnostic read failed, returning empty reading"
                );
                Ok(CommandResult::success(serde_json::json!({})))
            }
        }
    }
}
