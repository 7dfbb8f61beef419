//! Command trait definition.

use crate::error::DaemonError;

use super::types::{CommandParams, CommandResult, ExecutionContext};

/// Core trait for all executable commands.
///
/// Every command the daemon can execute implements this trait. This is
/// the primary extension point for adding new functionality.
pub trait Command: Send + Sync {
    /// Unique command identifier (e.g., "forwarder.control").
    ///
    /// This is the name used in request messages to invoke this command.
    fn name(&self) -> &'static str;

    /// Validate the command parameters before execution.
    ///
    /// Called before `execute()`. Malformed input must fail here so no
    /// external process is ever spawned for it.
    fn validate(&self, params: &CommandParams) -> Result<(), DaemonError>;

    /// Execute the command.
    ///
    /// Note: this may be called from a blocking context via `spawn_blocking`.
    fn execute(
        &self,
        ctx: &ExecutionContext,
        params: CommandParams,
    ) -> Result<CommandResult, DaemonError>;
}
