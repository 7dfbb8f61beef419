//! Command registry for dispatching requests to handlers.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{CommandErrorKind, DaemonError};
use crate::forwarder::{HciProbe, ServiceController};

use super::forwarder::{ControlForwarderCommand, ForwarderReadingsCommand};
use super::system::PingCommand;
use super::traits::Command;
use super::types::{CommandParams, CommandResult, ExecutionContext};

/// Registry of all available commands.
///
/// Every registration point shares the same controller and probe
/// instances; the registry holds no other state.
#[derive(Clone)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create a new command registry with all built-in commands.
    pub fn new(controller: Arc<ServiceController>, probe: Arc<HciProbe>) -> Self {
        let mut registry = Self {
            commands: HashMap::new(),
        };

        // System commands
        registry.register(Arc::new(PingCommand));

        // Forwarder commands
        registry.register(Arc::new(ControlForwarderCommand::new(controller)));
        registry.register(Arc::new(ForwarderReadingsCommand::new(probe)));

        info!(
            count = registry.commands.len(),
            "Command registry initialized"
        );

        registry
    }

    /// Register a command.
    fn register(&mut self, command: Arc<dyn Command>) {
        let name = command.name();
        debug!(command = name, "Registering command");
        self.commands.insert(name, command);
    }

    /// Get a command by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    /// Dispatch a request to the appropriate command handler.
    pub fn dispatch(
        &self,
        ctx: &ExecutionContext,
        command_name: &str,
        params: CommandParams,
    ) -> Result<CommandResult, DaemonError> {
        let command = self
            .commands
            .get(command_name)
            .ok_or_else(|| DaemonError::Command {
                kind: CommandErrorKind::UnknownCommand {
                    name: command_name.to_string(),
                },
            })?;

        // Validate parameters before touching anything external
        command.validate(&params)?;

        command.execute(ctx, params)
    }

    /// List all registered command names.
    pub fn list_commands(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        // Default configuration - mainly for testing
        let controller = Arc::new(ServiceController::from_config(&Default::default()));
        let probe = Arc::new(HciProbe::from_config(&Default::default()));
        Self::new(controller, probe)
    }
}
