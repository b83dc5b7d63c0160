use std::sync::Arc;

use async_trait::async_trait;

use crate::command::{CommandChain, CommandDeclaration, CommandDefinition};
use crate::plugin::{ALYX_PLUGIN_SERIAL, Plugin, plugin_identifier};

/// Answers `ping` with `Pong!`.
pub struct PingCommandsPlugin {
    identifier: String,
}

impl PingCommandsPlugin {
    pub const NAME: &'static str = "PingCommandsPlugin";

    pub fn new() -> Self {
        Self {
            identifier: plugin_identifier(ALYX_PLUGIN_SERIAL, Self::NAME),
        }
    }
}

impl Default for PingCommandsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for PingCommandsPlugin {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn commands(self: Arc<Self>) -> Vec<CommandDefinition> {
        vec![
            CommandChain::of(CommandDeclaration::new("ping").description("Checks that the bot is alive"))
                .handler_without_context(|| async { "Pong!" }),
        ]
    }
}
