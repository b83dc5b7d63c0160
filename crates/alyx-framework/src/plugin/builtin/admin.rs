use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use alyx_core::{PermissionLevel, Reply};

use crate::command::{CommandChain, CommandDeclaration, CommandDefinition};
use crate::context::CommandContext;
use crate::error::CommandResult;
use crate::interactive::yes_or_no;
use crate::plugin::{ALYX_PLUGIN_SERIAL, Plugin, plugin_identifier};

const CONFIRM_TIMEOUT: Duration = Duration::from_secs(15);

/// Bot administration: `shutdown` with confirmation, `shutdown now` without.
pub struct AdminCommandsPlugin {
    identifier: String,
}

impl AdminCommandsPlugin {
    pub const NAME: &'static str = "AlyxAdminCommands";

    pub fn new() -> Self {
        Self {
            identifier: plugin_identifier(ALYX_PLUGIN_SERIAL, Self::NAME),
        }
    }

    async fn shutdown(self: Arc<Self>, ctx: CommandContext) -> CommandResult {
        let answer = yes_or_no(&ctx, "Confirm shutdown", CONFIRM_TIMEOUT).await?;
        tokio::spawn(async move {
            match answer.await {
                Some(true) => {
                    if let Err(e) = ctx.reply("Shutting down... :wave:").await {
                        warn!(error = %e, "Failed to announce shutdown");
                    }
                    info!(user = %ctx.author().id, "Shutdown confirmed");
                    ctx.host().request_shutdown();
                }
                Some(false) => info!(user = %ctx.author().id, "Shutdown declined"),
                None => info!(user = %ctx.author().id, "Shutdown confirmation timed out"),
            }
        });
        Ok(())
    }

    async fn shutdown_now(self: Arc<Self>, ctx: CommandContext) -> CommandResult {
        info!(user = %ctx.author().id, "Immediate shutdown requested");
        ctx.react(Reply::SUCCESS_EMOJI).await?;
        ctx.host().request_shutdown();
        Ok(())
    }
}

impl Default for AdminCommandsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for AdminCommandsPlugin {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn guarded(&self) -> bool {
        true
    }

    fn commands(self: Arc<Self>) -> Vec<CommandDefinition> {
        vec![
            CommandChain::of(
                CommandDeclaration::new("shutdown")
                    .level(PermissionLevel::BotAdmin)
                    .description("Shuts the bot down after confirmation"),
            )
            .method(Arc::clone(&self), Self::shutdown),
            CommandChain::of(CommandDeclaration::new("shutdown"))
                .then(
                    CommandDeclaration::new("now")
                        .level(PermissionLevel::BotAdmin)
                        .description("Shuts the bot down immediately"),
                )
                .method(self, Self::shutdown_now),
        ]
    }
}
