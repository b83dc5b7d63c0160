use std::sync::Arc;

use async_trait::async_trait;

use alyx_core::{PermissionLevel, Reply};

use crate::command::{CommandChain, CommandDeclaration, CommandDefinition};
use crate::context::CommandContext;
use crate::error::{CommandError, CommandResult};
use crate::plugin::{ALYX_PLUGIN_SERIAL, Plugin, PluginInfo, plugin_identifier};

const NOT_FOUND: &str = "No plugin with that name was found.";

/// Lists, loads and unloads plugins from chat.
///
/// Plugins are addressed by display name. Guarded plugins stay loaded.
pub struct PluginManagerPlugin {
    identifier: String,
}

impl PluginManagerPlugin {
    pub const NAME: &'static str = "AlyxPluginManager";

    pub fn new() -> Self {
        Self {
            identifier: plugin_identifier(ALYX_PLUGIN_SERIAL, Self::NAME),
        }
    }

    async fn list(self: Arc<Self>, ctx: CommandContext) -> String {
        ctx.host()
            .manager()
            .plugins()
            .await
            .iter()
            .map(|p| {
                let marker = if p.is_loaded() { Reply::SUCCESS_EMOJI } else { Reply::ERROR_EMOJI };
                format!("{marker} {}", p.name)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn load(self: Arc<Self>, ctx: CommandContext, name: String) -> CommandResult {
        let plugin = find(&ctx, &name).await?;
        ctx.host().manager().load(&plugin.identifier).await?;
        ctx.react(Reply::SUCCESS_EMOJI).await?;
        Ok(())
    }

    async fn unload(self: Arc<Self>, ctx: CommandContext, name: String) -> CommandResult {
        let plugin = find(&ctx, &name).await?;
        ctx.host().manager().unload(&plugin.identifier, false).await?;
        ctx.react(Reply::SUCCESS_EMOJI).await?;
        Ok(())
    }
}

impl Default for PluginManagerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

async fn find(ctx: &CommandContext, name: &str) -> CommandResult<PluginInfo> {
    ctx.host()
        .manager()
        .find_by_name(name)
        .await
        .ok_or_else(|| CommandError::rejected(NOT_FOUND))
}

#[async_trait]
impl Plugin for PluginManagerPlugin {
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
        let plugins = || CommandDeclaration::new("plugins");
        vec![
            CommandChain::of(plugins())
                .then(CommandDeclaration::new("list").description("Lists registered plugins"))
                .method(Arc::clone(&self), Self::list),
            CommandChain::of(plugins())
                .then(
                    CommandDeclaration::new("load")
                        .level(PermissionLevel::BotAdmin)
                        .description("Loads a registered plugin by name"),
                )
                .method(Arc::clone(&self), Self::load),
            CommandChain::of(plugins())
                .then(
                    CommandDeclaration::new("unload")
                        .level(PermissionLevel::BotAdmin)
                        .description("Unloads a plugin by name"),
                )
                .method(self, Self::unload),
        ]
    }
}
