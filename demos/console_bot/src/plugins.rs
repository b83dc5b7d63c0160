//! Sample plugins.

use std::collections::HashMap;

use alyx::prelude::*;
use alyx::framework::CommandError;
use serde::{Deserialize, Serialize};

const DEMO_SERIAL: u64 = 1;

pub fn demo_plugins() -> Vec<BoxedPlugin> {
    vec![Arc::new(MathPlugin::new()), Arc::new(CounterPlugin::new())]
}

// ============================================================================
// Math
// ============================================================================

/// `add <a> <b>` and `divide <a> <b>`.
pub struct MathPlugin {
    identifier: String,
}

impl MathPlugin {
    pub fn new() -> Self {
        Self {
            identifier: plugin_identifier(DEMO_SERIAL, "Math"),
        }
    }
}

impl Default for MathPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for MathPlugin {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn name(&self) -> &str {
        "Math"
    }

    fn commands(self: Arc<Self>) -> Vec<CommandDefinition> {
        vec![
            CommandChain::of(
                CommandDeclaration::new("add")
                    .alias("plus")
                    .description("Adds two numbers"),
            )
            .handler_without_context(|a: f64, b: f64| async move { format!("{}", a + b) }),
            CommandChain::of(CommandDeclaration::new("divide").description("Divides a by b"))
                .handler_without_context(|a: f64, b: f64| async move {
                    if b == 0.0 {
                        return Err(CommandError::rejected("Cannot divide by zero."));
                    }
                    Ok(format!("{}", a / b))
                }),
        ]
    }
}

// ============================================================================
// Counter
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Tally {
    pub total: u64,
    pub by_user: HashMap<UserId, u64>,
}

/// A persisted counter: `count`, `count show`, `count reset`.
pub struct CounterPlugin {
    data: PluginData<Tally>,
}

impl CounterPlugin {
    pub fn new() -> Self {
        Self {
            data: PluginData::new(plugin_identifier(DEMO_SERIAL, "Counter")),
        }
    }

    async fn count(self: Arc<Self>, ctx: CommandContext) -> String {
        let mut tally = self.data.write();
        tally.total += 1;
        let total = tally.total;
        let mine = tally.by_user.entry(ctx.author().id).or_default();
        *mine += 1;
        format!("Counted! You: {mine}, everyone: {total}")
    }

    async fn show(self: Arc<Self>) -> String {
        format!("Total: {}", self.data.read().total)
    }

    async fn reset(self: Arc<Self>) -> Reply {
        *self.data.write() = Tally::default();
        Reply::success("Counter reset.")
    }
}

impl Default for CounterPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for CounterPlugin {
    fn identifier(&self) -> &str {
        self.data.identifier()
    }

    fn name(&self) -> &str {
        "Counter"
    }

    fn commands(self: Arc<Self>) -> Vec<CommandDefinition> {
        let show = Arc::clone(&self);
        let reset = Arc::clone(&self);
        vec![
            CommandChain::of(CommandDeclaration::new("count")).method(self, Self::count),
            CommandChain::of(CommandDeclaration::new("count"))
                .then(CommandDeclaration::new("show").alias("total"))
                .handler_without_context(move || Arc::clone(&show).show()),
            CommandChain::of(CommandDeclaration::new("count"))
                .then(CommandDeclaration::new("reset").level(PermissionLevel::BotAdmin))
                .handler_without_context(move || Arc::clone(&reset).reset()),
        ]
    }

    async fn on_load(&self, host: &PluginHost) -> Result<(), BoxError> {
        if !self.data.load(host.store().as_ref()).await? {
            info!(plugin = %self.identifier(), "No saved tally, starting from zero");
        }
        Ok(())
    }

    async fn on_unload(&self, host: &PluginHost) -> Result<(), BoxError> {
        self.data.save(host.store().as_ref()).await?;
        Ok(())
    }

    async fn on_shutdown(&self, host: &PluginHost) -> Result<(), BoxError> {
        self.data.save(host.store().as_ref()).await?;
        Ok(())
    }
}
