//! # Alyx
//!
//! A plugin-based command framework for chat bots.
//!
//! ## Overview
//!
//! Plugins declare commands as chains of words with typed parameters. The
//! dispatcher picks the longest matching chain, checks who may run it, parses
//! the arguments and calls the handler. Plugins are registered, loaded and
//! unloaded at runtime and get a bounded window to save their state when the
//! bot shuts down.
//!
//! ```text
//! ┌──────────┐   events   ┌────────────┐  messages  ┌────────────────────┐
//! │ Gateway  │──────────▶│  AlyxBot   │──────────▶│ CommandDispatcher  │──▶ plugin handlers
//! │          │◀──────────│            │──────────▶│ EventWaiter        │──▶ pending waits
//! └──────────┘  replies   └────────────┘  all events └────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use alyx::prelude::*;
//!
//! struct Greeter;
//!
//! impl Greeter {
//!     async fn greet(self: Arc<Self>, ctx: CommandContext, name: String) -> String {
//!         format!("Hello, {name}! I'm {}.", ctx.gateway().self_user().name)
//!     }
//! }
//!
//! #[async_trait]
//! impl Plugin for Greeter {
//!     fn identifier(&self) -> &str { "1.Greeter" }
//!     fn name(&self) -> &str { "Greeter" }
//!
//!     fn commands(self: Arc<Self>) -> Vec<CommandDefinition> {
//!         vec![CommandChain::of(CommandDeclaration::new("greet").alias("hi"))
//!             .method(self, Self::greet)]
//!     }
//! }
//! ```
//!
//! ## Features
//!
//! - `builtin-plugins` *(default)*: plugin manager, admin and ping commands
//! - `toml-config` *(default)*: `alyx.toml` configuration files
//! - `yaml-config`: `alyx.yaml` configuration files
//! - `json-log`: JSON log output
//! - `test-util`: the in-memory `MockGateway`

pub use alyx_core as core;
pub use alyx_framework as framework;
pub use alyx_runtime as runtime;

/// Everything needed to write a plugin and run a bot.
///
/// ```rust,ignore
/// use alyx::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    pub use async_trait::async_trait;

    // Runtime
    pub use alyx_runtime::{AlyxBot, AlyxConfig, ConfigLoader, JsonFileStore};

    // Plugins and commands
    pub use alyx_framework::prelude::*;
    pub use alyx_framework::{BoxedPlugin, MemoryStore, PluginStore};

    // Gateway vocabulary
    pub use alyx_core::{
        BoxedEvent, BoxedGateway, ChannelId, Event, Gateway, GuildId, MessageEvent, ReactionEvent,
        User, UserId,
    };

    // Logging macros
    pub use alyx_runtime::prelude::*;
}
