//! # Alyx Framework
//!
//! Command dispatch, plugin lifecycle and event waiting for Alyx bots.
//!
//! This layer provides:
//! - Declarative commands with multi-word chains, aliases and typed
//!   parameters ([`command`])
//! - Ordered, rule-based authorization ([`command::authorization`])
//! - Longest-match command selection and dispatch ([`dispatch`])
//! - A register/load/unload plugin lifecycle with guarded plugins and
//!   time-boxed shutdown ([`plugin`])
//! - Predicate-based waiting for follow-up events ([`waiter`],
//!   [`interactive`])
//!
//! The framework never talks to a chat service directly; everything goes
//! through the [`Gateway`](alyx_core::Gateway) trait from `alyx-core`.

pub mod command;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod interactive;
pub mod plugin;
pub mod waiter;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use command::{
    AccessPolicy, Command, CommandChain, CommandDeclaration, CommandDefinition, ParameterParser,
    ParserRegistry,
};
pub use context::CommandContext;
pub use dispatch::{CommandDispatcher, CommandRegistry, DispatchOutcome};
pub use error::{
    BoxError, CommandError, CommandParseError, CommandResult, PluginError, PluginResult,
    StoreError, WaiterError,
};
pub use interactive::yes_or_no;
pub use plugin::{
    ALYX_PLUGIN_SERIAL, BoxedPlugin, BoxedStore, MemoryStore, Plugin, PluginData, PluginHost,
    PluginInfo, PluginLoadState, PluginManager, PluginStore, ShutdownFailure, ShutdownReport,
    plugin_identifier,
};
pub use waiter::{EventWaiter, WaitFor};

/// Everything a plugin author usually needs.
pub mod prelude {
    pub use crate::command::{CommandChain, CommandDeclaration, CommandDefinition};
    pub use crate::context::CommandContext;
    pub use crate::error::{BoxError, CommandError, CommandResult};
    pub use crate::interactive::yes_or_no;
    pub use crate::plugin::{Plugin, PluginData, PluginHost, plugin_identifier};
    pub use alyx_core::{Permission, PermissionLevel, Reply};
}
