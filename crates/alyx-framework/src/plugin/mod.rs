//! Plugin system for the Alyx framework.
//!
//! # Architecture
//!
//! A plugin is any type implementing [`Plugin`]. It bundles:
//!
//! - An identity: a globally unique [`identifier`](Plugin::identifier),
//!   conventionally `{serial}.{name}` (see [`plugin_identifier`]), and a
//!   display [`name`](Plugin::name).
//! - A list of **command definitions** returned from
//!   [`commands`](Plugin::commands), built with
//!   [`CommandChain`](crate::command::CommandChain).
//! - Optional **lifecycle hooks**: `on_register`, `on_load`, `on_unload` and
//!   `on_shutdown`.
//!
//! The [`PluginManager`] owns the registered set and moves each plugin
//! through `Registered → Loaded → Registered`. Plugins marked
//! [`guarded`](Plugin::guarded) refuse to unload unless the caller overrides
//! the guard.
//!
//! # Quick start
//!
//! ```rust,ignore
//! struct Greeter;
//!
//! #[async_trait]
//! impl Plugin for Greeter {
//!     fn identifier(&self) -> &str { "1.Greeter" }
//!     fn name(&self) -> &str { "Greeter" }
//!
//!     fn commands(self: Arc<Self>) -> Vec<CommandDefinition> {
//!         vec![CommandChain::of(CommandDeclaration::new("hello"))
//!             .handler(|ctx: CommandContext| async move {
//!                 format!("Hello, {}!", ctx.author().name)
//!             })]
//!     }
//! }
//! ```
//!
//! # Persisted state
//!
//! Hooks receive a [`PluginHost`], whose [`store`](PluginHost::store) is the
//! bot's [`PluginStore`]. The [`PluginData`] helper covers the usual pattern
//! of loading state in `on_load` and saving it in `on_unload` and
//! `on_shutdown`.

#[cfg(feature = "builtin-plugins")]
pub mod builtin;
pub mod manager;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::command::CommandDefinition;
use crate::error::BoxError;
use crate::waiter::EventWaiter;

pub use manager::{PluginInfo, PluginLoadState, PluginManager, ShutdownFailure, ShutdownReport};
pub use store::{BoxedStore, MemoryStore, PluginData, PluginStore};

/// Serial used by the plugins that ship with the framework.
pub const ALYX_PLUGIN_SERIAL: u64 = 239934148704337930;

/// Builds the conventional `{serial}.{name}` plugin identifier.
pub fn plugin_identifier(serial: u64, name: &str) -> String {
    format!("{serial}.{name}")
}

// ─── Plugin trait ─────────────────────────────────────────────────────────────

/// An extension module managed by the [`PluginManager`].
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Globally unique identity. Must not change over the plugin's lifetime.
    fn identifier(&self) -> &str;

    /// Display name, used by `plugins load <name>` and friends.
    fn name(&self) -> &str;

    /// Guarded plugins cannot be unloaded without an explicit override.
    fn guarded(&self) -> bool {
        false
    }

    /// Commands exposed while the plugin is loaded.
    ///
    /// Called once per load, so handlers may capture `self`.
    fn commands(self: Arc<Self>) -> Vec<CommandDefinition> {
        Vec::new()
    }

    async fn on_register(&self, _host: &PluginHost) -> Result<(), BoxError> {
        Ok(())
    }

    /// Runs after the plugin's commands are installed. By convention, loads
    /// persisted state or synthesizes a default.
    async fn on_load(&self, _host: &PluginHost) -> Result<(), BoxError> {
        Ok(())
    }

    /// Runs before the plugin's commands are removed. By convention, persists
    /// current state.
    async fn on_unload(&self, _host: &PluginHost) -> Result<(), BoxError> {
        Ok(())
    }

    /// Runs once during bot shutdown, under a per-plugin timeout.
    async fn on_shutdown(&self, _host: &PluginHost) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Shared plugin handle.
pub type BoxedPlugin = Arc<dyn Plugin>;

// ─── PluginHost ───────────────────────────────────────────────────────────────

/// What a plugin can reach: the manager, the event waiter, the data store and
/// the shutdown switch.
///
/// Handed to every lifecycle hook and available from
/// [`CommandContext::host`](crate::context::CommandContext::host).
#[derive(Clone)]
pub struct PluginHost {
    manager: Arc<PluginManager>,
}

impl PluginHost {
    pub(crate) fn new(manager: Arc<PluginManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<PluginManager> {
        &self.manager
    }

    pub fn waiter(&self) -> &Arc<EventWaiter> {
        self.manager.waiter()
    }

    pub fn store(&self) -> &BoxedStore {
        self.manager.store()
    }

    /// Asks the bot to shut down. The runtime's ingress loop observes this
    /// through [`shutdown_token`](Self::shutdown_token).
    pub fn request_shutdown(&self) {
        tracing::info!("Shutdown requested by plugin");
        self.manager.shutdown_token().cancel();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.manager.shutdown_token().is_cancelled()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.manager.shutdown_token().clone()
    }
}

impl std::fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHost").finish_non_exhaustive()
    }
}
