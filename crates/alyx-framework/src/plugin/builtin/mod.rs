//! Plugins that ship with the framework.
//!
//! | Plugin | Guarded | Commands |
//! |--------|---------|----------|
//! | [`PluginManagerPlugin`] | yes | `plugins list`, `plugins load <name>`, `plugins unload <name>` |
//! | [`AdminCommandsPlugin`] | yes | `shutdown`, `shutdown now` |
//! | [`PingCommandsPlugin`] | no | `ping` |
//!
//! The runtime registers and loads all three at launch.

mod admin;
mod ping;
mod plugin_manager;

use std::sync::Arc;

pub use admin::AdminCommandsPlugin;
pub use ping::PingCommandsPlugin;
pub use plugin_manager::PluginManagerPlugin;

use super::BoxedPlugin;

/// One fresh instance of every built-in plugin, in load order.
pub fn builtin_plugins() -> Vec<BoxedPlugin> {
    vec![
        Arc::new(PluginManagerPlugin::new()),
        Arc::new(AdminCommandsPlugin::new()),
        Arc::new(PingCommandsPlugin::new()),
    ]
}
