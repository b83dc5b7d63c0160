//! Plugin lifecycle management.
//!
//! [`PluginManager`] is the sole owner of plugin membership. It:
//!
//! - Accepts [`Plugin`]s through [`register`](PluginManager::register) with an
//!   initial state of [`PluginLoadState::Registered`].
//! - On [`load`](PluginManager::load), builds the plugin's commands against
//!   the [`ParserRegistry`] and installs them into the live
//!   [`CommandRegistry`] as one group, then runs `on_load`.
//! - On [`unload`](PluginManager::unload), runs `on_unload` and removes the
//!   group, refusing [guarded](Plugin::guarded) plugins unless overridden.
//! - Fans `on_shutdown` out to every registered plugin with a per-plugin
//!   timeout in [`shutdown_plugins`](PluginManager::shutdown_plugins).
//!
//! A hook error rolls its transition back and surfaces as
//! [`PluginError::HookFailed`].
//!
//! Transitions are serialized by an internal lock. Lifecycle hooks therefore
//! must not call `register`, `load` or `unload` themselves; command handlers
//! may.
//!
//! # Example
//!
//! ```rust,ignore
//! let manager = Arc::new(PluginManager::new(Arc::new(MemoryStore::new())));
//! manager.register(Arc::new(MyPlugin::default())).await?;
//! manager.load(MY_PLUGIN_ID).await?;
//! // …later…
//! let report = manager.shutdown_plugins(Duration::from_secs(30)).await;
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future;
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, RwLock as AsyncRwLock};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Level, debug, info, span, warn};

use super::store::BoxedStore;
use super::{BoxedPlugin, PluginHost};
use crate::command::{Command, ParameterParser, ParserRegistry};
use crate::dispatch::CommandRegistry;
use crate::error::{PluginError, PluginResult};
use crate::waiter::EventWaiter;

/// Load state of a registered plugin.
///
/// ```text
/// register() ──► Registered
///     load() ──► Loaded      (commands installed, on_load succeeded)
///   unload() ──► Registered  (on_unload succeeded, commands removed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginLoadState {
    Registered,
    Loaded,
}

/// Snapshot of one registered plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub identifier: String,
    pub name: String,
    pub guarded: bool,
    pub state: PluginLoadState,
    /// Number of live commands; zero unless loaded.
    pub commands: usize,
}

impl PluginInfo {
    pub fn is_loaded(&self) -> bool {
        self.state == PluginLoadState::Loaded
    }
}

// =============================================================================
// Shutdown report
// =============================================================================

/// Why a plugin's `on_shutdown` did not complete cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShutdownFailure {
    #[error("timed out")]
    TimedOut,
    #[error("failed: {0}")]
    Failed(String),
    #[error("panicked")]
    Panicked,
}

/// Outcome of [`PluginManager::shutdown_plugins`].
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Identifiers of plugins whose hook returned `Ok`.
    pub completed: Vec<String>,
    pub failed: Vec<(String, ShutdownFailure)>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

// =============================================================================
// PluginManager
// =============================================================================

struct PluginEntry {
    plugin: BoxedPlugin,
    state: PluginLoadState,
}

/// Central manager for plugin registration and lifecycle.
///
/// Also owns the collaborators plugins reach through their [`PluginHost`]:
/// the [`EventWaiter`], the [`PluginStore`](super::PluginStore) and the
/// shutdown token.
pub struct PluginManager {
    plugins: AsyncRwLock<Vec<PluginEntry>>,
    transitions: AsyncMutex<()>,
    registry: CommandRegistry,
    parsers: RwLock<ParserRegistry>,
    waiter: Arc<EventWaiter>,
    store: BoxedStore,
    shutdown: CancellationToken,
}

impl PluginManager {
    /// Creates a manager with the default parameter parsers.
    pub fn new(store: BoxedStore) -> Self {
        Self {
            plugins: AsyncRwLock::new(Vec::new()),
            transitions: AsyncMutex::new(()),
            registry: CommandRegistry::new(),
            parsers: RwLock::new(ParserRegistry::with_defaults()),
            waiter: Arc::new(EventWaiter::new()),
            store,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn host(self: &Arc<Self>) -> PluginHost {
        PluginHost::new(Arc::clone(self))
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn waiter(&self) -> &Arc<EventWaiter> {
        &self.waiter
    }

    pub fn store(&self) -> &BoxedStore {
        &self.store
    }

    /// Cancelled once anyone requests a bot shutdown.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Registers a parameter parser, replacing any parser for the same type.
    ///
    /// Applies to plugins loaded afterwards.
    pub fn register_parser<P: ParameterParser>(&self, parser: P) {
        let type_name = parser.type_name();
        self.parsers.write().register(parser);
        debug!(parser = type_name, "Parameter parser registered");
    }

    // ─── Transitions ─────────────────────────────────────────────────────────

    /// Registers `plugin` and runs its `on_register` hook.
    ///
    /// # Errors
    ///
    /// - [`PluginError::DuplicatePlugin`] if the identifier is taken
    /// - [`PluginError::HookFailed`] if `on_register` fails; the plugin is
    ///   not kept
    pub async fn register(self: &Arc<Self>, plugin: BoxedPlugin) -> PluginResult<()> {
        let _transition = self.transitions.lock().await;
        let identifier = plugin.identifier().to_string();

        {
            let mut plugins = self.plugins.write().await;
            if plugins.iter().any(|e| e.plugin.identifier() == identifier) {
                return Err(PluginError::DuplicatePlugin(identifier));
            }
            plugins.push(PluginEntry {
                plugin: Arc::clone(&plugin),
                state: PluginLoadState::Registered,
            });
        }

        let host = self.host();
        if let Err(e) = plugin.on_register(&host).await {
            self.plugins
                .write()
                .await
                .retain(|entry| entry.plugin.identifier() != identifier);
            warn!(plugin = %identifier, error = %e, "on_register failed, plugin discarded");
            return Err(PluginError::hook_failed(identifier, "on_register", e));
        }

        info!(plugin = %identifier, name = %plugin.name(), "Plugin registered");
        Ok(())
    }

    /// Installs the plugin's commands and runs `on_load`.
    ///
    /// # Errors
    ///
    /// - [`PluginError::NotRegistered`] / [`PluginError::AlreadyLoaded`]
    /// - [`PluginError::UnresolvedParameterParser`],
    ///   [`PluginError::InvalidDeclaration`] or
    ///   [`PluginError::DuplicateCommand`] if a command cannot be built
    /// - [`PluginError::HookFailed`] if `on_load` fails; the commands are
    ///   removed again
    pub async fn load(self: &Arc<Self>, identifier: &str) -> PluginResult<()> {
        let _transition = self.transitions.lock().await;
        let plugin = {
            let plugins = self.plugins.read().await;
            let entry = plugins
                .iter()
                .find(|e| e.plugin.identifier() == identifier)
                .ok_or_else(|| PluginError::NotRegistered(identifier.to_string()))?;
            if entry.state == PluginLoadState::Loaded {
                return Err(PluginError::AlreadyLoaded(identifier.to_string()));
            }
            Arc::clone(&entry.plugin)
        };

        let commands = self.build_commands(&plugin)?;
        let count = commands.len();
        self.registry.insert(identifier, commands);

        let host = self.host();
        let hook = plugin
            .on_load(&host)
            .instrument(span!(Level::DEBUG, "on_load", plugin = %identifier));
        if let Err(e) = hook.await {
            self.registry.remove(identifier);
            warn!(plugin = %identifier, error = %e, "on_load failed, commands removed");
            return Err(PluginError::hook_failed(identifier, "on_load", e));
        }

        self.set_state(identifier, PluginLoadState::Loaded).await;
        info!(plugin = %identifier, commands = count, "Plugin loaded");
        Ok(())
    }

    /// Runs `on_unload` and removes the plugin's commands.
    ///
    /// # Errors
    ///
    /// - [`PluginError::GuardedPlugin`] if the plugin is guarded and
    ///   `override_guard` is false, whatever its state
    /// - [`PluginError::NotLoaded`] if unknown or not loaded
    /// - [`PluginError::HookFailed`] if `on_unload` fails; the plugin stays
    ///   loaded
    pub async fn unload(self: &Arc<Self>, identifier: &str, override_guard: bool) -> PluginResult<()> {
        let _transition = self.transitions.lock().await;
        let plugin = {
            let plugins = self.plugins.read().await;
            let entry = plugins
                .iter()
                .find(|e| e.plugin.identifier() == identifier)
                .ok_or_else(|| PluginError::NotLoaded(identifier.to_string()))?;
            if entry.plugin.guarded() && !override_guard {
                return Err(PluginError::GuardedPlugin(identifier.to_string()));
            }
            if entry.state != PluginLoadState::Loaded {
                return Err(PluginError::NotLoaded(identifier.to_string()));
            }
            Arc::clone(&entry.plugin)
        };

        let host = self.host();
        let hook = plugin
            .on_unload(&host)
            .instrument(span!(Level::DEBUG, "on_unload", plugin = %identifier));
        if let Err(e) = hook.await {
            warn!(plugin = %identifier, error = %e, "on_unload failed, plugin stays loaded");
            return Err(PluginError::hook_failed(identifier, "on_unload", e));
        }

        let removed = self.registry.remove(identifier);
        self.set_state(identifier, PluginLoadState::Registered).await;
        info!(plugin = %identifier, commands = removed, "Plugin unloaded");
        Ok(())
    }

    fn build_commands(&self, plugin: &BoxedPlugin) -> PluginResult<Vec<Command>> {
        let identifier = plugin.identifier();
        let definitions = Arc::clone(plugin).commands();
        let parsers = self.parsers.read();

        let mut seen = HashSet::new();
        let mut commands = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let command = Command::build(identifier, definition, &parsers)?;
            if !seen.insert(command.display_name().to_string()) {
                return Err(PluginError::DuplicateCommand {
                    plugin: identifier.to_string(),
                    command: command.display_name().to_string(),
                });
            }
            commands.push(command);
        }
        Ok(commands)
    }

    async fn set_state(&self, identifier: &str, state: PluginLoadState) {
        if let Some(entry) = self
            .plugins
            .write()
            .await
            .iter_mut()
            .find(|e| e.plugin.identifier() == identifier)
        {
            entry.state = state;
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    pub async fn state(&self, identifier: &str) -> Option<PluginLoadState> {
        self.plugins
            .read()
            .await
            .iter()
            .find(|e| e.plugin.identifier() == identifier)
            .map(|e| e.state)
    }

    /// All registered plugins, in registration order.
    pub async fn plugins(&self) -> Vec<PluginInfo> {
        self.plugins
            .read()
            .await
            .iter()
            .map(|e| self.info(e))
            .collect()
    }

    /// Looks a plugin up by display name. `name` is trimmed; the match is exact.
    pub async fn find_by_name(&self, name: &str) -> Option<PluginInfo> {
        let name = name.trim();
        self.plugins
            .read()
            .await
            .iter()
            .find(|e| e.plugin.name() == name)
            .map(|e| self.info(e))
    }

    pub async fn plugin_count(&self) -> usize {
        self.plugins.read().await.len()
    }

    fn info(&self, entry: &PluginEntry) -> PluginInfo {
        let identifier = entry.plugin.identifier();
        PluginInfo {
            identifier: identifier.to_string(),
            name: entry.plugin.name().to_string(),
            guarded: entry.plugin.guarded(),
            state: entry.state,
            commands: self.registry.commands_of(identifier).len(),
        }
    }

    // ─── Shutdown ────────────────────────────────────────────────────────────

    /// Runs every registered plugin's `on_shutdown` concurrently, each bounded
    /// by `timeout`.
    ///
    /// A hook that overruns keeps running in the background but is reported
    /// as [`ShutdownFailure::TimedOut`] and no longer holds up the others.
    pub async fn shutdown_plugins(self: &Arc<Self>, timeout: Duration) -> ShutdownReport {
        let snapshot: Vec<BoxedPlugin> = self
            .plugins
            .read()
            .await
            .iter()
            .map(|e| Arc::clone(&e.plugin))
            .collect();
        info!(plugins = snapshot.len(), ?timeout, "Shutting down plugins");

        let host = self.host();
        let hooks = snapshot.into_iter().map(|plugin| {
            let identifier = plugin.identifier().to_string();
            let host = host.clone();
            let handle = tokio::spawn(
                async move { plugin.on_shutdown(&host).await.map_err(|e| e.to_string()) }
                    .instrument(span!(Level::DEBUG, "on_shutdown", plugin = %identifier)),
            );
            async move {
                let outcome = match tokio::time::timeout(timeout, handle).await {
                    Ok(Ok(Ok(()))) => Ok(()),
                    Ok(Ok(Err(message))) => Err(ShutdownFailure::Failed(message)),
                    Ok(Err(_join)) => Err(ShutdownFailure::Panicked),
                    Err(_elapsed) => Err(ShutdownFailure::TimedOut),
                };
                (identifier, outcome)
            }
        });

        let mut report = ShutdownReport::default();
        for (identifier, outcome) in future::join_all(hooks).await {
            match outcome {
                Ok(()) => report.completed.push(identifier),
                Err(failure) => {
                    debug!(plugin = %identifier, %failure, "Plugin shutdown did not complete");
                    report.failed.push((identifier, failure));
                }
            }
        }
        report
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("commands", &self.registry.len())
            .field("waiter", &self.waiter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::command::{CommandChain, CommandDeclaration, CommandDefinition};
    use crate::context::CommandContext;
    use crate::error::BoxError;
    use crate::plugin::{MemoryStore, Plugin, PluginData, PluginStore};

    #[derive(Default)]
    struct TestPlugin {
        id: &'static str,
        guarded: bool,
        fail_on_load: bool,
        duplicate_commands: bool,
        shutdown_delay: Option<Duration>,
        fail_shutdown: bool,
        loads: AtomicUsize,
        unloads: AtomicUsize,
    }

    impl TestPlugin {
        fn new(id: &'static str) -> Self {
            Self {
                id,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl Plugin for TestPlugin {
        fn identifier(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            self.id
        }

        fn guarded(&self) -> bool {
            self.guarded
        }

        fn commands(self: Arc<Self>) -> Vec<CommandDefinition> {
            let mut commands = vec![
                CommandChain::of(CommandDeclaration::new("ping"))
                    .handler(|_ctx: CommandContext| async { "Pong!" }),
            ];
            if self.duplicate_commands {
                commands.push(
                    CommandChain::of(CommandDeclaration::new("ping"))
                        .handler(|_ctx: CommandContext| async {}),
                );
            }
            commands
        }

        async fn on_load(&self, _host: &PluginHost) -> Result<(), BoxError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_load {
                return Err("no data".into());
            }
            Ok(())
        }

        async fn on_unload(&self, _host: &PluginHost) -> Result<(), BoxError> {
            self.unloads.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn on_shutdown(&self, _host: &PluginHost) -> Result<(), BoxError> {
            if let Some(delay) = self.shutdown_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_shutdown {
                return Err("disk full".into());
            }
            Ok(())
        }
    }

    fn manager() -> Arc<PluginManager> {
        Arc::new(PluginManager::new(Arc::new(MemoryStore::new())))
    }

    #[tokio::test]
    async fn test_register_load_unload() {
        let manager = manager();
        let plugin = Arc::new(TestPlugin::new("1.Test"));
        manager.register(plugin.clone()).await.unwrap();
        assert_eq!(manager.state("1.Test").await, Some(PluginLoadState::Registered));
        assert!(manager.registry().is_empty());

        manager.load("1.Test").await.unwrap();
        assert_eq!(manager.state("1.Test").await, Some(PluginLoadState::Loaded));
        assert_eq!(manager.registry().len(), 1);
        assert_eq!(plugin.loads.load(Ordering::SeqCst), 1);

        manager.unload("1.Test", false).await.unwrap();
        assert_eq!(manager.state("1.Test").await, Some(PluginLoadState::Registered));
        assert!(manager.registry().is_empty());
        assert_eq!(plugin.unloads.load(Ordering::SeqCst), 1);

        // Reloading after an unload works.
        manager.load("1.Test").await.unwrap();
        assert_eq!(manager.registry().len(), 1);
    }

    #[tokio::test]
    async fn test_hooks_use_host_across_await() {
        #[derive(Default, serde::Serialize, serde::Deserialize)]
        struct Visits {
            loads: u32,
        }

        struct Persisted {
            data: PluginData<Visits>,
        }

        #[async_trait]
        impl Plugin for Persisted {
            fn identifier(&self) -> &str {
                self.data.identifier()
            }

            fn name(&self) -> &str {
                "Persisted"
            }

            async fn on_load(&self, host: &PluginHost) -> Result<(), BoxError> {
                self.data.load(host.store().as_ref()).await?;
                self.data.write().loads += 1;
                tokio::task::yield_now().await;
                host.waiter().pending_count();
                Ok(())
            }

            async fn on_unload(&self, host: &PluginHost) -> Result<(), BoxError> {
                tokio::task::yield_now().await;
                self.data.save(host.store().as_ref()).await?;
                Ok(())
            }
        }

        let manager = manager();
        manager
            .register(Arc::new(Persisted {
                data: PluginData::new("1.Persisted"),
            }))
            .await
            .unwrap();
        for _ in 0..2 {
            manager.load("1.Persisted").await.unwrap();
            manager.unload("1.Persisted", false).await.unwrap();
        }
        assert_eq!(
            manager.store().load("1.Persisted").await.unwrap(),
            Some(serde_json::json!({ "loads": 2 }))
        );
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let manager = manager();
        manager.register(Arc::new(TestPlugin::new("1.Test"))).await.unwrap();
        let err = manager
            .register(Arc::new(TestPlugin::new("1.Test")))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::DuplicatePlugin(id) if id == "1.Test"));
        assert_eq!(manager.plugin_count().await, 1);
    }

    #[tokio::test]
    async fn test_load_requires_registration() {
        let manager = manager();
        assert!(matches!(
            manager.load("1.Missing").await,
            Err(PluginError::NotRegistered(_))
        ));

        manager.register(Arc::new(TestPlugin::new("1.Test"))).await.unwrap();
        manager.load("1.Test").await.unwrap();
        assert!(matches!(
            manager.load("1.Test").await,
            Err(PluginError::AlreadyLoaded(_))
        ));
    }

    #[tokio::test]
    async fn test_unload_requires_loaded() {
        let manager = manager();
        assert!(matches!(
            manager.unload("1.Missing", false).await,
            Err(PluginError::NotLoaded(_))
        ));
        manager.register(Arc::new(TestPlugin::new("1.Test"))).await.unwrap();
        assert!(matches!(
            manager.unload("1.Test", false).await,
            Err(PluginError::NotLoaded(_))
        ));
    }

    #[tokio::test]
    async fn test_guarded_plugin() {
        let manager = manager();
        let plugin = TestPlugin {
            guarded: true,
            ..TestPlugin::new("1.Core")
        };
        manager.register(Arc::new(plugin)).await.unwrap();

        // The guard is checked before the load state.
        assert!(matches!(
            manager.unload("1.Core", false).await,
            Err(PluginError::GuardedPlugin(_))
        ));

        manager.load("1.Core").await.unwrap();
        assert!(matches!(
            manager.unload("1.Core", false).await,
            Err(PluginError::GuardedPlugin(_))
        ));
        assert_eq!(manager.state("1.Core").await, Some(PluginLoadState::Loaded));

        manager.unload("1.Core", true).await.unwrap();
        assert_eq!(manager.state("1.Core").await, Some(PluginLoadState::Registered));
    }

    #[tokio::test]
    async fn test_failed_on_load_rolls_back() {
        let manager = manager();
        let plugin = TestPlugin {
            fail_on_load: true,
            ..TestPlugin::new("1.Test")
        };
        manager.register(Arc::new(plugin)).await.unwrap();

        let err = manager.load("1.Test").await.unwrap_err();
        assert!(matches!(err, PluginError::HookFailed { hook: "on_load", .. }));
        assert_eq!(manager.state("1.Test").await, Some(PluginLoadState::Registered));
        assert!(manager.registry().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_command_fails_load() {
        let manager = manager();
        let plugin = TestPlugin {
            duplicate_commands: true,
            ..TestPlugin::new("1.Test")
        };
        manager.register(Arc::new(plugin)).await.unwrap();

        let err = manager.load("1.Test").await.unwrap_err();
        assert!(matches!(err, PluginError::DuplicateCommand { ref command, .. } if command == "ping"));
        assert!(manager.registry().is_empty());
        assert_eq!(manager.state("1.Test").await, Some(PluginLoadState::Registered));
    }

    #[tokio::test]
    async fn test_find_by_name_trims() {
        let manager = manager();
        manager.register(Arc::new(TestPlugin::new("Echo"))).await.unwrap();
        manager.load("Echo").await.unwrap();

        let info = manager.find_by_name("  Echo ").await.unwrap();
        assert!(info.is_loaded());
        assert_eq!(info.commands, 1);
        assert!(manager.find_by_name("echo").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_fans_out_with_timeouts() {
        let manager = manager();
        let slow = |id, secs| TestPlugin {
            shutdown_delay: Some(Duration::from_secs(secs)),
            ..TestPlugin::new(id)
        };
        manager.register(Arc::new(slow("1.A", 20))).await.unwrap();
        manager.register(Arc::new(slow("1.B", 20))).await.unwrap();
        manager.register(Arc::new(slow("1.Hung", 3600))).await.unwrap();
        let failing = TestPlugin {
            fail_shutdown: true,
            ..TestPlugin::new("1.Broken")
        };
        manager.register(Arc::new(failing)).await.unwrap();

        let started = tokio::time::Instant::now();
        let report = manager.shutdown_plugins(Duration::from_secs(30)).await;

        // Hooks ran in parallel and the hung one was cut off at its own deadline.
        assert!(started.elapsed() < Duration::from_secs(31));
        assert_eq!(report.completed, vec!["1.A", "1.B"]);
        assert_eq!(
            report.failed,
            vec![
                ("1.Hung".to_string(), ShutdownFailure::TimedOut),
                ("1.Broken".to_string(), ShutdownFailure::Failed("disk full".into())),
            ]
        );
        assert!(!report.is_clean());
    }
}
