//! The running bot: plugin bootstrap, event ingress and ordered shutdown.
//!
//! ```rust,ignore
//! let config = ConfigLoader::new().load()?;
//! logging::init_from_config(&config.logging);
//!
//! let store = Arc::new(JsonFileStore::new(&config.bot.data_dir));
//! let bot = AlyxBot::launch(config, gateway, store, vec![Arc::new(MyPlugin::new())]).await?;
//! bot.run(events).await;
//! ```
//!
//! # Shutdown order
//!
//! | Step | Action | Bound |
//! |------|--------|-------|
//! | 1 | Stop dispatching inbound messages (already the case once a shutdown was requested) | - |
//! | 2 | Run every plugin's `on_shutdown` concurrently | `shutdown.plugin_timeout_secs` each |
//! | 3 | Log each plugin that failed or timed out | - |
//! | 4 | Drain the event waiter | `shutdown.waiter_timeout_secs` |
//! | 5 | Disconnect the gateway | - |

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use alyx_core::{BoxedEvent, BoxedGateway, MessageEvent};
use alyx_framework::{
    BoxedPlugin, BoxedStore, CommandDispatcher, DispatchOutcome, PluginHost, PluginManager,
    ShutdownReport,
};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{AlyxConfig, validate_config};
use crate::error::RuntimeResult;

/// What [`AlyxBot::shutdown`] did.
#[derive(Debug)]
pub struct ShutdownSummary {
    pub plugins: ShutdownReport,
    /// Whether every pending event wait finished before the waiter timeout.
    pub waiter_drained: bool,
}

impl ShutdownSummary {
    pub fn is_clean(&self) -> bool {
        self.plugins.is_clean() && self.waiter_drained
    }
}

pub struct AlyxBot {
    config: AlyxConfig,
    gateway: BoxedGateway,
    manager: Arc<PluginManager>,
    dispatcher: CommandDispatcher,
    shutdown_started: AtomicBool,
}

impl AlyxBot {
    /// Registers and loads the built-in plugins followed by `plugins`, in
    /// order, and returns a bot ready to receive events.
    ///
    /// When `bot.owner_id` is not configured, the gateway's application owner
    /// is used.
    ///
    /// # Errors
    ///
    /// Invalid configuration, or any plugin failing to register or load.
    pub async fn launch(
        config: AlyxConfig,
        gateway: BoxedGateway,
        store: BoxedStore,
        plugins: impl IntoIterator<Item = BoxedPlugin>,
    ) -> RuntimeResult<Arc<Self>> {
        validate_config(&config)?;

        let mut policy = config.bot.access_policy();
        if policy.owner.is_none() {
            match gateway.application_owner().await {
                Ok(owner) => policy.owner = owner,
                Err(e) => warn!(error = %e, "Could not look up the application owner"),
            }
        }
        if policy.owner.is_none() {
            warn!("No bot owner configured, owner-only commands are unavailable");
        }

        let manager = Arc::new(PluginManager::new(store));
        let dispatcher = CommandDispatcher::new(
            config.bot.command_prefix.clone(),
            Arc::clone(&manager),
            policy,
        );

        #[cfg(feature = "builtin-plugins")]
        let plugins: Vec<BoxedPlugin> = alyx_framework::plugin::builtin::builtin_plugins()
            .into_iter()
            .chain(plugins)
            .collect();
        #[cfg(not(feature = "builtin-plugins"))]
        let plugins: Vec<BoxedPlugin> = plugins.into_iter().collect();

        for plugin in &plugins {
            manager.register(Arc::clone(plugin)).await?;
        }
        for plugin in &plugins {
            manager.load(plugin.identifier()).await?;
        }

        info!(
            bot = %config.bot.name,
            prefix = %config.bot.command_prefix,
            plugins = plugins.len(),
            commands = manager.registry().len(),
            "Bot launched"
        );

        Ok(Arc::new(Self {
            config,
            gateway,
            manager,
            dispatcher,
            shutdown_started: AtomicBool::new(false),
        }))
    }

    pub fn config(&self) -> &AlyxConfig {
        &self.config
    }

    pub fn gateway(&self) -> &BoxedGateway {
        &self.gateway
    }

    pub fn manager(&self) -> &Arc<PluginManager> {
        &self.manager
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn host(&self) -> PluginHost {
        self.manager.host()
    }

    /// Makes [`run`](Self::run) stop and shut the bot down.
    pub fn request_shutdown(&self) {
        self.manager.shutdown_token().cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown_started.load(Ordering::Acquire)
    }

    // ─── Ingress ─────────────────────────────────────────────────────────────

    /// Delivers one inbound event.
    ///
    /// Every event is offered to the event waiter first; messages are then
    /// dispatched as commands. Returns `None` for non-message events.
    ///
    /// # Errors
    ///
    /// Only internal handler defects surface here.
    pub async fn handle_event(&self, event: BoxedEvent) -> RuntimeResult<Option<DispatchOutcome>> {
        if self.manager.waiter().process(event.as_ref()) {
            debug!(event = event.event_name(), "Event resolved a pending wait");
        }

        let Some(message) = event.downcast_ref::<MessageEvent>() else {
            return Ok(None);
        };
        let outcome = self
            .dispatcher
            .dispatch(Arc::new(message.clone()), Arc::clone(&self.gateway))
            .await?;
        Ok(Some(outcome))
    }

    /// Delivers events one at a time until shutdown is requested by a plugin,
    /// Ctrl-C or SIGTERM arrives, or `events` closes, then runs
    /// [`shutdown`](Self::shutdown).
    pub async fn run(self: &Arc<Self>, events: mpsc::Receiver<BoxedEvent>) -> Option<ShutdownSummary> {
        info!("Bot is running. Press Ctrl+C to stop.");
        self.run_until(events, wait_for_signal()).await
    }

    /// Like [`run`](Self::run), with a custom shutdown future in place of the
    /// process signals.
    ///
    /// `shutdown` is polled for the whole run, so it can fire while a handler
    /// is busy. A requested shutdown always wins over queued events.
    pub async fn run_until<F>(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<BoxedEvent>,
        shutdown: F,
    ) -> Option<ShutdownSummary>
    where
        F: Future<Output = ()>,
    {
        let token = self.manager.shutdown_token().clone();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = &mut shutdown => break,
                event = events.recv() => match event {
                    Some(event) => {
                        if let Err(e) = self.handle_event(event).await {
                            error!(error = %e, "Event handling failed");
                        }
                    }
                    None => {
                        info!("Event stream closed, shutting down");
                        break;
                    }
                },
            }
        }

        self.shutdown().await
    }

    // ─── Shutdown ────────────────────────────────────────────────────────────

    /// Shuts the bot down once. Later calls log an error and return `None`.
    pub async fn shutdown(&self) -> Option<ShutdownSummary> {
        if self.shutdown_started.swap(true, Ordering::AcqRel) {
            error!("Shutdown was already performed");
            return None;
        }
        info!("Shutting down");

        self.dispatcher.set_listening(false);
        info!("Stopped listening for commands");

        let plugins = self
            .manager
            .shutdown_plugins(self.config.shutdown.plugin_timeout())
            .await;
        for (plugin, failure) in &plugins.failed {
            error!(plugin = %plugin, %failure, "Plugin failed to shut down");
        }
        info!(
            completed = plugins.completed.len(),
            failed = plugins.failed.len(),
            "Plugins shut down"
        );

        let waiter_drained = self
            .manager
            .waiter()
            .shutdown(self.config.shutdown.waiter_timeout())
            .await;
        if waiter_drained {
            info!("Event waiter drained");
        } else {
            error!("Event waiter did not drain before the timeout");
        }

        self.gateway.disconnect().await;
        info!("Gateway disconnected");

        Some(ShutdownSummary {
            plugins,
            waiter_drained,
        })
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
///
/// If no handler can be installed the future never resolves and the bot
/// only stops through a shutdown request or the end of the event stream.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                wait_for_ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = wait_for_ctrl_c() => {}
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

impl std::fmt::Debug for AlyxBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlyxBot")
            .field("name", &self.config.bot.name)
            .field("prefix", &self.dispatcher.prefix())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use alyx_core::{ReactionEvent, Reply, UserId};
    use alyx_framework::testing::{MockGateway, TEST_AUTHOR, TEST_CHANNEL, TEST_GUILD, message_event};
    use alyx_framework::{
        BoxError, CommandChain, CommandContext, CommandDeclaration, CommandDefinition, MemoryStore,
        Plugin, PluginData, PluginError, PluginStore, ShutdownFailure,
    };
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use tokio::sync::oneshot;

    use super::*;
    use crate::error::RuntimeError;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Tally {
        count: u64,
    }

    struct CounterPlugin {
        data: PluginData<Tally>,
    }

    impl CounterPlugin {
        fn new() -> Self {
            Self {
                data: PluginData::new("1.Counter"),
            }
        }

        async fn count(self: Arc<Self>, _ctx: CommandContext) -> String {
            let mut tally = self.data.write();
            tally.count += 1;
            tally.count.to_string()
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
            vec![CommandChain::of(CommandDeclaration::new("count")).method(self, Self::count)]
        }

        async fn on_load(&self, host: &PluginHost) -> Result<(), BoxError> {
            self.data.load(host.store().as_ref()).await?;
            Ok(())
        }

        async fn on_shutdown(&self, host: &PluginHost) -> Result<(), BoxError> {
            self.data.save(host.store().as_ref()).await?;
            Ok(())
        }
    }

    /// `slow` fires the shutdown trigger, then keeps working for a second.
    struct SlowPlugin {
        trigger: std::sync::Mutex<Option<oneshot::Sender<()>>>,
    }

    impl SlowPlugin {
        async fn slow(self: Arc<Self>, _ctx: CommandContext) -> &'static str {
            let trigger = self.trigger.lock().unwrap().take();
            if let Some(trigger) = trigger {
                let _ = trigger.send(());
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
            "done"
        }
    }

    #[async_trait]
    impl Plugin for SlowPlugin {
        fn identifier(&self) -> &str {
            "1.Slow"
        }

        fn name(&self) -> &str {
            "Slow"
        }

        fn commands(self: Arc<Self>) -> Vec<CommandDefinition> {
            vec![CommandChain::of(CommandDeclaration::new("slow")).method(self, Self::slow)]
        }
    }

    struct HungPlugin;

    #[async_trait]
    impl Plugin for HungPlugin {
        fn identifier(&self) -> &str {
            "1.Hung"
        }

        fn name(&self) -> &str {
            "Hung"
        }

        async fn on_shutdown(&self, _host: &PluginHost) -> Result<(), BoxError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    fn owned_config() -> AlyxConfig {
        let mut config = AlyxConfig::default();
        config.bot.owner_id = Some(TEST_AUTHOR);
        config
    }

    async fn launch_with(
        config: AlyxConfig,
        plugins: Vec<BoxedPlugin>,
    ) -> (Arc<AlyxBot>, Arc<MockGateway>, Arc<MemoryStore>) {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(MemoryStore::new());
        let bot = AlyxBot::launch(config, gateway.clone(), store.clone(), plugins)
            .await
            .unwrap();
        (bot, gateway, store)
    }

    fn message(content: &str) -> BoxedEvent {
        Arc::new(message_event(content, Some(TEST_GUILD)))
    }

    #[tokio::test]
    async fn test_launch_loads_builtins_then_plugins() {
        let (bot, _gateway, _store) =
            launch_with(AlyxConfig::default(), vec![Arc::new(CounterPlugin::new())]).await;

        let plugins = bot.manager().plugins().await;
        let names: Vec<&str> = plugins.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["AlyxPluginManager", "AlyxAdminCommands", "PingCommandsPlugin", "Counter"]
        );
        assert!(plugins.iter().all(|p| p.is_loaded()));
    }

    #[tokio::test]
    async fn test_owner_falls_back_to_application_owner() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_owner(UserId(7));
        let store: BoxedStore = Arc::new(MemoryStore::new());

        let bot = AlyxBot::launch(AlyxConfig::default(), gateway.clone(), store.clone(), vec![])
            .await
            .unwrap();
        assert_eq!(bot.dispatcher().policy().owner, Some(UserId(7)));

        let mut config = AlyxConfig::default();
        config.bot.owner_id = Some(UserId(9));
        let bot = AlyxBot::launch(config, gateway, store, vec![]).await.unwrap();
        assert_eq!(bot.dispatcher().policy().owner, Some(UserId(9)));
    }

    #[tokio::test]
    async fn test_launch_errors() {
        let gateway: BoxedGateway = Arc::new(MockGateway::new());
        let store: BoxedStore = Arc::new(MemoryStore::new());

        let mut config = AlyxConfig::default();
        config.bot.command_prefix = String::new();
        let err = AlyxBot::launch(config, gateway.clone(), store.clone(), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Config(_)));

        let plugins: Vec<BoxedPlugin> =
            vec![Arc::new(CounterPlugin::new()), Arc::new(CounterPlugin::new())];
        let err = AlyxBot::launch(AlyxConfig::default(), gateway, store, plugins)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Plugin(PluginError::DuplicatePlugin(id)) if id == "1.Counter"
        ));
    }

    #[tokio::test]
    async fn test_handle_event_dispatches_messages() {
        let (bot, gateway, _store) = launch_with(AlyxConfig::default(), vec![]).await;

        let outcome = bot.handle_event(message("!ping")).await.unwrap();
        assert_eq!(outcome, Some(DispatchOutcome::Completed));
        assert_eq!(gateway.sent_texts(), vec!["Pong!".to_string()]);

        let outcome = bot.handle_event(message("ping")).await.unwrap();
        assert_eq!(outcome, Some(DispatchOutcome::Ignored));
    }

    #[tokio::test]
    async fn test_reactions_reach_the_waiter() {
        let (bot, gateway, _store) = launch_with(owned_config(), vec![]).await;

        bot.handle_event(message("!shutdown")).await.unwrap();
        let prompt = gateway.last_message_id().unwrap();
        assert_eq!(bot.manager().waiter().pending_count(), 1);

        let yes: BoxedEvent = Arc::new(ReactionEvent {
            message_id: prompt,
            channel_id: TEST_CHANNEL,
            guild_id: Some(TEST_GUILD),
            user_id: TEST_AUTHOR,
            emoji: Reply::SUCCESS_EMOJI.to_string(),
        });
        assert_eq!(bot.handle_event(yes).await.unwrap(), None);

        let token = bot.manager().shutdown_token().clone();
        tokio::time::timeout(Duration::from_secs(5), token.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_persists_then_disconnects() {
        let (bot, gateway, store) =
            launch_with(AlyxConfig::default(), vec![Arc::new(CounterPlugin::new())]).await;
        bot.handle_event(message("!count")).await.unwrap();
        bot.handle_event(message("!count")).await.unwrap();
        assert_eq!(gateway.sent_texts(), vec!["1".to_string(), "2".to_string()]);

        let summary = bot.shutdown().await.unwrap();
        assert!(summary.is_clean());
        assert_eq!(summary.plugins.completed.len(), 4);
        assert_eq!(store.load("1.Counter").await.unwrap(), Some(json!({ "count": 2 })));
        assert_eq!(gateway.disconnects(), 1);
        assert!(!bot.dispatcher().is_listening());
        assert!(!bot.manager().waiter().is_accepting());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let (bot, gateway, _store) = launch_with(AlyxConfig::default(), vec![]).await;

        assert!(bot.shutdown().await.is_some());
        assert!(bot.shutdown().await.is_none());
        assert_eq!(gateway.disconnects(), 1);
        assert!(bot.is_shut_down());

        let outcome = bot.handle_event(message("!ping")).await.unwrap();
        assert_eq!(outcome, Some(DispatchOutcome::Ignored));
        assert!(gateway.sent_texts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_plugin_does_not_block_disconnect() {
        let (bot, gateway, store) = launch_with(
            AlyxConfig::default(),
            vec![Arc::new(HungPlugin), Arc::new(CounterPlugin::new())],
        )
        .await;

        let started = tokio::time::Instant::now();
        let summary = bot.shutdown().await.unwrap();

        assert!(!summary.is_clean());
        assert!(summary.waiter_drained);
        assert_eq!(summary.plugins.failed.len(), 1);
        assert!(matches!(
            &summary.plugins.failed[0],
            (id, ShutdownFailure::TimedOut) if id == "1.Hung"
        ));
        assert!(store.load("1.Counter").await.unwrap().is_some());
        assert_eq!(gateway.disconnects(), 1);
        assert!(started.elapsed() < Duration::from_secs(31));
    }

    #[tokio::test]
    async fn test_run_until_stream_closes() {
        let (bot, gateway, _store) = launch_with(AlyxConfig::default(), vec![]).await;
        let (tx, rx) = mpsc::channel(8);

        tx.send(message("!ping")).await.unwrap();
        drop(tx);

        let summary = bot.run(rx).await;
        assert!(summary.is_some());
        assert_eq!(gateway.sent_texts(), vec!["Pong!".to_string()]);
        assert_eq!(gateway.disconnects(), 1);
    }

    #[tokio::test]
    async fn test_run_until_plugin_requests_shutdown() {
        let (bot, gateway, _store) = launch_with(owned_config(), vec![]).await;
        let (tx, rx) = mpsc::channel(8);

        tx.send(message("!shutdown now")).await.unwrap();
        let summary = tokio::time::timeout(Duration::from_secs(5), bot.run(rx))
            .await
            .unwrap();

        assert!(summary.is_some());
        assert_eq!(gateway.reactions(), vec![Reply::SUCCESS_EMOJI.to_string()]);
        assert_eq!(gateway.disconnects(), 1);
        drop(tx);
    }

    #[tokio::test]
    async fn test_run_drops_commands_queued_behind_shutdown() {
        for _ in 0..10 {
            let (bot, gateway, _store) = launch_with(owned_config(), vec![]).await;
            let (tx, rx) = mpsc::channel(16);

            tx.send(message("!shutdown now")).await.unwrap();
            for _ in 0..10 {
                tx.send(message("!ping")).await.unwrap();
            }
            let summary = tokio::time::timeout(Duration::from_secs(5), bot.run(rx))
                .await
                .unwrap();

            assert!(summary.is_some());
            assert!(!gateway.sent_texts().contains(&"Pong!".to_string()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_sees_trigger_fired_during_handler() {
        let (trigger, fired) = oneshot::channel();
        let plugin: BoxedPlugin = Arc::new(SlowPlugin {
            trigger: std::sync::Mutex::new(Some(trigger)),
        });
        let (bot, gateway, _store) = launch_with(AlyxConfig::default(), vec![plugin]).await;
        let (tx, rx) = mpsc::channel(8);

        tx.send(message("!slow")).await.unwrap();
        tx.send(message("!ping")).await.unwrap();
        let summary = bot
            .run_until(rx, async {
                let _ = fired.await;
            })
            .await;

        assert!(summary.is_some());
        assert_eq!(gateway.sent_texts(), vec!["done".to_string()]);
        assert_eq!(gateway.disconnects(), 1);
        drop(tx);
    }
}
