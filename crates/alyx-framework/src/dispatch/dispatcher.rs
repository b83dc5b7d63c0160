//! The command dispatcher.
//!
//! For every inbound [`MessageEvent`] the dispatcher:
//!
//! 1. drops it unless listening, the author is not the bot itself, and the
//!    text starts with the command prefix
//! 2. tokenizes the rest with [`split_with_quotes`]
//! 3. selects the most specific matching command from the live registry
//! 4. invokes it with a [`ContextCaller`] for authorization
//! 5. converts user-facing failures into a ❌ reaction plus an error reply
//!
//! Gateway failures are logged. Internal errors are returned to the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::{Instrument, Level, debug, error, span, trace, warn};

use alyx_core::{BoxedGateway, MessageEvent, Reply, UserId};

use crate::command::{AccessPolicy, ContextCaller, InvokeOutcome, split_with_quotes};
use crate::context::CommandContext;
use crate::error::{CommandError, CommandResult};
use crate::plugin::PluginManager;

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not for us: not listening, sent by the bot, or no prefix.
    Ignored,
    /// Prefixed, but no command matched.
    NoMatch,
    /// A command matched and the caller was not authorized.
    Denied,
    /// A command matched with the wrong number of arguments.
    HelpSent,
    Completed,
    /// The command failed; the user was told, or the failure was logged.
    Failed,
}

/// Routes prefixed messages to the commands of loaded plugins.
pub struct CommandDispatcher {
    prefix: String,
    manager: Arc<PluginManager>,
    policy: RwLock<Arc<AccessPolicy>>,
    listening: AtomicBool,
}

impl CommandDispatcher {
    /// Creates a dispatcher. It starts out listening.
    pub fn new(prefix: impl Into<String>, manager: Arc<PluginManager>, policy: AccessPolicy) -> Self {
        Self {
            prefix: prefix.into(),
            manager,
            policy: RwLock::new(Arc::new(policy)),
            listening: AtomicBool::new(true),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn manager(&self) -> &Arc<PluginManager> {
        &self.manager
    }

    pub fn policy(&self) -> Arc<AccessPolicy> {
        Arc::clone(&self.policy.read())
    }

    /// Sets the bot owner, e.g. once the gateway reports the application owner.
    pub fn set_owner(&self, owner: UserId) {
        let mut policy = self.policy.write();
        *policy = Arc::new(AccessPolicy::clone(&policy).with_owner(owner));
    }

    /// Whether inbound messages are dispatched. Intake stops as soon as a
    /// shutdown is requested, before the runtime gets to flip the flag.
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire) && !self.manager.shutdown_token().is_cancelled()
    }

    /// Turns event intake on or off. Returns the previous value.
    pub fn set_listening(&self, listening: bool) -> bool {
        self.listening.swap(listening, Ordering::AcqRel)
    }

    /// Handles one inbound message.
    ///
    /// # Errors
    ///
    /// Only [`CommandError::Internal`] is returned; every other failure is
    /// handled here and reported as [`DispatchOutcome::Failed`].
    pub async fn dispatch(
        &self,
        event: Arc<MessageEvent>,
        gateway: BoxedGateway,
    ) -> CommandResult<DispatchOutcome> {
        if !self.is_listening() || event.author.id == gateway.self_user().id {
            return Ok(DispatchOutcome::Ignored);
        }
        let Some(text) = event.content.strip_prefix(self.prefix.as_str()) else {
            return Ok(DispatchOutcome::Ignored);
        };

        let tokens = split_with_quotes(text);
        let Some(command) = self.manager.registry().select(&tokens) else {
            trace!(text, "No command matched");
            return Ok(DispatchOutcome::NoMatch);
        };

        let span = span!(
            Level::DEBUG,
            "dispatch",
            command = %command.display_name(),
            plugin = %command.plugin_id(),
            user = %event.author.id,
        );
        let ctx = CommandContext::new(
            Arc::clone(&event),
            gateway,
            self.manager.host(),
            self.prefix.clone(),
        );
        let policy = self.policy();
        let caller = ContextCaller::new(&ctx, &policy);

        async {
            match command.invoke(&ctx, &tokens, &caller).await {
                Ok(InvokeOutcome::Denied) => Ok(DispatchOutcome::Denied),
                Ok(InvokeOutcome::HelpSent) => Ok(DispatchOutcome::HelpSent),
                Ok(InvokeOutcome::Completed) => {
                    debug!("Command completed");
                    Ok(DispatchOutcome::Completed)
                }
                Err(e) if e.is_user_facing() => {
                    debug!(error = %e, "Command failed");
                    report_to_user(&ctx, &e).await;
                    Ok(DispatchOutcome::Failed)
                }
                Err(CommandError::Gateway(e)) => {
                    warn!(error = %e, "Gateway failure during command");
                    Ok(DispatchOutcome::Failed)
                }
                Err(e) => {
                    error!(error = %e, "Command invocation defect");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("prefix", &self.prefix)
            .field("listening", &self.is_listening())
            .finish_non_exhaustive()
    }
}

async fn report_to_user(ctx: &CommandContext, err: &CommandError) {
    if let Err(e) = ctx.react(Reply::ERROR_EMOJI).await {
        warn!(error = %e, "Failed to add failure reaction");
    }
    if let Err(e) = ctx.reply(Reply::error(err.to_string())).await {
        warn!(error = %e, "Failed to send failure reply");
    }
}
