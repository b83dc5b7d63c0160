//! Per-invocation command context.
//!
//! A [`CommandContext`] is built by the dispatcher for every matched command
//! and handed to parsers and handlers. It is cheap to clone (one `Arc`), so
//! handlers may move it into spawned tasks, e.g. to await a confirmation
//! through the [`EventWaiter`](crate::waiter::EventWaiter).

use std::fmt;
use std::sync::Arc;

use alyx_core::{
    BoxedGateway, ChannelId, GatewayResult, GuildId, MessageEvent, MessageId, Reply, User,
};

use crate::plugin::PluginHost;

struct ContextInner {
    event: Arc<MessageEvent>,
    gateway: BoxedGateway,
    host: PluginHost,
    prefix: String,
}

/// Everything a command handler can see about the message that invoked it.
#[derive(Clone)]
pub struct CommandContext {
    inner: Arc<ContextInner>,
}

impl CommandContext {
    pub fn new(
        event: Arc<MessageEvent>,
        gateway: BoxedGateway,
        host: PluginHost,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                event,
                gateway,
                host,
                prefix: prefix.into(),
            }),
        }
    }

    // ─── Event accessors ─────────────────────────────────────────────────────

    pub fn event(&self) -> &Arc<MessageEvent> {
        &self.inner.event
    }

    /// The full message text, prefix included.
    pub fn raw_text(&self) -> &str {
        &self.inner.event.content
    }

    pub fn author(&self) -> &User {
        &self.inner.event.author
    }

    pub fn message_id(&self) -> MessageId {
        self.inner.event.message_id
    }

    pub fn channel_id(&self) -> ChannelId {
        self.inner.event.channel_id
    }

    pub fn guild_id(&self) -> Option<GuildId> {
        self.inner.event.guild_id
    }

    /// Whether the command was sent inside a guild.
    pub fn is_guild(&self) -> bool {
        self.inner.event.is_from_guild()
    }

    /// The command prefix the dispatcher stripped.
    pub fn prefix(&self) -> &str {
        &self.inner.prefix
    }

    // ─── Collaborators ───────────────────────────────────────────────────────

    pub fn gateway(&self) -> &BoxedGateway {
        &self.inner.gateway
    }

    pub fn host(&self) -> &PluginHost {
        &self.inner.host
    }

    // ─── Responses ───────────────────────────────────────────────────────────

    /// Sends a reply to the invoking channel.
    pub async fn reply(&self, reply: impl Into<Reply>) -> GatewayResult<MessageId> {
        let reply = reply.into();
        self.inner
            .gateway
            .send_reply(self.channel_id(), reply)
            .await
    }

    /// Reacts to the invoking message.
    pub async fn react(&self, emoji: &str) -> GatewayResult<()> {
        self.inner
            .gateway
            .add_reaction(self.channel_id(), self.message_id(), emoji)
            .await
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("event", &self.inner.event)
            .field("prefix", &self.inner.prefix)
            .finish_non_exhaustive()
    }
}
