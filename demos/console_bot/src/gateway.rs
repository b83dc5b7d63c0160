//! A gateway over the terminal.
//!
//! Every stdin line becomes a [`MessageEvent`] from the console user, posted
//! in a single guild channel. Replies and reactions are printed to stdout.
//!
//! The console user is reported as the application owner, so every command
//! is available.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use alyx::core::{
    BoxedEvent, Channel, ChannelId, Emote, EmoteId, Gateway, GatewayResult, GuildId,
    MessageEvent, MessageId, Permission, Reply, Role, RoleId, User, UserId,
};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub const CONSOLE_USER: UserId = UserId(100);
pub const CONSOLE_GUILD: GuildId = GuildId(1);
pub const CONSOLE_CHANNEL: ChannelId = ChannelId(1);
const BOT_USER: UserId = UserId(2);

pub struct ConsoleGateway {
    next_message: AtomicU64,
}

impl ConsoleGateway {
    pub fn new() -> Self {
        Self {
            next_message: AtomicU64::new(1),
        }
    }

    fn next_message_id(&self) -> MessageId {
        MessageId(self.next_message.fetch_add(1, Ordering::Relaxed))
    }

    fn console_user() -> User {
        User::new(CONSOLE_USER, "console")
    }

    /// Wraps one input line as a message from the console user.
    fn line_event(&self, line: String) -> BoxedEvent {
        Arc::new(MessageEvent {
            message_id: self.next_message_id(),
            channel_id: CONSOLE_CHANNEL,
            guild_id: Some(CONSOLE_GUILD),
            author: Self::console_user(),
            content: line,
        })
    }

    /// Starts reading stdin. The returned stream closes at end of input.
    pub fn spawn_reader(self: &Arc<Self>) -> mpsc::Receiver<BoxedEvent> {
        let (tx, rx) = mpsc::channel::<BoxedEvent>(16);
        let gateway = Arc::clone(self);

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "Failed to read stdin");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                if tx.send(gateway.line_event(line)).await.is_err() {
                    break;
                }
            }
            debug!("stdin closed");
        });

        rx
    }
}

impl Default for ConsoleGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gateway for ConsoleGateway {
    fn self_user(&self) -> User {
        let mut user = User::new(BOT_USER, "alyx");
        user.bot = true;
        user
    }

    async fn application_owner(&self) -> GatewayResult<Option<UserId>> {
        Ok(Some(CONSOLE_USER))
    }

    async fn send_reply(&self, _channel: ChannelId, reply: Reply) -> GatewayResult<MessageId> {
        let id = self.next_message_id();
        println!("alyx [#{id}]> {}", reply.render());
        Ok(id)
    }

    async fn add_reaction(&self, _channel: ChannelId, message: MessageId, emoji: &str) -> GatewayResult<()> {
        println!("alyx reacted {emoji} to #{message}");
        Ok(())
    }

    /// Reactions cannot be typed back, so yes/no questions fall back to text.
    async fn can_react(&self, _channel: ChannelId) -> bool {
        false
    }

    async fn member_roles(&self, _guild: GuildId, _user: UserId) -> GatewayResult<Vec<Role>> {
        Ok(Vec::new())
    }

    async fn has_permission(
        &self,
        _guild: GuildId,
        _channel: Option<ChannelId>,
        user: UserId,
        _permission: &Permission,
    ) -> GatewayResult<bool> {
        Ok(user == CONSOLE_USER)
    }

    async fn user(&self, id: UserId) -> GatewayResult<Option<User>> {
        Ok(match id {
            CONSOLE_USER => Some(Self::console_user()),
            BOT_USER => Some(self.self_user()),
            _ => None,
        })
    }

    async fn role(&self, _id: RoleId) -> GatewayResult<Option<Role>> {
        Ok(None)
    }

    async fn guild_roles(&self, _guild: GuildId) -> GatewayResult<Vec<Role>> {
        Ok(Vec::new())
    }

    async fn channel(&self, id: ChannelId) -> GatewayResult<Option<Channel>> {
        Ok((id == CONSOLE_CHANNEL).then(|| Channel {
            id,
            guild_id: Some(CONSOLE_GUILD),
            name: "console".into(),
        }))
    }

    async fn emote(&self, _id: EmoteId) -> GatewayResult<Option<Emote>> {
        Ok(None)
    }

    async fn disconnect(&self) {
        println!("alyx disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_event_is_a_console_message() {
        let gateway = ConsoleGateway::new();
        let first = gateway.line_event("!ping".to_string());
        let second = gateway.line_event("!count".to_string());

        let message = first.downcast_ref::<MessageEvent>().unwrap();
        assert_eq!(message.author.id, CONSOLE_USER);
        assert_eq!(message.channel_id, CONSOLE_CHANNEL);
        assert_eq!(message.content, "!ping");

        let next = second.downcast_ref::<MessageEvent>().unwrap();
        assert_ne!(next.message_id, message.message_id);
    }
}
