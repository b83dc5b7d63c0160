//! In-memory gateway and context helpers for tests.
//!
//! Enabled for this crate's own tests and, through the `test-util` feature,
//! for downstream crates.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use alyx_core::{
    BoxedGateway, Channel, ChannelId, Emote, EmoteId, Gateway, GatewayResult, GuildId,
    MessageEvent, MessageId, Permission, Reply, Role, RoleId, User, UserId,
};

use crate::context::CommandContext;
use crate::plugin::{MemoryStore, PluginManager};

/// The bot's own user id in a [`MockGateway`].
pub const BOT_USER: UserId = UserId(1);
/// Guild used by [`guild_context`].
pub const TEST_GUILD: GuildId = GuildId(1);
/// Channel every helper message is posted in.
pub const TEST_CHANNEL: ChannelId = ChannelId(10);
/// Author of every helper message.
pub const TEST_AUTHOR: UserId = UserId(42);
/// Id of every helper message.
pub const TEST_MESSAGE: MessageId = MessageId(500);

#[derive(Default)]
struct MockState {
    sent: Vec<(ChannelId, MessageId, Reply)>,
    reactions: Vec<(MessageId, String)>,
    users: HashMap<UserId, User>,
    roles: Vec<Role>,
    member_roles: HashMap<(GuildId, UserId), Vec<RoleId>>,
    permissions: HashSet<(UserId, Option<ChannelId>, String)>,
    channels: HashMap<ChannelId, Channel>,
    emotes: HashMap<EmoteId, Emote>,
    cannot_react: bool,
    owner: Option<UserId>,
    disconnects: usize,
    next_message: u64,
}

/// A [`Gateway`] that records everything sent through it.
pub struct MockGateway {
    self_user: User,
    state: Mutex<MockState>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        let mut self_user = User::new(BOT_USER, "alyx");
        self_user.bot = true;
        Self {
            self_user,
            state: Mutex::new(MockState {
                next_message: 1000,
                ..Default::default()
            }),
        }
    }

    // ─── Setup ───────────────────────────────────────────────────────────────

    pub fn add_user(&self, user: User) {
        self.state.lock().users.insert(user.id, user);
    }

    pub fn add_role(&self, role: Role) {
        self.state.lock().roles.push(role);
    }

    pub fn add_channel(&self, channel: Channel) {
        self.state.lock().channels.insert(channel.id, channel);
    }

    pub fn add_emote(&self, emote: Emote) {
        self.state.lock().emotes.insert(emote.id, emote);
    }

    /// Gives `user` the role `role` in `guild`. The role must have been added.
    pub fn give_role(&self, guild: GuildId, user: UserId, role: RoleId) {
        self.state
            .lock()
            .member_roles
            .entry((guild, user))
            .or_default()
            .push(role);
    }

    /// Grants `permission` guild-wide (`channel` = `None`) or in one channel.
    pub fn grant_permission(&self, user: UserId, channel: Option<ChannelId>, permission: &Permission) {
        self.state
            .lock()
            .permissions
            .insert((user, channel, permission.name.to_string()));
    }

    pub fn deny_reactions(&self) {
        self.state.lock().cannot_react = true;
    }

    pub fn set_owner(&self, owner: UserId) {
        self.state.lock().owner = Some(owner);
    }

    // ─── Inspection ──────────────────────────────────────────────────────────

    pub fn sent(&self) -> Vec<(ChannelId, Reply)> {
        self.state
            .lock()
            .sent
            .iter()
            .map(|(channel, _, reply)| (*channel, reply.clone()))
            .collect()
    }

    /// Every sent reply, rendered as text.
    pub fn sent_texts(&self) -> Vec<String> {
        self.state.lock().sent.iter().map(|(_, _, r)| r.render()).collect()
    }

    /// Id of the most recent reply.
    pub fn last_message_id(&self) -> Option<MessageId> {
        self.state.lock().sent.last().map(|(_, id, _)| *id)
    }

    /// Emojis added as reactions, in order.
    pub fn reactions(&self) -> Vec<String> {
        self.state.lock().reactions.iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn reactions_on(&self, message: MessageId) -> Vec<String> {
        self.state
            .lock()
            .reactions
            .iter()
            .filter(|(m, _)| *m == message)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().disconnects
    }
}

#[async_trait]
impl Gateway for MockGateway {
    fn self_user(&self) -> User {
        self.self_user.clone()
    }

    async fn application_owner(&self) -> GatewayResult<Option<UserId>> {
        Ok(self.state.lock().owner)
    }

    async fn send_reply(&self, channel: ChannelId, reply: Reply) -> GatewayResult<MessageId> {
        let mut state = self.state.lock();
        state.next_message += 1;
        let id = MessageId(state.next_message);
        state.sent.push((channel, id, reply));
        Ok(id)
    }

    async fn add_reaction(&self, _channel: ChannelId, message: MessageId, emoji: &str) -> GatewayResult<()> {
        self.state.lock().reactions.push((message, emoji.to_string()));
        Ok(())
    }

    async fn can_react(&self, _channel: ChannelId) -> bool {
        !self.state.lock().cannot_react
    }

    async fn member_roles(&self, guild: GuildId, user: UserId) -> GatewayResult<Vec<Role>> {
        let state = self.state.lock();
        let ids = state.member_roles.get(&(guild, user)).cloned().unwrap_or_default();
        Ok(state
            .roles
            .iter()
            .filter(|r| r.guild_id == guild && ids.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn has_permission(
        &self,
        _guild: GuildId,
        channel: Option<ChannelId>,
        user: UserId,
        permission: &Permission,
    ) -> GatewayResult<bool> {
        Ok(self
            .state
            .lock()
            .permissions
            .contains(&(user, channel, permission.name.to_string())))
    }

    async fn user(&self, id: UserId) -> GatewayResult<Option<User>> {
        Ok(self.state.lock().users.get(&id).cloned())
    }

    async fn role(&self, id: RoleId) -> GatewayResult<Option<Role>> {
        Ok(self.state.lock().roles.iter().find(|r| r.id == id).cloned())
    }

    async fn guild_roles(&self, guild: GuildId) -> GatewayResult<Vec<Role>> {
        Ok(self
            .state
            .lock()
            .roles
            .iter()
            .filter(|r| r.guild_id == guild)
            .cloned()
            .collect())
    }

    async fn channel(&self, id: ChannelId) -> GatewayResult<Option<Channel>> {
        Ok(self.state.lock().channels.get(&id).cloned())
    }

    async fn emote(&self, id: EmoteId) -> GatewayResult<Option<Emote>> {
        Ok(self.state.lock().emotes.get(&id).cloned())
    }

    async fn disconnect(&self) {
        self.state.lock().disconnects += 1;
    }
}

// ─── Context helpers ──────────────────────────────────────────────────────────

/// A message from [`TEST_AUTHOR`] in [`TEST_CHANNEL`].
pub fn message_event(content: &str, guild: Option<GuildId>) -> MessageEvent {
    MessageEvent {
        message_id: TEST_MESSAGE,
        channel_id: TEST_CHANNEL,
        guild_id: guild,
        author: User::new(TEST_AUTHOR, "tester"),
        content: content.to_string(),
    }
}

/// A fresh manager backed by a [`MemoryStore`].
pub fn test_manager() -> Arc<PluginManager> {
    Arc::new(PluginManager::new(Arc::new(MemoryStore::new())))
}

/// Builds a context for `content` over `gateway` with prefix `!`.
pub fn context_with(
    gateway: MockGateway,
    content: &str,
    guild: Option<GuildId>,
) -> (CommandContext, Arc<MockGateway>) {
    let gateway = Arc::new(gateway);
    let boxed: BoxedGateway = gateway.clone();
    let ctx = CommandContext::new(
        Arc::new(message_event(content, guild)),
        boxed,
        test_manager().host(),
        "!",
    );
    (ctx, gateway)
}

/// A context for a message sent in [`TEST_GUILD`].
pub fn guild_context(content: &str) -> (CommandContext, Arc<MockGateway>) {
    context_with(MockGateway::new(), content, Some(TEST_GUILD))
}

/// A context for a direct message.
pub fn direct_context(content: &str) -> (CommandContext, Arc<MockGateway>) {
    context_with(MockGateway::new(), content, None)
}
