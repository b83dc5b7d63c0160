//! The chat-gateway collaborator.
//!
//! A [`Gateway`] is everything the framework needs from a live chat
//! connection: read accessors for guild state and fire-and-forget send
//! operations. Wire formats, caching and reconnection are the
//! implementation's business.
//!
//! # Example
//!
//! ```rust,ignore
//! struct MyGateway { /* client handle */ }
//!
//! #[async_trait]
//! impl Gateway for MyGateway {
//!     fn self_user(&self) -> User { /* ... */ }
//!     async fn send_reply(&self, channel: ChannelId, reply: Reply) -> GatewayResult<MessageId> {
//!         // ...
//!     }
//!     // ...
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::entity::{Channel, Emote, Role, User};
use crate::error::GatewayResult;
use crate::id::{ChannelId, EmoteId, GuildId, MessageId, RoleId, UserId};
use crate::permission::Permission;
use crate::reply::Reply;

/// A live connection to a chat service.
#[async_trait]
pub trait Gateway: Send + Sync + 'static {
    /// The account the bot is logged in as.
    fn self_user(&self) -> User;

    /// The owner of the bot application, if the service exposes one.
    async fn application_owner(&self) -> GatewayResult<Option<UserId>> {
        Ok(None)
    }

    // ─── Outbound ────────────────────────────────────────────────────────────

    /// Sends a reply to `channel` and returns the id of the new message.
    async fn send_reply(&self, channel: ChannelId, reply: Reply) -> GatewayResult<MessageId>;

    /// Adds a reaction to a message.
    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> GatewayResult<()>;

    /// Whether the bot itself may add reactions in `channel`.
    async fn can_react(&self, channel: ChannelId) -> bool;

    // ─── Guild membership ────────────────────────────────────────────────────

    /// Roles held by `user` in `guild`.
    async fn member_roles(&self, guild: GuildId, user: UserId) -> GatewayResult<Vec<Role>>;

    /// Whether `user` holds `permission` in `guild`.
    ///
    /// When `channel` is given the check includes channel overrides,
    /// otherwise only the guild-wide grant counts.
    async fn has_permission(
        &self,
        guild: GuildId,
        channel: Option<ChannelId>,
        user: UserId,
        permission: &Permission,
    ) -> GatewayResult<bool>;

    // ─── Lookups ─────────────────────────────────────────────────────────────

    async fn user(&self, id: UserId) -> GatewayResult<Option<User>>;

    async fn role(&self, id: RoleId) -> GatewayResult<Option<Role>>;

    async fn guild_roles(&self, guild: GuildId) -> GatewayResult<Vec<Role>>;

    async fn channel(&self, id: ChannelId) -> GatewayResult<Option<Channel>>;

    async fn emote(&self, id: EmoteId) -> GatewayResult<Option<Emote>>;

    /// Tears the connection down. Called last during shutdown.
    async fn disconnect(&self);
}

/// A shared, type-erased gateway.
pub type BoxedGateway = Arc<dyn Gateway>;
