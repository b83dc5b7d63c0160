//! Inbound gateway events.
//!
//! Events are type-erased behind `dyn Event` so that the event waiter can
//! hold pending requests for any event type, and are recovered with
//! [`downcast_ref`](trait.Event.html#method.downcast_ref).
//!
//! The framework itself only consumes two concrete events:
//!
//! - [`MessageEvent`] - a text message, the input to command dispatch
//! - [`ReactionEvent`] - a reaction added to a message

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entity::User;
use crate::id::{ChannelId, GuildId, MessageId, UserId};

// ============================================================================
// Core Event Trait
// ============================================================================

/// The base trait for all events delivered by a gateway.
pub trait Event: Any + Send + Sync + fmt::Debug {
    /// Returns the human-readable name of this event type.
    fn event_name(&self) -> &'static str;

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl dyn Event {
    /// Downcasts to a concrete event type.
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.as_any().downcast_ref::<E>()
    }

    /// Returns `true` if this event is of type `E`.
    pub fn is<E: Event>(&self) -> bool {
        self.as_any().is::<E>()
    }
}

/// A type-erased, shareable event.
pub type BoxedEvent = Arc<dyn Event>;

macro_rules! impl_event {
    ($ty:ty, $name:literal) => {
        impl Event for $ty {
            fn event_name(&self) -> &'static str {
                $name
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

// ============================================================================
// Concrete events
// ============================================================================

/// A text message received on a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    /// `None` for direct messages.
    pub guild_id: Option<GuildId>,
    pub author: User,
    pub content: String,
}

impl MessageEvent {
    /// Whether the message was sent inside a guild.
    pub fn is_from_guild(&self) -> bool {
        self.guild_id.is_some()
    }
}

impl_event!(MessageEvent, "message");

/// A reaction added to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub user_id: UserId,
    /// Unicode emoji or custom emote mention.
    pub emoji: String,
}

impl_event!(ReactionEvent, "reaction_add");

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> MessageEvent {
        MessageEvent {
            message_id: MessageId(1),
            channel_id: ChannelId(2),
            guild_id: None,
            author: User::new(3, "someone"),
            content: "!ping".into(),
        }
    }

    #[test]
    fn test_downcast() {
        let event: BoxedEvent = Arc::new(message());
        assert!(event.is::<MessageEvent>());
        assert!(event.downcast_ref::<ReactionEvent>().is_none());
        assert_eq!(event.downcast_ref::<MessageEvent>().unwrap().content, "!ping");
        assert_eq!(event.event_name(), "message");
    }

    #[test]
    fn test_guild_context() {
        let mut msg = message();
        assert!(!msg.is_from_guild());
        msg.guild_id = Some(GuildId(4));
        assert!(msg.is_from_guild());
    }
}
