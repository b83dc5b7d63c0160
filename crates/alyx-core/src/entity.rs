//! Gateway entities resolved by id or mention.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{ChannelId, EmoteId, GuildId, RoleId, UserId};

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Whether the account is a bot.
    #[serde(default)]
    pub bot: bool,
}

impl User {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bot: false,
        }
    }

    /// Returns the `<@id>` mention form.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// A role inside a guild.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub guild_id: GuildId,
    pub name: String,
}

impl Role {
    pub fn new(id: impl Into<RoleId>, guild_id: impl Into<GuildId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            guild_id: guild_id.into(),
            name: name.into(),
        }
    }
}

/// A text channel. Direct-message channels have no guild.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub name: String,
}

impl Channel {
    /// Returns the `<#id>` mention form.
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

/// A custom emote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Emote {
    pub id: EmoteId,
    pub name: String,
    #[serde(default)]
    pub animated: bool,
}

impl fmt::Display for Emote {
    /// Formats as `<:name:id>`, or `<a:name:id>` when animated.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.animated { "a" } else { "" };
        write!(f, "<{prefix}:{}:{}>", self.name, self.id)
    }
}
