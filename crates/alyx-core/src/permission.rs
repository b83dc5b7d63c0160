//! Authorization vocabulary.
//!
//! Two independent axes gate a command:
//!
//! - [`Permission`] - an opaque gateway permission token, held per guild or
//!   per channel.
//! - [`PermissionLevel`] - a coarse, totally ordered tier computed by the bot
//!   itself from its own configuration.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// PermissionLevel
// ============================================================================

/// Coarse authorization tier.
///
/// Ordering follows declaration order, so `EVERYONE` is the lowest tier and
/// `BOT_OWNER` the highest:
///
/// ```text
/// Everyone < Mod < Admin < BotAdmin < BotOwner
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionLevel {
    #[default]
    Everyone,
    Mod,
    Admin,
    BotAdmin,
    BotOwner,
}

impl PermissionLevel {
    /// Returns `true` if `self` is at or above `other`.
    pub fn is_at_least(self, other: PermissionLevel) -> bool {
        self >= other
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Everyone => "EVERYONE",
            Self::Mod => "MOD",
            Self::Admin => "ADMIN",
            Self::BotAdmin => "BOT_ADMIN",
            Self::BotOwner => "BOT_OWNER",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "EVERYONE" => Ok(Self::Everyone),
            "MOD" => Ok(Self::Mod),
            "ADMIN" => Ok(Self::Admin),
            "BOT_ADMIN" => Ok(Self::BotAdmin),
            "BOT_OWNER" => Ok(Self::BotOwner),
            other => Err(format!("unknown permission level '{other}'")),
        }
    }
}

// ============================================================================
// Permission
// ============================================================================

/// Where a permission is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionScope {
    /// Only meaningful guild-wide.
    Guild,
    /// Can be overridden per channel; also valid guild-wide.
    Channel,
}

/// An opaque gateway permission token.
///
/// The framework never interprets the name; it only asks the gateway whether
/// a member holds it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub name: Cow<'static, str>,
    pub scope: PermissionScope,
}

impl Permission {
    pub const ADMINISTRATOR: Self = Self::guild("ADMINISTRATOR");
    pub const MANAGE_SERVER: Self = Self::guild("MANAGE_SERVER");
    pub const MANAGE_ROLES: Self = Self::guild("MANAGE_ROLES");
    pub const KICK_MEMBERS: Self = Self::guild("KICK_MEMBERS");
    pub const BAN_MEMBERS: Self = Self::guild("BAN_MEMBERS");
    pub const MANAGE_CHANNEL: Self = Self::channel("MANAGE_CHANNEL");
    pub const MANAGE_MESSAGES: Self = Self::channel("MANAGE_MESSAGES");
    pub const MESSAGE_WRITE: Self = Self::channel("MESSAGE_WRITE");
    pub const MESSAGE_ADD_REACTION: Self = Self::channel("MESSAGE_ADD_REACTION");

    /// A guild-wide permission.
    pub const fn guild(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            scope: PermissionScope::Guild,
        }
    }

    /// A permission that may be granted per channel.
    pub const fn channel(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            scope: PermissionScope::Channel,
        }
    }

    pub fn is_channel(&self) -> bool {
        self.scope == PermissionScope::Channel
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
