//! Snowflake identifiers.
//!
//! Every entity on the gateway is addressed by a 64-bit snowflake. Each kind
//! gets its own newtype so a [`RoleId`] can never be passed where a
//! [`ChannelId`] is expected.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Wraps a raw snowflake.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Returns the raw snowflake.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

snowflake!(
    /// Identifies a user account.
    UserId
);
snowflake!(
    /// Identifies a text channel (guild channel or direct message).
    ChannelId
);
snowflake!(
    /// Identifies a guild (server).
    GuildId
);
snowflake!(
    /// Identifies a single message.
    MessageId
);
snowflake!(
    /// Identifies a guild role.
    RoleId
);
snowflake!(
    /// Identifies a custom emote.
    EmoteId
);
