//! Parameter parsers.
//!
//! A [`ParameterParser`] turns one raw token into a typed value, with the
//! invoking [`CommandContext`] available for lookups (e.g. resolving a role
//! name inside the current guild). Parsers are stored in a
//! [`ParserRegistry`] keyed by the [`TypeId`] of the value they produce, and a
//! command's handler signature is resolved against that registry when the
//! owning plugin is loaded.
//!
//! # Default parsers
//!
//! | Type | Accepts |
//! |------|---------|
//! | `String` | any token, verbatim |
//! | `i32`, `i64`, `f64` | the usual numeric literals |
//! | `bool` | `true/false/yes/no/y/n/1/0`, case-insensitive |
//! | `SystemTime` | epoch milliseconds |
//! | [`User`] | `123`, `<@123>`, `<@!123>` |
//! | [`Role`] | `123`, `<@&123>`, or a role name in the current guild |
//! | [`Channel`] | `123`, `<#123>` |
//! | [`Emote`] | `123`, `<:name:123>`, `<a:name:123>` |
//!
//! # Custom parsers
//!
//! ```rust,ignore
//! struct ColorParser;
//!
//! #[async_trait]
//! impl ParameterParser for ColorParser {
//!     type Output = Color;
//!
//!     async fn parse(&self, value: &str, _ctx: &CommandContext) -> Result<Color, CommandParseError> {
//!         u32::from_str_radix(value.trim_start_matches('#'), 16)
//!             .map(Color)
//!             .map_err(|_| CommandParseError::new(value, self.type_name()))
//!     }
//! }
//!
//! manager.register_parser(ColorParser);
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::warn;

use alyx_core::{Channel, ChannelId, Emote, EmoteId, Role, RoleId, User, UserId};

use crate::context::CommandContext;
use crate::error::CommandParseError;

/// Returns the unqualified name of `T` (`alloc::string::String` → `String`).
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// ============================================================================
// ParameterParser
// ============================================================================

/// Converts a raw token into a typed command argument.
#[async_trait]
pub trait ParameterParser: Send + Sync + 'static {
    /// The type this parser produces.
    type Output: Send + 'static;

    /// Name used in help text and parse errors.
    fn type_name(&self) -> &'static str {
        short_type_name::<Self::Output>()
    }

    async fn parse(
        &self,
        value: &str,
        ctx: &CommandContext,
    ) -> Result<Self::Output, CommandParseError>;
}

/// Object-safe form of [`ParameterParser`] producing a boxed value.
#[async_trait]
pub trait ErasedParser: Send + Sync {
    fn target_name(&self) -> &'static str;

    async fn parse_erased(
        &self,
        value: &str,
        ctx: &CommandContext,
    ) -> Result<Box<dyn Any + Send>, CommandParseError>;
}

#[async_trait]
impl<P: ParameterParser> ErasedParser for P {
    fn target_name(&self) -> &'static str {
        self.type_name()
    }

    async fn parse_erased(
        &self,
        value: &str,
        ctx: &CommandContext,
    ) -> Result<Box<dyn Any + Send>, CommandParseError> {
        let parsed = self.parse(value, ctx).await?;
        Ok(Box::new(parsed))
    }
}

/// A shareable, type-erased parser.
pub type BoxedParser = Arc<dyn ErasedParser>;

/// The declared type of one handler parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterType {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl ParameterType {
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: short_type_name::<T>(),
        }
    }
}

// ============================================================================
// ParserRegistry
// ============================================================================

/// Maps a value type to the parser that produces it.
#[derive(Clone, Default)]
pub struct ParserRegistry {
    parsers: HashMap<TypeId, BoxedParser>,
}

impl ParserRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with the default parsers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(StringParser)
            .register(I32Parser)
            .register(I64Parser)
            .register(F64Parser)
            .register(BoolParser)
            .register(EpochMillisParser)
            .register(UserParser)
            .register(RoleParser)
            .register(ChannelParser)
            .register(EmoteParser);
        registry
    }

    /// Registers `parser` for its output type, replacing any previous parser
    /// for the same type.
    pub fn register<P: ParameterParser>(&mut self, parser: P) -> &mut Self {
        self.parsers
            .insert(TypeId::of::<P::Output>(), Arc::new(parser));
        self
    }

    pub fn resolve(&self, ty: &ParameterType) -> Option<BoxedParser> {
        self.parsers.get(&ty.type_id).cloned()
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.parsers.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries(self.parsers.values().map(|p| p.target_name()))
            .finish()
    }
}

// ============================================================================
// Scalar parsers
// ============================================================================

/// Passes the token through unchanged.
pub struct StringParser;

#[async_trait]
impl ParameterParser for StringParser {
    type Output = String;

    async fn parse(&self, value: &str, _ctx: &CommandContext) -> Result<String, CommandParseError> {
        Ok(value.to_string())
    }
}

macro_rules! from_str_parser {
    ($(#[$meta:meta])* $name:ident => $ty:ty) => {
        $(#[$meta])*
        pub struct $name;

        #[async_trait]
        impl ParameterParser for $name {
            type Output = $ty;

            async fn parse(
                &self,
                value: &str,
                _ctx: &CommandContext,
            ) -> Result<$ty, CommandParseError> {
                value
                    .trim()
                    .parse::<$ty>()
                    .map_err(|_| CommandParseError::new(value, self.type_name()))
            }
        }
    };
}

from_str_parser!(
    /// Parses a 32-bit signed integer.
    I32Parser => i32
);
from_str_parser!(
    /// Parses a 64-bit signed integer.
    I64Parser => i64
);
from_str_parser!(
    /// Parses a 64-bit float.
    F64Parser => f64
);

/// Parses yes/no style booleans.
pub struct BoolParser;

#[async_trait]
impl ParameterParser for BoolParser {
    type Output = bool;

    async fn parse(&self, value: &str, _ctx: &CommandContext) -> Result<bool, CommandParseError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Ok(true),
            "false" | "no" | "n" | "0" => Ok(false),
            _ => Err(CommandParseError::new(value, "bool")),
        }
    }
}

/// Parses milliseconds since the Unix epoch into a [`SystemTime`].
pub struct EpochMillisParser;

#[async_trait]
impl ParameterParser for EpochMillisParser {
    type Output = SystemTime;

    async fn parse(
        &self,
        value: &str,
        _ctx: &CommandContext,
    ) -> Result<SystemTime, CommandParseError> {
        let err = || CommandParseError::new(value, "SystemTime");
        let millis: i64 = value.trim().parse().map_err(|_| err())?;
        let offset = Duration::from_millis(millis.unsigned_abs());
        let time = if millis >= 0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        };
        time.ok_or_else(err)
    }
}

// ============================================================================
// Gateway entity parsers
// ============================================================================

/// Extracts the snowflake from a bare id or a `<{prefix}id>` mention.
fn parse_mention(value: &str, prefixes: &[&str]) -> Option<u64> {
    let value = value.trim();
    if let Ok(id) = value.parse() {
        return Some(id);
    }
    let inner = value.strip_prefix('<')?.strip_suffix('>')?;
    prefixes
        .iter()
        .find_map(|prefix| inner.strip_prefix(prefix))
        .and_then(|id| id.parse().ok())
}

/// Extracts the snowflake from a bare id or a `<:name:id>` / `<a:name:id>`
/// emote mention.
fn parse_emote_mention(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Ok(id) = value.parse() {
        return Some(id);
    }
    let inner = value.strip_prefix('<')?.strip_suffix('>')?;
    let inner = inner.strip_prefix('a').unwrap_or(inner);
    let (name, id) = inner.strip_prefix(':')?.rsplit_once(':')?;
    if name.is_empty() {
        return None;
    }
    id.parse().ok()
}

/// Logs a lookup failure and converts it into a parse error.
fn lookup_failed(value: &str, expected: &'static str, err: impl std::fmt::Display) -> CommandParseError {
    warn!(value = %value, expected, error = %err, "Gateway lookup failed while parsing parameter");
    CommandParseError::new(value, expected)
}

/// Resolves a [`User`] by id or mention.
pub struct UserParser;

#[async_trait]
impl ParameterParser for UserParser {
    type Output = User;

    async fn parse(&self, value: &str, ctx: &CommandContext) -> Result<User, CommandParseError> {
        let id = parse_mention(value, &["@!", "@"])
            .ok_or_else(|| CommandParseError::new(value, "User"))?;
        ctx.gateway()
            .user(UserId(id))
            .await
            .map_err(|e| lookup_failed(value, "User", e))?
            .ok_or_else(|| CommandParseError::new(value, "User"))
    }
}

/// Resolves a [`Role`] of the current guild by id, mention or
/// case-insensitive name.
pub struct RoleParser;

#[async_trait]
impl ParameterParser for RoleParser {
    type Output = Role;

    async fn parse(&self, value: &str, ctx: &CommandContext) -> Result<Role, CommandParseError> {
        let guild = ctx
            .guild_id()
            .ok_or_else(|| CommandParseError::new(value, "Role"))?;

        if let Some(id) = parse_mention(value, &["@&"]) {
            let role = ctx
                .gateway()
                .role(RoleId(id))
                .await
                .map_err(|e| lookup_failed(value, "Role", e))?;
            if let Some(role) = role.filter(|r| r.guild_id == guild) {
                return Ok(role);
            }
        }

        let wanted = value.trim();
        ctx.gateway()
            .guild_roles(guild)
            .await
            .map_err(|e| lookup_failed(value, "Role", e))?
            .into_iter()
            .find(|r| r.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CommandParseError::new(value, "Role"))
    }
}

/// Resolves a [`Channel`] by id or `<#id>` mention.
pub struct ChannelParser;

#[async_trait]
impl ParameterParser for ChannelParser {
    type Output = Channel;

    async fn parse(&self, value: &str, ctx: &CommandContext) -> Result<Channel, CommandParseError> {
        let id = parse_mention(value, &["#"])
            .ok_or_else(|| CommandParseError::new(value, "Channel"))?;
        ctx.gateway()
            .channel(ChannelId(id))
            .await
            .map_err(|e| lookup_failed(value, "Channel", e))?
            .ok_or_else(|| CommandParseError::new(value, "Channel"))
    }
}

/// Resolves a custom [`Emote`] by id or mention.
pub struct EmoteParser;

#[async_trait]
impl ParameterParser for EmoteParser {
    type Output = Emote;

    async fn parse(&self, value: &str, ctx: &CommandContext) -> Result<Emote, CommandParseError> {
        let id = parse_emote_mention(value).ok_or_else(|| CommandParseError::new(value, "Emote"))?;
        ctx.gateway()
            .emote(EmoteId(id))
            .await
            .map_err(|e| lookup_failed(value, "Emote", e))?
            .ok_or_else(|| CommandParseError::new(value, "Emote"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockGateway, guild_context};
    use alyx_core::{GuildId, RoleId};

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<String>(), "String");
        assert_eq!(short_type_name::<i64>(), "i64");
        assert_eq!(short_type_name::<User>(), "User");
        assert_eq!(short_type_name::<SystemTime>(), "SystemTime");
    }

    #[test]
    fn test_mention_parsing() {
        assert_eq!(parse_mention("42", &["@"]), Some(42));
        assert_eq!(parse_mention("<@42>", &["@!", "@"]), Some(42));
        assert_eq!(parse_mention("<@!42>", &["@!", "@"]), Some(42));
        assert_eq!(parse_mention("<#7>", &["#"]), Some(7));
        assert_eq!(parse_mention("<#7>", &["@"]), None);
        assert_eq!(parse_mention("general", &["#"]), None);
        assert_eq!(parse_emote_mention("<:blob:99>"), Some(99));
        assert_eq!(parse_emote_mention("<a:blob:99>"), Some(99));
        assert_eq!(parse_emote_mention("<::99>"), None);
    }

    #[test]
    fn test_defaults_registered() {
        let registry = ParserRegistry::with_defaults();
        assert!(registry.contains::<String>());
        assert!(registry.contains::<i64>());
        assert!(registry.contains::<Role>());
        assert!(!registry.contains::<u8>());
        assert_eq!(registry.len(), 10);
    }

    #[tokio::test]
    async fn test_scalar_parsers() {
        let (ctx, _) = guild_context("!x");
        assert_eq!(I64Parser.parse(" 42 ", &ctx).await, Ok(42));
        assert_eq!(F64Parser.parse("2.5", &ctx).await, Ok(2.5));
        assert_eq!(BoolParser.parse("Yes", &ctx).await, Ok(true));

        let err = I32Parser.parse("forty", &ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "Unable to parse value 'forty' into type 'i32'");

        let time = EpochMillisParser.parse("1500", &ctx).await.unwrap();
        assert_eq!(time.duration_since(UNIX_EPOCH).unwrap(), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_role_parser_by_name_and_id() {
        let gateway = MockGateway::new();
        gateway.add_role(alyx_core::Role::new(5, GuildId(1), "Moderators"));
        let (ctx, _) = crate::testing::context_with(gateway, "!x", Some(GuildId(1)));

        let by_name = RoleParser.parse("moderators", &ctx).await.unwrap();
        assert_eq!(by_name.id, RoleId(5));
        let by_id = RoleParser.parse("<@&5>", &ctx).await.unwrap();
        assert_eq!(by_id.name, "Moderators");
        assert!(RoleParser.parse("admins", &ctx).await.is_err());
    }

    #[tokio::test]
    async fn test_user_parser_unknown_user() {
        let (ctx, _) = guild_context("!x");
        let err = UserParser.parse("<@404>", &ctx).await.unwrap_err();
        assert_eq!(err.expected, "User");
    }

    #[tokio::test]
    async fn test_register_overrides_default() {
        struct Shouting;

        #[async_trait]
        impl ParameterParser for Shouting {
            type Output = String;

            async fn parse(&self, value: &str, _: &CommandContext) -> Result<String, CommandParseError> {
                Ok(value.to_uppercase())
            }
        }

        let mut registry = ParserRegistry::with_defaults();
        registry.register(Shouting);
        let parser = registry.resolve(&ParameterType::of::<String>()).unwrap();
        let (ctx, _) = guild_context("!x");
        let parsed = parser.parse_erased("hey", &ctx).await.unwrap();
        assert_eq!(*parsed.downcast::<String>().unwrap(), "HEY");
    }
}
