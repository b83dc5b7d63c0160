//! Commands: declaration, parsing, authorization and invocation.
//!
//! A plugin describes each command as a [`CommandChain`] of
//! [`CommandDeclaration`]s bound to a typed handler. When the plugin loads,
//! the chain is turned into a [`Command`], resolving one
//! [`ParameterParser`] per handler argument from the [`ParserRegistry`].
//!
//! # Example
//!
//! ```ignore
//! CommandChain::of(CommandDeclaration::new("plugins"))
//!     .then(CommandDeclaration::new("load").level(PermissionLevel::BotAdmin))
//!     .handler(|ctx: CommandContext, name: String| async move {
//!         ctx.host().manager().load_by_name(&name).await
//!     })
//! ```

pub mod authorization;
pub mod declaration;
pub mod handler;
pub mod model;
pub mod parser;
pub mod split;

pub use authorization::{AccessPolicy, AuthDecision, AuthRule, Authorization, Caller, ContextCaller};
pub use declaration::{CommandChain, CommandDeclaration, CommandDefinition};
pub use handler::{ContextHandler, HandlerMeta, IntoCommandOutput, MethodHandler, PlainHandler};
pub use model::{Command, InvokeOutcome};
pub use parser::{
    BoolParser, BoxedParser, ChannelParser, EmoteParser, EpochMillisParser, F64Parser, I32Parser,
    I64Parser, ParameterParser, ParameterType, ParserRegistry, RoleParser, StringParser,
    UserParser,
};
pub use split::split_with_quotes;
