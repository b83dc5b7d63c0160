//! Declarative command definitions.
//!
//! A [`CommandDeclaration`] describes one word of a command: its name, its
//! aliases and the authorization it demands. Declarations are chained into a
//! [`CommandChain`] to form multi-word commands, and a chain is bound to a
//! handler to produce a [`CommandDefinition`]:
//!
//! ```rust,ignore
//! CommandChain::of(CommandDeclaration::new("plugins").alias("p"))
//!     .then(CommandDeclaration::new("load").level(PermissionLevel::BotAdmin))
//!     .method(self.clone(), Self::load_plugin)
//! ```
//!
//! Only the **last** declaration's authorization applies to the command.

use std::sync::Arc;

use alyx_core::{Permission, PermissionLevel};

use super::handler::{ContextHandler, HandlerMeta, MethodHandler, PlainHandler, boxed_handler};

// ============================================================================
// CommandDeclaration
// ============================================================================

/// One word of a command and its authorization requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandDeclaration {
    name: String,
    aliases: Vec<String>,
    permissions: Vec<Permission>,
    roles: Vec<String>,
    level: PermissionLevel,
    guild_only: bool,
    description: Option<String>,
}

impl CommandDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Any one of the declared permissions grants access.
    pub fn permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    /// Any one of the declared role names grants access.
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn level(mut self, level: PermissionLevel) -> Self {
        self.level = level;
        self
    }

    pub fn guild_only(mut self) -> Self {
        self.guild_only = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn minimum_level(&self) -> PermissionLevel {
        self.level
    }

    pub fn is_guild_only(&self) -> bool {
        self.guild_only
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The name followed by every alias, in declaration order, without
    /// duplicates.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::with_capacity(1 + self.aliases.len());
        for token in std::iter::once(&self.name).chain(&self.aliases) {
            if !tokens.contains(token) {
                tokens.push(token.clone());
            }
        }
        tokens
    }
}

// ============================================================================
// CommandChain
// ============================================================================

/// An ordered, non-empty sequence of declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandChain {
    head: CommandDeclaration,
    tail: Vec<CommandDeclaration>,
}

impl CommandChain {
    pub fn of(declaration: CommandDeclaration) -> Self {
        Self {
            head: declaration,
            tail: Vec::new(),
        }
    }

    /// Appends a nested word.
    pub fn then(mut self, declaration: CommandDeclaration) -> Self {
        self.tail.push(declaration);
        self
    }

    pub fn declarations(&self) -> impl Iterator<Item = &CommandDeclaration> {
        std::iter::once(&self.head).chain(&self.tail)
    }

    pub fn len(&self) -> usize {
        1 + self.tail.len()
    }

    /// Always `false`; a chain has at least one declaration.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The declaration whose authorization applies.
    pub fn terminal(&self) -> &CommandDeclaration {
        self.tail.last().unwrap_or(&self.head)
    }

    /// Declaration names joined by a space.
    pub fn display_name(&self) -> String {
        self.declarations()
            .map(CommandDeclaration::name)
            .collect::<Vec<_>>()
            .join(" ")
    }

    // ─── Handler binding ─────────────────────────────────────────────────────

    /// Binds a handler taking the context followed by typed arguments.
    pub fn handler<F, Args>(self, f: F) -> CommandDefinition
    where
        F: ContextHandler<Args>,
    {
        let parameters = F::parameters();
        let call = boxed_handler(move |ctx, args| f.call(ctx, args));
        CommandDefinition::new(self, HandlerMeta::new(true, parameters, call))
    }

    /// Binds a method of `plugin`: `f(plugin, ctx, args..)`.
    pub fn method<P, F, Args>(self, plugin: Arc<P>, f: F) -> CommandDefinition
    where
        P: Send + Sync + 'static,
        F: MethodHandler<P, Args>,
    {
        let parameters = F::parameters();
        let call = boxed_handler(move |ctx, args| f.call(Arc::clone(&plugin), ctx, args));
        CommandDefinition::new(self, HandlerMeta::new(true, parameters, call))
    }

    /// Binds a handler that only takes typed arguments. Its output is still
    /// delivered to the invoking channel.
    pub fn handler_without_context<F, Args>(self, f: F) -> CommandDefinition
    where
        F: PlainHandler<Args>,
    {
        let parameters = F::parameters();
        let call = boxed_handler(move |ctx, args| f.call(ctx, args));
        CommandDefinition::new(self, HandlerMeta::new(false, parameters, call))
    }
}

impl From<CommandDeclaration> for CommandChain {
    fn from(declaration: CommandDeclaration) -> Self {
        Self::of(declaration)
    }
}

// ============================================================================
// CommandDefinition
// ============================================================================

/// A declaration chain bound to its handler; what a plugin hands the manager
/// for each of its commands.
#[derive(Clone)]
pub struct CommandDefinition {
    pub(crate) chain: CommandChain,
    pub(crate) handler: HandlerMeta,
}

impl CommandDefinition {
    fn new(chain: CommandChain, handler: HandlerMeta) -> Self {
        Self { chain, handler }
    }

    pub fn chain(&self) -> &CommandChain {
        &self.chain
    }

    pub fn handler(&self) -> &HandlerMeta {
        &self.handler
    }
}

impl std::fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("chain", &self.chain.display_name())
            .field("handler", &self.handler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_dedup_in_order() {
        let decl = CommandDeclaration::new("plugins").alias("p").alias("plugins").alias("pl");
        assert_eq!(decl.tokens(), vec!["plugins", "p", "pl"]);
    }

    #[test]
    fn test_chain_terminal_and_name() {
        let chain = CommandChain::of(CommandDeclaration::new("plugins"))
            .then(CommandDeclaration::new("load").level(PermissionLevel::BotAdmin));
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.display_name(), "plugins load");
        assert_eq!(chain.terminal().name(), "load");
        assert_eq!(chain.terminal().minimum_level(), PermissionLevel::BotAdmin);

        let single = CommandChain::of(CommandDeclaration::new("ping"));
        assert_eq!(single.terminal().name(), "ping");
    }
}
