//! The matchable, invokable command model.

use std::fmt;

use tracing::debug;

use alyx_core::Reply;

use super::authorization::{Authorization, Caller, authorize};
use super::declaration::CommandDefinition;
use super::handler::HandlerMeta;
use super::parser::{BoxedParser, ParameterType, ParserRegistry};
use crate::context::CommandContext;
use crate::error::{CommandResult, PluginError};

/// What [`Command::invoke`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeOutcome {
    /// The caller is not authorized; nothing was sent.
    Denied,
    /// The argument count did not match; help text was sent.
    HelpSent,
    /// The handler ran to completion.
    Completed,
}

/// An immutable command built from a declaration chain and its handler.
///
/// Identity is the owning plugin's identifier plus the display name.
pub struct Command {
    plugin_id: String,
    display_name: String,
    chain: Vec<Vec<String>>,
    authorization: Authorization,
    description: Option<String>,
    parameters: Vec<ParameterType>,
    parsers: Vec<BoxedParser>,
    handler: HandlerMeta,
}

impl Command {
    /// Builds a command, resolving one parser per handler parameter.
    ///
    /// # Errors
    ///
    /// - [`PluginError::InvalidDeclaration`] when a declaration has a blank name
    /// - [`PluginError::UnresolvedParameterParser`] when a parameter type has
    ///   no registered parser
    pub fn build(
        plugin_id: &str,
        definition: CommandDefinition,
        parsers: &ParserRegistry,
    ) -> Result<Self, PluginError> {
        let CommandDefinition { chain, handler } = definition;
        let display_name = chain.display_name();

        let mut positions = Vec::with_capacity(chain.len());
        for declaration in chain.declarations() {
            if declaration.name().trim().is_empty() {
                return Err(PluginError::InvalidDeclaration(format!(
                    "blank command name in '{display_name}'"
                )));
            }
            let tokens = declaration.tokens();
            // Message tokens are split on whitespace and trimmed, so these could never match.
            if let Some(bad) = tokens.iter().find(|t| t.is_empty() || t.contains(char::is_whitespace)) {
                return Err(PluginError::InvalidDeclaration(format!(
                    "'{bad}' in '{display_name}' is blank or contains whitespace"
                )));
            }
            positions.push(tokens);
        }

        let resolved = handler
            .parameters()
            .iter()
            .map(|ty| {
                parsers
                    .resolve(ty)
                    .ok_or_else(|| PluginError::UnresolvedParameterParser {
                        command: display_name.clone(),
                        type_name: ty.type_name,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let terminal = chain.terminal();
        Ok(Self {
            plugin_id: plugin_id.to_string(),
            authorization: Authorization::from_declaration(terminal),
            description: terminal.description_text().map(str::to_string),
            display_name,
            chain: positions,
            parameters: handler.parameters().to_vec(),
            parsers: resolved,
            handler,
        })
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Accepted tokens per chain position.
    pub fn chain(&self) -> &[Vec<String>] {
        &self.chain
    }

    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }

    pub fn authorization(&self) -> &Authorization {
        &self.authorization
    }

    pub fn parameters(&self) -> &[ParameterType] {
        &self.parameters
    }

    /// Whether `tokens` starts with this command's chain.
    ///
    /// Every chain position must match its token exactly (after trimming);
    /// extra trailing tokens are allowed.
    pub fn matches(&self, tokens: &[String]) -> bool {
        tokens.len() >= self.chain.len()
            && self
                .chain
                .iter()
                .zip(tokens)
                .all(|(accepted, token)| accepted.iter().any(|a| a == token.trim()))
    }

    /// The tokens after the chain. A remainder made only of blank tokens is
    /// treated as empty.
    pub fn extract_parameters(&self, tokens: &[String]) -> Vec<String> {
        let rest = tokens.get(self.chain.len()..).unwrap_or_default();
        if rest.iter().all(|t| t.trim().is_empty()) {
            Vec::new()
        } else {
            rest.to_vec()
        }
    }

    /// Usage line plus the description, if any.
    pub fn help_text(&self, prefix: &str) -> String {
        let mut usage = format!("Usage: {prefix}{}", self.display_name);
        for param in &self.parameters {
            usage.push_str(&format!(" <{}>", param.type_name));
        }
        match &self.description {
            Some(description) => format!("{usage}\n{description}"),
            None => usage,
        }
    }

    /// Authorizes, parses and runs the command against `tokens` (the message
    /// text after the prefix, already tokenized).
    ///
    /// Denial is silent. A wrong argument count sends the help text instead
    /// of running the handler. A parse failure aborts before the handler runs.
    pub async fn invoke(
        &self,
        ctx: &CommandContext,
        tokens: &[String],
        caller: &dyn Caller,
    ) -> CommandResult<InvokeOutcome> {
        let decision = authorize(&self.authorization, caller).await;
        if !decision.allowed {
            debug!(
                command = %self.display_name,
                user = %ctx.author().id,
                rule = decision.rule.map(|r| r.name()).unwrap_or("none"),
                "Command denied"
            );
            return Ok(InvokeOutcome::Denied);
        }

        let params = self.extract_parameters(tokens);
        if params.len() != self.parsers.len() {
            debug!(
                command = %self.display_name,
                expected = self.parsers.len(),
                got = params.len(),
                "Argument count mismatch, sending help"
            );
            let help = format!("{} Help\n{}", self.display_name, self.help_text(ctx.prefix()));
            ctx.reply(Reply::info(help)).await?;
            return Ok(InvokeOutcome::HelpSent);
        }

        let mut args = Vec::with_capacity(params.len());
        for (value, parser) in params.iter().zip(&self.parsers) {
            args.push(parser.parse_erased(value, ctx).await?);
        }

        self.handler.call(ctx.clone(), args).await?;
        Ok(InvokeOutcome::Completed)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("plugin_id", &self.plugin_id)
            .field("display_name", &self.display_name)
            .field("chain", &self.chain)
            .field("authorization", &self.authorization)
            .field("handler", &self.handler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use alyx_core::PermissionLevel;

    use super::*;
    use crate::command::authorization::{AccessPolicy, ContextCaller};
    use crate::command::{CommandChain, CommandDeclaration, split_with_quotes};
    use crate::error::CommandError;
    use crate::testing::{direct_context, guild_context};

    fn build(definition: CommandDefinition) -> Command {
        Command::build("test.plugin", definition, &ParserRegistry::with_defaults()).unwrap()
    }

    fn tokens(text: &str) -> Vec<String> {
        split_with_quotes(text)
    }

    fn plugins_load() -> Command {
        build(
            CommandChain::of(CommandDeclaration::new("plugins").alias("p"))
                .then(CommandDeclaration::new("load"))
                .handler(|_ctx: CommandContext, _name: String| async {}),
        )
    }

    #[test]
    fn test_matches_chain_prefix() {
        let cmd = plugins_load();
        assert!(cmd.matches(&tokens("plugins load Foo")));
        assert!(cmd.matches(&tokens("p load")));
        assert!(!cmd.matches(&tokens("plugins")));
        assert!(!cmd.matches(&tokens("plugins unload Foo")));
        // Case-sensitive.
        assert!(!cmd.matches(&tokens("Plugins load")));
    }

    #[test]
    fn test_quoted_chain_token_is_trimmed() {
        assert!(plugins_load().matches(&tokens(r#""plugins " load"#)));
    }

    #[test]
    fn test_extract_parameters() {
        let cmd = plugins_load();
        assert_eq!(cmd.extract_parameters(&tokens("plugins load Foo")), vec!["Foo"]);
        assert!(cmd.extract_parameters(&tokens("plugins load   ")).is_empty());
        assert!(cmd.extract_parameters(&tokens("plugins load")).is_empty());
        assert!(cmd.extract_parameters(&tokens(r#"plugins load "  ""#)).is_empty());
        assert_eq!(
            cmd.extract_parameters(&tokens(r#"plugins load "My Plugin" x"#)),
            vec!["My Plugin", "x"]
        );
    }

    #[test]
    fn test_authorization_from_last_declaration() {
        let cmd = build(
            CommandChain::of(CommandDeclaration::new("shutdown").guild_only())
                .then(CommandDeclaration::new("now").level(PermissionLevel::BotAdmin))
                .handler(|_ctx: CommandContext| async {}),
        );
        assert_eq!(cmd.display_name(), "shutdown now");
        assert_eq!(cmd.authorization().level, PermissionLevel::BotAdmin);
        assert!(!cmd.authorization().guild_only);
    }

    #[test]
    fn test_unresolved_parser() {
        let definition = CommandChain::of(CommandDeclaration::new("odd"))
            .handler(|_ctx: CommandContext, _v: u8| async {});
        let err = Command::build("p", definition, &ParserRegistry::with_defaults()).unwrap_err();
        assert!(matches!(
            err,
            PluginError::UnresolvedParameterParser { type_name: "u8", .. }
        ));
    }

    #[test]
    fn test_blank_name_rejected() {
        let definition =
            CommandChain::of(CommandDeclaration::new("  ")).handler(|_ctx: CommandContext| async {});
        let err = Command::build("p", definition, &ParserRegistry::new()).unwrap_err();
        assert!(matches!(err, PluginError::InvalidDeclaration(_)));
    }

    #[test]
    fn test_unreachable_tokens_rejected() {
        let cases = [
            CommandDeclaration::new("plugins load"),
            CommandDeclaration::new(" ping"),
            CommandDeclaration::new("ping").alias("p "),
            CommandDeclaration::new("ping").alias(""),
        ];
        for declaration in cases {
            let definition = CommandChain::of(declaration).handler(|_ctx: CommandContext| async {});
            let err = Command::build("p", definition, &ParserRegistry::new()).unwrap_err();
            assert!(matches!(err, PluginError::InvalidDeclaration(_)), "{err}");
        }

        let nested = CommandChain::of(CommandDeclaration::new("plugins"))
            .then(CommandDeclaration::new("load\tnow"))
            .handler(|_ctx: CommandContext| async {});
        assert!(Command::build("p", nested, &ParserRegistry::new()).is_err());
    }

    #[test]
    fn test_help_text() {
        let cmd = build(
            CommandChain::of(CommandDeclaration::new("roll").description("Rolls a die"))
                .handler(|_ctx: CommandContext, _sides: i64, _times: i32| async {}),
        );
        assert_eq!(cmd.help_text("!"), "Usage: !roll <i64> <i32>\nRolls a die");
    }

    #[tokio::test]
    async fn test_invoke_wrong_arity_sends_help() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cmd = build(CommandChain::of(CommandDeclaration::new("echo")).handler(
            move |_ctx: CommandContext, _text: String| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
        ));
        let policy = AccessPolicy::default();

        for text in ["echo", "echo a b"] {
            let (ctx, gateway) = guild_context(&format!("!{text}"));
            let caller = ContextCaller::new(&ctx, &policy);
            let outcome = cmd.invoke(&ctx, &tokens(text), &caller).await.unwrap();
            assert_eq!(outcome, InvokeOutcome::HelpSent);
            assert!(gateway.sent_texts()[0].contains("Usage: !echo <String>"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invoke_parse_failure_aborts() {
        let cmd = build(
            CommandChain::of(CommandDeclaration::new("add"))
                .handler(|_ctx: CommandContext, a: i64, b: i64| async move { format!("{}", a + b) }),
        );
        let policy = AccessPolicy::default();
        let (ctx, gateway) = guild_context("!add 1 two");
        let caller = ContextCaller::new(&ctx, &policy);
        let err = cmd.invoke(&ctx, &tokens("add 1 two"), &caller).await.unwrap_err();
        assert!(matches!(err, CommandError::Parse(ref e) if e.value == "two"));
        assert!(gateway.sent_texts().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_denied_is_silent() {
        let cmd = build(
            CommandChain::of(CommandDeclaration::new("secret").level(PermissionLevel::BotOwner))
                .handler(|_ctx: CommandContext| async { "classified" }),
        );
        let policy = AccessPolicy::default();
        let (ctx, gateway) = direct_context("!secret");
        let caller = ContextCaller::new(&ctx, &policy);
        let outcome = cmd.invoke(&ctx, &tokens("secret"), &caller).await.unwrap();
        assert_eq!(outcome, InvokeOutcome::Denied);
        assert!(gateway.sent_texts().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_completes() {
        let cmd = build(
            CommandChain::of(CommandDeclaration::new("add"))
                .handler(|_ctx: CommandContext, a: i64, b: i64| async move { format!("{}", a + b) }),
        );
        let policy = AccessPolicy::default();
        let (ctx, gateway) = guild_context("!add 2 40");
        let caller = ContextCaller::new(&ctx, &policy);
        let outcome = cmd.invoke(&ctx, &tokens("add 2 40"), &caller).await.unwrap();
        assert_eq!(outcome, InvokeOutcome::Completed);
        assert_eq!(gateway.sent_texts(), vec!["42"]);
    }
}
