//! Typed command handlers.
//!
//! Handlers are plain async functions whose non-context parameters are the
//! command's typed arguments. Blanket implementations over function arities
//! (in the style of Axum's handlers) record the parameter types, so the
//! manager can resolve one [`ParameterParser`](super::parser::ParameterParser)
//! per argument when the plugin loads, and erase the function into a
//! [`BoxedCommandHandler`].
//!
//! Three shapes are supported:
//!
//! | Trait | Signature |
//! |-------|-----------|
//! | [`ContextHandler`] | `async fn(CommandContext, A1, .., An) -> Out` |
//! | [`MethodHandler`] | `async fn(Arc<P>, CommandContext, A1, .., An) -> Out` |
//! | [`PlainHandler`] | `async fn(A1, .., An) -> Out` |
//!
//! `Out` is anything implementing [`IntoCommandOutput`]: `()`, a [`Reply`],
//! a `String`, or a `Result` / `Option` of those.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{self, BoxFuture};

use alyx_core::Reply;

use super::parser::{ParameterType, short_type_name};
use crate::context::CommandContext;
use crate::error::{CommandError, CommandResult};

// ============================================================================
// IntoCommandOutput - Handle handler return values
// ============================================================================

/// Converts a handler's return value into the command's result, sending a
/// reply when the value is one.
#[async_trait]
pub trait IntoCommandOutput: Send {
    async fn into_output(self, ctx: &CommandContext) -> CommandResult;
}

#[async_trait]
impl IntoCommandOutput for () {
    async fn into_output(self, _ctx: &CommandContext) -> CommandResult {
        Ok(())
    }
}

#[async_trait]
impl IntoCommandOutput for Reply {
    async fn into_output(self, ctx: &CommandContext) -> CommandResult {
        ctx.reply(self).await?;
        Ok(())
    }
}

#[async_trait]
impl IntoCommandOutput for String {
    async fn into_output(self, ctx: &CommandContext) -> CommandResult {
        ctx.reply(Reply::Text(self)).await?;
        Ok(())
    }
}

#[async_trait]
impl IntoCommandOutput for &'static str {
    async fn into_output(self, ctx: &CommandContext) -> CommandResult {
        ctx.reply(Reply::text(self)).await?;
        Ok(())
    }
}

#[async_trait]
impl<T: IntoCommandOutput> IntoCommandOutput for Option<T> {
    async fn into_output(self, ctx: &CommandContext) -> CommandResult {
        match self {
            Some(out) => out.into_output(ctx).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<T, E> IntoCommandOutput for Result<T, E>
where
    T: IntoCommandOutput,
    E: Into<CommandError> + Send,
{
    async fn into_output(self, ctx: &CommandContext) -> CommandResult {
        match self {
            Ok(out) => out.into_output(ctx).await,
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// BoxedCommandHandler / HandlerMeta
// ============================================================================

/// Parsed arguments, in parameter order.
pub type HandlerArgs = Vec<Box<dyn Any + Send>>;

/// A type-erased handler bound to its plugin instance.
pub type BoxedCommandHandler =
    Arc<dyn Fn(CommandContext, HandlerArgs) -> BoxFuture<'static, CommandResult> + Send + Sync>;

pub(crate) fn boxed_handler<F>(f: F) -> BoxedCommandHandler
where
    F: Fn(CommandContext, HandlerArgs) -> BoxFuture<'static, CommandResult> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// What the manager needs to know about a handler: its parameter types and
/// how to call it.
#[derive(Clone)]
pub struct HandlerMeta {
    receives_context: bool,
    parameters: Vec<ParameterType>,
    call: BoxedCommandHandler,
}

impl HandlerMeta {
    pub(crate) fn new(
        receives_context: bool,
        parameters: Vec<ParameterType>,
        call: BoxedCommandHandler,
    ) -> Self {
        Self {
            receives_context,
            parameters,
            call,
        }
    }

    /// Whether the underlying function takes the [`CommandContext`].
    pub fn receives_context(&self) -> bool {
        self.receives_context
    }

    /// Types of the parsed parameters, in order.
    pub fn parameters(&self) -> &[ParameterType] {
        &self.parameters
    }

    pub(crate) fn call(&self, ctx: CommandContext, args: HandlerArgs) -> BoxFuture<'static, CommandResult> {
        (self.call)(ctx, args)
    }
}

impl fmt::Debug for HandlerMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMeta")
            .field("receives_context", &self.receives_context)
            .field(
                "parameters",
                &self.parameters.iter().map(|p| p.type_name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// Pops the next argument and downcasts it to `T`.
///
/// A mismatch means the parsers resolved at load time disagree with the
/// handler signature, which is a defect rather than bad user input.
fn take_arg<T: 'static>(args: &mut std::vec::IntoIter<Box<dyn Any + Send>>) -> CommandResult<T> {
    let arg = args.next().ok_or_else(|| {
        CommandError::internal(format!("missing argument of type '{}'", short_type_name::<T>()))
    })?;
    arg.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
        CommandError::internal(format!("argument is not of type '{}'", short_type_name::<T>()))
    })
}

// ============================================================================
// Handler traits
// ============================================================================

/// `async fn(CommandContext, A1, .., An)`.
pub trait ContextHandler<Args>: Send + Sync + 'static {
    fn parameters() -> Vec<ParameterType>;

    fn call(&self, ctx: CommandContext, args: HandlerArgs) -> BoxFuture<'static, CommandResult>;
}

/// `async fn(Arc<P>, CommandContext, A1, .., An)`, typically `Self::method`
/// on a plugin.
pub trait MethodHandler<P, Args>: Send + Sync + 'static {
    fn parameters() -> Vec<ParameterType>;

    fn call(
        &self,
        plugin: Arc<P>,
        ctx: CommandContext,
        args: HandlerArgs,
    ) -> BoxFuture<'static, CommandResult>;
}

/// `async fn(A1, .., An)`.
pub trait PlainHandler<Args>: Send + Sync + 'static {
    fn parameters() -> Vec<ParameterType>;

    fn call(&self, ctx: CommandContext, args: HandlerArgs) -> BoxFuture<'static, CommandResult>;
}

/// Binds the next typed argument or bails out with the take error.
macro_rules! bind_arg {
    ($args:ident, $ty:ident) => {
        let $ty = match take_arg::<$ty>(&mut $args) {
            Ok(value) => value,
            Err(e) => return Box::pin(future::ready(Err(e))),
        };
    };
}

/// Generates the three handler implementations for one arity.
macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Fut, Out, $($ty,)*> ContextHandler<($($ty,)*)> for F
        where
            F: Fn(CommandContext, $($ty,)*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Out> + Send + 'static,
            Out: IntoCommandOutput + 'static,
            $( $ty: Send + 'static, )*
        {
            fn parameters() -> Vec<ParameterType> {
                vec![$(ParameterType::of::<$ty>()),*]
            }

            fn call(&self, ctx: CommandContext, args: HandlerArgs) -> BoxFuture<'static, CommandResult> {
                let mut args = args.into_iter();
                $( bind_arg!(args, $ty); )*
                let fut = (self)(ctx.clone(), $($ty,)*);
                Box::pin(async move { fut.await.into_output(&ctx).await })
            }
        }

        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<P, F, Fut, Out, $($ty,)*> MethodHandler<P, ($($ty,)*)> for F
        where
            P: Send + Sync + 'static,
            F: Fn(Arc<P>, CommandContext, $($ty,)*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Out> + Send + 'static,
            Out: IntoCommandOutput + 'static,
            $( $ty: Send + 'static, )*
        {
            fn parameters() -> Vec<ParameterType> {
                vec![$(ParameterType::of::<$ty>()),*]
            }

            fn call(
                &self,
                plugin: Arc<P>,
                ctx: CommandContext,
                args: HandlerArgs,
            ) -> BoxFuture<'static, CommandResult> {
                let mut args = args.into_iter();
                $( bind_arg!(args, $ty); )*
                let fut = (self)(plugin, ctx.clone(), $($ty,)*);
                Box::pin(async move { fut.await.into_output(&ctx).await })
            }
        }

        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Fut, Out, $($ty,)*> PlainHandler<($($ty,)*)> for F
        where
            F: Fn($($ty,)*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Out> + Send + 'static,
            Out: IntoCommandOutput + 'static,
            $( $ty: Send + 'static, )*
        {
            fn parameters() -> Vec<ParameterType> {
                vec![$(ParameterType::of::<$ty>()),*]
            }

            fn call(&self, ctx: CommandContext, args: HandlerArgs) -> BoxFuture<'static, CommandResult> {
                let mut args = args.into_iter();
                $( bind_arg!(args, $ty); )*
                let fut = (self)($($ty,)*);
                Box::pin(async move { fut.await.into_output(&ctx).await })
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;
    use crate::command::{CommandChain, CommandDeclaration};
    use crate::testing::guild_context;

    fn args(values: Vec<Box<dyn Any + Send>>) -> HandlerArgs {
        values
    }

    #[tokio::test]
    async fn test_context_handler_receives_typed_args() {
        let def = CommandChain::of(CommandDeclaration::new("add")).handler(
            |_ctx: CommandContext, a: i64, b: i64| async move { format!("{}", a + b) },
        );
        let meta = def.handler();
        assert!(meta.receives_context());
        assert_eq!(
            meta.parameters(),
            &[ParameterType::of::<i64>(), ParameterType::of::<i64>()]
        );

        let (ctx, gateway) = guild_context("!add 2 3");
        meta.call(ctx, args(vec![Box::new(2i64), Box::new(3i64)]))
            .await
            .unwrap();
        assert_eq!(gateway.sent_texts(), vec!["5"]);
    }

    #[tokio::test]
    async fn test_plain_handler() {
        let def = CommandChain::of(CommandDeclaration::new("ping"))
            .handler_without_context(|| async { Reply::text("Pong!") });
        assert!(!def.handler().receives_context());
        assert!(def.handler().parameters().is_empty());

        let (ctx, gateway) = guild_context("!ping");
        def.handler().call(ctx, Vec::new()).await.unwrap();
        assert_eq!(gateway.sent_texts(), vec!["Pong!"]);
    }

    #[tokio::test]
    async fn test_method_handler_binds_plugin() {
        struct Counter {
            total: AtomicI64,
        }

        impl Counter {
            async fn bump(self: Arc<Self>, _ctx: CommandContext, by: i64) -> CommandResult {
                self.total.fetch_add(by, Ordering::SeqCst);
                Ok(())
            }
        }

        let counter = Arc::new(Counter {
            total: AtomicI64::new(0),
        });
        let def = CommandChain::of(CommandDeclaration::new("bump"))
            .method(Arc::clone(&counter), Counter::bump);

        let (ctx, _) = guild_context("!bump 4");
        def.handler().call(ctx, args(vec![Box::new(4i64)])).await.unwrap();
        assert_eq!(counter.total.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_argument_type_mismatch_is_internal() {
        let def = CommandChain::of(CommandDeclaration::new("x"))
            .handler(|_ctx: CommandContext, _n: i64| async {});
        let (ctx, _) = guild_context("!x");
        let err = def
            .handler()
            .call(ctx, args(vec![Box::new("nope".to_string())]))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Internal(_)));
    }

    #[tokio::test]
    async fn test_rejected_result_propagates() {
        let def = CommandChain::of(CommandDeclaration::new("deny"))
            .handler(|_ctx: CommandContext| async { Err::<(), _>(CommandError::rejected("no")) });
        let (ctx, _) = guild_context("!deny");
        let err = def.handler().call(ctx, Vec::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "no");
    }
}
