//! Interactive prompts built on the [`EventWaiter`](crate::waiter::EventWaiter).

use std::time::Duration;

use tracing::debug;

use alyx_core::{MessageEvent, ReactionEvent, Reply};

use crate::context::CommandContext;
use crate::error::CommandResult;
use crate::waiter::WaitFor;

/// Asks the invoking user a yes/no question.
///
/// If the bot can add reactions in the channel, the question gets ✅ and ❌
/// reactions and the answer is the invoking user's reaction on it. Otherwise
/// `(y/n)` is appended and the answer is the user's next `y` or `n` message
/// in the channel.
///
/// The returned future yields `None` on timeout. Event delivery is
/// sequential, so a handler must not await it inline; spawn a task instead:
///
/// ```rust,ignore
/// let answer = yes_or_no(&ctx, "Confirm shutdown", Duration::from_secs(15)).await?;
/// tokio::spawn(async move {
///     if answer.await == Some(true) {
///         ctx.host().request_shutdown();
///     }
/// });
/// ```
pub async fn yes_or_no(
    ctx: &CommandContext,
    question: impl Into<String>,
    timeout: Duration,
) -> CommandResult<WaitFor<bool>> {
    let question = question.into();
    let channel = ctx.channel_id();
    let author = ctx.author().id;
    let waiter = ctx.host().waiter();

    let can_react = !ctx.is_guild() || ctx.gateway().can_react(channel).await;
    if can_react {
        let prompt = ctx.reply(Reply::question(question)).await?;
        let answer = waiter.wait_for(
            move |e: &ReactionEvent| {
                e.message_id == prompt
                    && e.user_id == author
                    && (e.emoji == Reply::SUCCESS_EMOJI || e.emoji == Reply::ERROR_EMOJI)
            },
            |e: &ReactionEvent| e.emoji == Reply::SUCCESS_EMOJI,
            timeout,
        )?;
        for emoji in [Reply::SUCCESS_EMOJI, Reply::ERROR_EMOJI] {
            ctx.gateway().add_reaction(channel, prompt, emoji).await?;
        }
        debug!(user = %author, message = %prompt, "Awaiting yes/no reaction");
        Ok(answer)
    } else {
        ctx.reply(Reply::question(format!("{question}\n\n(y/n)"))).await?;
        let answer = waiter.wait_for(
            move |e: &MessageEvent| {
                e.channel_id == channel
                    && e.author.id == author
                    && matches!(e.content.trim().to_lowercase().as_str(), "y" | "n")
            },
            |e: &MessageEvent| e.content.trim().eq_ignore_ascii_case("y"),
            timeout,
        )?;
        debug!(user = %author, "Awaiting yes/no message");
        Ok(answer)
    }
}
