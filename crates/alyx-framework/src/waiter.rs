//! Predicate-based, timeout-bounded waiting for follow-up events.
//!
//! A handler that needs a confirmation (a reaction, a reply) registers a
//! wait and gets back a [`WaitFor`] future. Every event the bot receives is
//! offered to [`EventWaiter::process`]; the first pending wait of the event's
//! type whose predicate accepts it is resolved with the mapped value and
//! removed. A wait that sees no match before its deadline resolves to `None`.
//!
//! ```text
//! wait_for ──► pending[TypeId::of::<E>()] ──┬─► process(event) matches ─► Some(mapper(event))
//!                                           ├─► deadline elapses ───────► None
//!                                           └─► shutdown cutoff ────────► None
//! ```
//!
//! Each wait resolves exactly once: whichever path removes it from the pending
//! set under the lock is the only one that can complete it.
//!
//! # Example
//!
//! ```rust,ignore
//! let answer = host
//!     .waiter()
//!     .wait_for(
//!         move |e: &ReactionEvent| e.message_id == question && e.user_id == author,
//!         |e: &ReactionEvent| e.emoji.clone(),
//!         Duration::from_secs(15),
//!     )?
//!     .await;
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace, warn};

use alyx_core::Event;

use crate::error::WaiterError;

type Predicate = Box<dyn Fn(&dyn Event) -> bool + Send + Sync>;
type Resolver = Box<dyn FnOnce(&dyn Event) + Send>;

struct PendingWait {
    id: u64,
    predicate: Predicate,
    resolve: Resolver,
    timer: CancellationToken,
}

/// Registry of pending waits, keyed by event type.
pub struct EventWaiter {
    pending: Mutex<HashMap<TypeId, Vec<PendingWait>>>,
    next_id: AtomicU64,
    accepting: AtomicBool,
    timers: TaskTracker,
}

impl Default for EventWaiter {
    fn default() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            accepting: AtomicBool::new(true),
            timers: TaskTracker::new(),
        }
    }
}

impl EventWaiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a wait for the next `E` accepted by `predicate`.
    ///
    /// Returns immediately. The returned future yields `Some(mapper(event))`
    /// or `None` once `timeout` elapses. Must be called inside a Tokio runtime.
    ///
    /// `predicate` runs while the waiter's lock is held and must not call back
    /// into the waiter.
    ///
    /// # Errors
    ///
    /// [`WaiterError::ShutDown`] once [`shutdown`](Self::shutdown) has begun.
    pub fn wait_for<E, R, P, M>(
        self: &Arc<Self>,
        predicate: P,
        mapper: M,
        timeout: Duration,
    ) -> Result<WaitFor<R>, WaiterError>
    where
        E: Event,
        R: Send + 'static,
        P: Fn(&E) -> bool + Send + Sync + 'static,
        M: FnOnce(&E) -> R + Send + 'static,
    {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(WaiterError::ShutDown);
        }

        let (tx, rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let type_id = TypeId::of::<E>();
        let timer = CancellationToken::new();

        let wait = PendingWait {
            id,
            predicate: Box::new(move |event: &dyn Event| {
                event.downcast_ref::<E>().is_some_and(|e| predicate(e))
            }),
            resolve: Box::new(move |event: &dyn Event| {
                if let Some(e) = event.downcast_ref::<E>() {
                    // The caller may have dropped the future; nothing to do then.
                    let _ = tx.send(mapper(e));
                }
            }),
            timer: timer.clone(),
        };
        self.pending.lock().entry(type_id).or_default().push(wait);
        trace!(wait = id, event = std::any::type_name::<E>(), ?timeout, "Wait registered");

        let waiter: Weak<Self> = Arc::downgrade(self);
        self.timers.spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    if let Some(waiter) = waiter.upgrade() {
                        waiter.expire(type_id, id);
                    }
                }
            }
        });

        Ok(WaitFor { rx })
    }

    /// Offers `event` to the pending waits of its type.
    ///
    /// Resolves at most one wait: the earliest registered whose predicate
    /// accepts the event. Returns whether one was resolved.
    pub fn process(&self, event: &dyn Event) -> bool {
        let type_id = <dyn Any>::type_id(event.as_any());
        let matched = {
            let mut pending = self.pending.lock();
            let Some(waits) = pending.get_mut(&type_id) else {
                return false;
            };
            let Some(pos) = waits.iter().position(|w| (w.predicate)(event)) else {
                return false;
            };
            let wait = waits.remove(pos);
            if waits.is_empty() {
                pending.remove(&type_id);
            }
            wait
        };

        matched.timer.cancel();
        trace!(wait = matched.id, event = event.event_name(), "Wait resolved");
        (matched.resolve)(event);
        true
    }

    /// Number of unresolved waits across all event types.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().values().map(Vec::len).sum()
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Stops accepting new waits and gives pending ones up to `timeout` to
    /// resolve or expire.
    ///
    /// Returns `true` if everything drained in time. Otherwise the remaining
    /// waits are resolved to `None` and `false` is returned.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.accepting.store(false, Ordering::Release);
        self.timers.close();

        let drained = tokio::time::timeout(timeout, self.timers.wait()).await.is_ok();
        if drained {
            debug!("Event waiter drained");
            return true;
        }

        let leftover: Vec<PendingWait> = self.pending.lock().drain().flat_map(|(_, w)| w).collect();
        warn!(pending = leftover.len(), ?timeout, "Event waiter did not drain in time, cancelling waits");
        for wait in leftover {
            wait.timer.cancel();
        }
        false
    }

    fn expire(&self, type_id: TypeId, id: u64) {
        let mut pending = self.pending.lock();
        if let Some(waits) = pending.get_mut(&type_id) {
            if let Some(pos) = waits.iter().position(|w| w.id == id) {
                // Dropping the resolver drops the sender, so the future yields None.
                waits.remove(pos);
                trace!(wait = id, "Wait timed out");
            }
            if waits.is_empty() {
                pending.remove(&type_id);
            }
        }
    }
}

impl std::fmt::Debug for EventWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventWaiter")
            .field("pending", &self.pending_count())
            .field("accepting", &self.is_accepting())
            .finish()
    }
}

// ─── WaitFor ──────────────────────────────────────────────────────────────────

/// Future returned by [`EventWaiter::wait_for`].
///
/// Yields `Some(value)` when a matching event arrived, `None` on timeout or
/// shutdown.
#[must_use = "a wait does nothing unless awaited"]
#[derive(Debug)]
pub struct WaitFor<R> {
    rx: oneshot::Receiver<R>,
}

impl<R> Future for WaitFor<R> {
    type Output = Option<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}

#[cfg(test)]
mod tests {
    use alyx_core::{ChannelId, MessageEvent, MessageId, ReactionEvent, User, UserId};
    use tokio_test::{assert_pending, assert_ready_eq, task};

    use super::*;

    fn message(author: u64, content: &str) -> MessageEvent {
        MessageEvent {
            message_id: MessageId(100),
            channel_id: ChannelId(10),
            guild_id: None,
            author: User::new(author, "user"),
            content: content.to_string(),
        }
    }

    fn reaction(user: u64, emoji: &str) -> ReactionEvent {
        ReactionEvent {
            message_id: MessageId(100),
            channel_id: ChannelId(10),
            guild_id: None,
            user_id: UserId(user),
            emoji: emoji.to_string(),
        }
    }

    fn wait_for_author(waiter: &Arc<EventWaiter>, author: u64, secs: u64) -> WaitFor<String> {
        waiter
            .wait_for(
                move |e: &MessageEvent| e.author.id == UserId(author),
                |e: &MessageEvent| e.content.clone(),
                Duration::from_secs(secs),
            )
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_event_resolves_one_wait() {
        let waiter = Arc::new(EventWaiter::new());
        let first = wait_for_author(&waiter, 1, 5);
        let second = wait_for_author(&waiter, 2, 5);
        assert_eq!(waiter.pending_count(), 2);

        assert!(waiter.process(&message(1, "yes")));
        assert_eq!(waiter.pending_count(), 1);
        assert_eq!(first.await, Some("yes".to_string()));

        // The other wait times out and leaves the pending set.
        assert_eq!(second.await, None);
        assert_eq!(waiter.pending_count(), 0);

        // A late match has nothing left to resolve.
        assert!(!waiter.process(&message(2, "late")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_earliest_matching_wait_wins() {
        let waiter = Arc::new(EventWaiter::new());
        let mut first = task::spawn(wait_for_author(&waiter, 1, 5));
        let mut second = task::spawn(wait_for_author(&waiter, 1, 5));

        assert!(waiter.process(&message(1, "a")));
        assert_ready_eq!(first.poll(), Some("a".to_string()));
        assert_pending!(second.poll());

        assert!(waiter.process(&message(1, "b")));
        assert_ready_eq!(second.poll(), Some("b".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_event_types_are_ignored() {
        let waiter = Arc::new(EventWaiter::new());
        let mut wait = task::spawn(
            waiter
                .wait_for(
                    |e: &ReactionEvent| e.user_id == UserId(1),
                    |e: &ReactionEvent| e.emoji == "✅",
                    Duration::from_secs(5),
                )
                .unwrap(),
        );

        assert!(!waiter.process(&message(1, "✅")));
        assert!(!waiter.process(&reaction(2, "✅")));
        assert_pending!(wait.poll());

        assert!(waiter.process(&reaction(1, "❌")));
        assert_ready_eq!(wait.poll(), Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_wait_still_expires() {
        let waiter = Arc::new(EventWaiter::new());
        drop(wait_for_author(&waiter, 1, 1));
        assert_eq!(waiter.pending_count(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(waiter.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drains_within_bound() {
        let waiter = Arc::new(EventWaiter::new());
        let wait = wait_for_author(&waiter, 1, 5);

        assert!(waiter.shutdown(Duration::from_secs(60)).await);
        assert_eq!(wait.await, None);
        assert!(matches!(
            waiter.wait_for(|_: &MessageEvent| true, |_: &MessageEvent| (), Duration::from_secs(1)),
            Err(WaiterError::ShutDown)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cuts_off_long_waits() {
        let waiter = Arc::new(EventWaiter::new());
        let wait = wait_for_author(&waiter, 1, 600);

        assert!(!waiter.shutdown(Duration::from_secs(60)).await);
        assert_eq!(waiter.pending_count(), 0);
        assert_eq!(wait.await, None);
    }

    #[tokio::test]
    async fn test_shutdown_with_nothing_pending() {
        let waiter = Arc::new(EventWaiter::new());
        assert!(waiter.shutdown(Duration::from_millis(10)).await);
    }
}
