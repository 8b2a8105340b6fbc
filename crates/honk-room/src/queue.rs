//! Pull-based event queues for subscription consumers.
//!
//! A broadcast pushes into an [`EventQueue`] without waiting; the consumer
//! pulls events one at a time with [`EventQueue::next`]. The room keeps one
//! clone of the queue to push into, and the consumer holds the other
//! inside a [`Subscription`].

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::Stream;
use futures_util::stream;
use honk_protocol::{Account, RoomEvent};
use tokio::sync::Notify;

static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(1);

type TeardownHook = Box<dyn FnOnce(u64) + Send>;

struct Inner {
    backlog: VecDeque<RoomEvent>,
    terminated: bool,
    on_terminate: Option<TeardownHook>,
}

struct Shared {
    id: u64,
    inner: Mutex<Inner>,
    notify: Notify,
}

/// Unbounded FIFO of room events with a one-shot teardown hook.
///
/// Cloning gives another handle to the same queue. After
/// [`terminate`](Self::terminate), pushes are dropped and `next` yields
/// `None` forever.
#[derive(Clone)]
pub struct EventQueue {
    shared: Arc<Shared>,
}

impl EventQueue {
    /// Creates a queue with no teardown hook.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a queue that runs `hook` the first time it is terminated.
    /// The hook receives the queue's [`id`](Self::id).
    pub fn with_teardown(hook: impl FnOnce(u64) + Send + 'static) -> Self {
        Self::build(Some(Box::new(hook)))
    }

    fn build(on_terminate: Option<TeardownHook>) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed),
                inner: Mutex::new(Inner {
                    backlog: VecDeque::new(),
                    terminated: false,
                    on_terminate,
                }),
                notify: Notify::new(),
            }),
        }
    }

    /// Process-unique id, shared by every clone of this queue.
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    // A panic while holding the lock leaves the queue data intact, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an event and wakes the consumer.
    ///
    /// Returns `false` (and drops the event) if the queue is terminated.
    pub fn push(&self, event: RoomEvent) -> bool {
        {
            let mut inner = self.lock();
            if inner.terminated {
                return false;
            }
            inner.backlog.push_back(event);
        }
        self.shared.notify.notify_one();
        true
    }

    /// Waits for the oldest unread event.
    ///
    /// Returns `None` once the queue is terminated; any backlog is
    /// discarded at that point.
    pub async fn next(&self) -> Option<RoomEvent> {
        loop {
            // Register interest before checking state so a terminate
            // between the check and the await is not missed.
            let notified = self.shared.notify.notified();
            {
                let mut inner = self.lock();
                if let Some(event) = inner.backlog.pop_front() {
                    return Some(event);
                }
                if inner.terminated {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Closes the queue, clears the backlog and runs the teardown hook.
    ///
    /// Idempotent: the hook runs exactly once however many times (or from
    /// however many tasks) this is called.
    pub fn terminate(&self) {
        let hook = {
            let mut inner = self.lock();
            if inner.terminated {
                return;
            }
            inner.terminated = true;
            inner.backlog.clear();
            inner.on_terminate.take()
        };
        if let Some(hook) = hook {
            hook(self.shared.id);
        }
        self.shared.notify.notify_waiters();
    }

    /// Returns `true` once [`terminate`](Self::terminate) has run.
    pub fn is_terminated(&self) -> bool {
        self.lock().terminated
    }

    /// Number of events waiting to be read.
    pub fn len(&self) -> usize {
        self.lock().backlog.len()
    }

    /// Returns `true` if no events are waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("EventQueue")
            .field("id", &self.shared.id)
            .field("backlog", &inner.backlog.len())
            .field("terminated", &inner.terminated)
            .finish()
    }
}

/// A consumer's end of a room subscription.
///
/// Dropping it terminates the queue, which tells the room the subscriber
/// is gone. The room then runs `leave` for the account exactly once.
#[derive(Debug)]
pub struct Subscription {
    account: Account,
    queue: EventQueue,
}

impl Subscription {
    pub(crate) fn new(account: Account, queue: EventQueue) -> Self {
        Self { account, queue }
    }

    /// The account this subscription listens as.
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Waits for the next room event. `None` means the room ended the
    /// subscription (leave, shutdown or replacement).
    pub async fn next(&mut self) -> Option<RoomEvent> {
        self.queue.next().await
    }

    /// Ends the subscription now.
    pub fn close(self) {
        drop(self);
    }

    /// Turns the subscription into a `Stream`. Dropping the stream ends
    /// the subscription.
    pub fn into_stream(self) -> impl Stream<Item = RoomEvent> + Send + 'static {
        stream::unfold(self, |mut sub| async move {
            let event = sub.next().await?;
            Some((event, sub))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.queue.terminate();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;
    use futures_util::StreamExt;
    use honk_protocol::AccountId;

    fn sound(name: &str) -> RoomEvent {
        RoomEvent::Sound {
            name: name.into(),
            from: "amy".into(),
        }
    }

    fn counting_queue() -> (EventQueue, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let queue = EventQueue::with_teardown(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (queue, calls)
    }

    #[tokio::test]
    async fn test_next_returns_backlog_in_fifo_order() {
        let queue = EventQueue::new();
        queue.push(sound("quack"));
        queue.push(sound("honk"));

        assert_eq!(queue.next().await, Some(sound("quack")));
        assert_eq!(queue.next().await, Some(sound("honk")));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_next_waits_for_push() {
        let queue = EventQueue::new();
        let consumer = queue.clone();
        let reader = tokio::spawn(async move { consumer.next().await });

        tokio::task::yield_now().await;
        queue.push(sound("quack"));

        assert_eq!(reader.await.unwrap(), Some(sound("quack")));
    }

    #[test]
    fn test_push_after_terminate_is_dropped() {
        let queue = EventQueue::new();
        queue.terminate();

        assert!(!queue.push(sound("quack")));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_terminate_clears_backlog() {
        let queue = EventQueue::new();
        queue.push(sound("quack"));
        queue.terminate();

        assert_eq!(queue.next().await, None);
    }

    #[tokio::test]
    async fn test_terminate_resolves_pending_next_with_none() {
        let queue = EventQueue::new();
        let consumer = queue.clone();
        let reader = tokio::spawn(async move { consumer.next().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.terminate();

        assert_eq!(reader.await.unwrap(), None);
    }

    #[test]
    fn test_terminate_twice_runs_hook_once() {
        let (queue, calls) = counting_queue();
        queue.terminate();
        queue.terminate();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(queue.is_terminated());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_terminate_concurrently_runs_hook_once() {
        for _ in 0..50 {
            let (queue, calls) = counting_queue();
            let a = queue.clone();
            let b = queue.clone();
            let t1 = tokio::spawn(async move { a.terminate() });
            let t2 = tokio::spawn(async move { b.terminate() });
            t1.await.unwrap();
            t2.await.unwrap();

            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_clones_share_id() {
        let queue = EventQueue::new();
        assert_eq!(queue.id(), queue.clone().id());
        assert_ne!(queue.id(), EventQueue::new().id());
    }

    #[test]
    fn test_subscription_drop_terminates_queue() {
        let (queue, calls) = counting_queue();
        let account = Account {
            id: AccountId::new("a1"),
            name: "amy".into(),
        };
        let sub = Subscription::new(account, queue.clone());
        sub.close();

        assert!(queue.is_terminated());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subscription_stream_ends_on_terminate() {
        let queue = EventQueue::new();
        let account = Account {
            id: AccountId::new("a1"),
            name: "amy".into(),
        };
        let mut stream =
            Box::pin(Subscription::new(account, queue.clone()).into_stream());

        queue.push(sound("quack"));
        assert_eq!(stream.next().await, Some(sound("quack")));

        queue.terminate();
        assert_eq!(stream.next().await, None);
    }
}
