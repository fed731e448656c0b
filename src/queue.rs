//! Thread-safe FIFO handoff between the dispatch loop and the interface.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::mapping::InternalMessage;

/// What travels through a [`MessageQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueItem {
    Message(InternalMessage),
    /// Termination sentinel telling a blocking consumer to exit.
    Shutdown,
}

/// Unbounded FIFO of internal messages, safe for concurrent push and pull.
///
/// Clones share the same underlying queue. Insertion order is preserved and
/// is the only ordering guarantee. Producers never block beyond the lock;
/// consumers choose between [`try_pull`](Self::try_pull) and the blocking
/// [`pull`](Self::pull).
#[derive(Debug, Clone, Default)]
pub struct MessageQueue {
    inner: Arc<QueueInner>,
}

#[derive(Debug, Default)]
struct QueueInner {
    items: Mutex<VecDeque<QueueItem>>,
    ready: Condvar,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item at the end of the queue and wakes one waiting puller.
    pub fn push(&self, item: QueueItem) {
        self.lock_items().push_back(item);
        self.inner.ready.notify_one();
    }

    /// Convenience for pushing a message.
    pub fn push_message(&self, msg: InternalMessage) {
        self.push(QueueItem::Message(msg));
    }

    /// Removes and returns the first item, or `None` when the queue is empty.
    /// Never blocks beyond the lock.
    pub fn try_pull(&self) -> Option<QueueItem> {
        self.lock_items().pop_front()
    }

    /// Removes and returns the first item, waiting for one to arrive.
    ///
    /// With a timeout, returns `None` once the timeout elapses with the queue
    /// still empty. Without one, waits indefinitely.
    pub fn pull(&self, timeout: Option<Duration>) -> Option<QueueItem> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut items = self.lock_items();
        loop {
            if let Some(item) = items.pop_front() {
                return Some(item);
            }
            items = match deadline {
                None => self
                    .inner
                    .ready
                    .wait(items)
                    .unwrap_or_else(|err| err.into_inner()),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    self.inner
                        .ready
                        .wait_timeout(items, deadline - now)
                        .unwrap_or_else(|err| err.into_inner())
                        .0
                }
            };
        }
    }

    pub fn len(&self) -> usize {
        self.lock_items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_items().is_empty()
    }

    fn lock_items(&self) -> MutexGuard<'_, VecDeque<QueueItem>> {
        // A poisoned lock only means another thread panicked mid-operation,
        // the queue content itself is still coherent.
        self.inner
            .items
            .lock()
            .unwrap_or_else(|err| err.into_inner())
    }
}
