//! Work queue with completion tracking
//!
//! A bounded FIFO of [`FetchRequest`] shared between the dispatcher and the
//! fetch workers. Beyond the channel itself it tracks drain state: an item
//! is outstanding from `enqueue` until a worker calls `mark_done` for it,
//! and [`WorkQueue::wait_until_drained`] resolves only when no item is
//! outstanding. Dequeue has a mandatory timeout so idle workers regain
//! control to observe the shutdown flag.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{watch, Mutex, Notify};
use tracing::trace;

use crate::constants::workers;

use super::models::FetchRequest;

/// Snapshot of queue counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    /// Items accepted by `enqueue` so far
    pub total_enqueued: u64,
    /// Items enqueued but not yet marked done
    pub outstanding: u64,
    /// Items currently buffered and ready to dequeue
    pub queued: usize,
}

/// Thread-safe bounded FIFO of fetch requests with drain detection
#[derive(Debug)]
pub struct WorkQueue {
    items: Mutex<VecDeque<FetchRequest>>,
    capacity: usize,
    /// Signalled when an item becomes available
    item_ready: Notify,
    /// Signalled when buffer space frees up
    space_ready: Notify,
    /// Count of enqueued items without a matching `mark_done`
    outstanding: watch::Sender<u64>,
    total_enqueued: AtomicU64,
}

impl WorkQueue {
    /// Create a queue with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(workers::QUEUE_CAPACITY)
    }

    /// Create a queue with a custom capacity (must be at least 1)
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be at least 1");
        Self {
            items: Mutex::new(VecDeque::new()),
            capacity,
            item_ready: Notify::new(),
            space_ready: Notify::new(),
            outstanding: watch::channel(0).0,
            total_enqueued: AtomicU64::new(0),
        }
    }

    /// Insert a request at the back of the queue.
    ///
    /// Waits for buffer space when the queue is full; this is the
    /// backpressure path and completes as long as consumers keep dequeuing.
    pub async fn enqueue(&self, request: FetchRequest) {
        loop {
            {
                let mut items = self.items.lock().await;
                if items.len() < self.capacity {
                    trace!("Enqueued tile {}", request.coordinate);
                    items.push_back(request);
                    drop(items);
                    self.outstanding.send_modify(|n| *n += 1);
                    self.total_enqueued.fetch_add(1, Ordering::Relaxed);
                    self.item_ready.notify_one();
                    return;
                }
            }
            self.space_ready.notified().await;
        }
    }

    /// Remove and return the oldest request, waiting up to `timeout`.
    ///
    /// Returns `None` if no item became available in time. The bounded wait
    /// is what lets an idle worker periodically re-check the shutdown flag.
    pub async fn dequeue(&self, timeout: Duration) -> Option<FetchRequest> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let mut items = self.items.lock().await;
                if let Some(request) = items.pop_front() {
                    drop(items);
                    self.space_ready.notify_one();
                    return Some(request);
                }
            }
            if tokio::time::timeout_at(deadline, self.item_ready.notified())
                .await
                .is_err()
            {
                return None;
            }
        }
    }

    /// Record completion of one dequeued item (success, failure, or skip)
    pub fn mark_done(&self) {
        self.outstanding.send_modify(|n| {
            debug_assert!(*n > 0, "mark_done without matching enqueue");
            *n = n.saturating_sub(1);
        });
    }

    /// Wait until every enqueued item has been matched by a `mark_done`.
    ///
    /// Resolves immediately when nothing was enqueued. Called by the
    /// dispatcher after the source is exhausted.
    pub async fn wait_until_drained(&self) {
        let mut rx = self.outstanding.subscribe();
        // The sender lives in self, so wait_for cannot fail
        let _ = rx.wait_for(|outstanding| *outstanding == 0).await;
    }

    /// Whether any item is currently buffered
    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Current counters
    pub async fn stats(&self) -> QueueStats {
        // Copy out of the watch ref before awaiting; holding it across the
        // lock await would make this future non-Send
        let outstanding = *self.outstanding.borrow();
        QueueStats {
            total_enqueued: self.total_enqueued.load(Ordering::Relaxed),
            outstanding,
            queued: self.items.lock().await.len(),
        }
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}
