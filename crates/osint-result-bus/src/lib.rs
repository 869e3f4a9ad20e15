//! Result Bus: one queue per task, producers (workers) push, consumers
//! (client `StreamResults` subscribers) drain.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use osint_protocol::ResultEnvelope;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;

/// Bounded result queue for a single task. Entries older than `CAPACITY`
/// are dropped from the front so one stalled subscriber and a chatty
/// worker can't grow the queue without bound; each entry carries a
/// monotonic sequence number so subscribers can resume precisely where
/// they left off instead of re-reading or skipping entries as the window
/// slides.
struct TaskQueue {
    entries: Mutex<VecDeque<(u64, ResultEnvelope)>>,
    next_seq: AtomicU64,
    dropped: AtomicU64,
    closed: AtomicBool,
    notify: Notify,
}

impl TaskQueue {
    /// Maximum envelopes retained per task before the oldest is dropped.
    const CAPACITY: usize = 1024;

    fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            next_seq: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    fn push(&self, envelope: ResultEnvelope) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        {
            let mut entries = self.entries.lock();
            if entries.len() >= Self::CAPACITY {
                entries.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            entries.push_back((seq, envelope));
        }
        self.notify.notify_waiters();
    }

    fn since(&self, last_seq: u64) -> Vec<(u64, ResultEnvelope)> {
        self.entries
            .lock()
            .iter()
            .filter(|(seq, _)| *seq > last_seq)
            .cloned()
            .collect()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
        self.notify.notify_waiters();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Outcome of one bounded wait on a task's queue.
pub enum QueueState {
    /// New envelopes arrived; `last_seq` should be passed back into the
    /// next `drain_once` call to resume from here.
    Items { envelopes: Vec<ResultEnvelope>, last_seq: u64 },
    /// No new envelopes arrived within the wait window; the caller should
    /// check whether the owning task reached a terminal state and, if not,
    /// call `drain_once` again.
    TimedOut,
    /// The task reached a terminal state and every buffered envelope has
    /// already been delivered to this subscriber.
    Closed,
}

/// Process-wide map of per-task result queues.
#[derive(Default)]
pub struct ResultBus {
    queues: RwLock<HashMap<String, Arc<TaskQueue>>>,
}

impl ResultBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue_for(&self, task_id: &str) -> Arc<TaskQueue> {
        if let Some(queue) = self.queues.read().get(task_id) {
            return queue.clone();
        }
        self.queues
            .write()
            .entry(task_id.to_string())
            .or_insert_with(|| Arc::new(TaskQueue::new()))
            .clone()
    }

    /// Pushes a result envelope for `task_id`, creating its queue on first
    /// use. If the queue was already over capacity the oldest entry is
    /// dropped to make room. Returns `true` when this particular push
    /// caused a drop, so callers (`SubmitTaskResult`) can surface it back
    /// to the worker without needing the queue's running total.
    pub fn push(&self, task_id: &str, envelope: ResultEnvelope) -> bool {
        let queue = self.queue_for(task_id);
        let dropped_before = queue.dropped_count();
        queue.push(envelope);
        let caused_drop = queue.dropped_count() > dropped_before;
        if caused_drop {
            tracing::warn!(task_id, "result bus queue full, oldest entry dropped");
        }
        caused_drop
    }

    /// Running count of entries dropped from `task_id`'s queue over its
    /// lifetime (0 if the queue doesn't exist yet).
    pub fn dropped_count(&self, task_id: &str) -> u64 {
        self.queues
            .read()
            .get(task_id)
            .map(|q| q.dropped_count())
            .unwrap_or(0)
    }

    /// Marks `task_id`'s queue closed and wakes every subscriber so their
    /// next `drain_once` call sees `QueueState::Closed` once the backlog is
    /// drained. Called by the Expiry Sweeper when a task becomes terminal.
    /// Uses `queue_for` (create-if-missing) rather than a read-only lookup:
    /// a task can go terminal before any worker ever pushes a result (e.g.
    /// `CancelTask` before `SubmitTaskResult`), and the closed flag must
    /// stick even if `drain_once` hasn't been called yet to create it.
    pub fn close(&self, task_id: &str) {
        self.queue_for(task_id).close();
    }

    /// Waits up to one second for new envelopes after `last_seq`. Returns
    /// immediately if entries are already waiting. This bound lets a
    /// subscriber re-check terminal state even without a fresh push.
    pub async fn drain_once(&self, task_id: &str, last_seq: u64) -> QueueState {
        let queue = self.queue_for(task_id);

        let fresh = queue.since(last_seq);
        if !fresh.is_empty() {
            let new_last_seq = fresh.last().map(|(seq, _)| *seq).unwrap_or(last_seq);
            return QueueState::Items {
                envelopes: fresh.into_iter().map(|(_, e)| e).collect(),
                last_seq: new_last_seq,
            };
        }

        if queue.is_closed() {
            return QueueState::Closed;
        }

        let notified = queue.notify.notified();
        tokio::select! {
            _ = notified => {},
            _ = tokio::time::sleep(Duration::from_secs(1)) => {},
        }

        let fresh = queue.since(last_seq);
        if !fresh.is_empty() {
            let new_last_seq = fresh.last().map(|(seq, _)| *seq).unwrap_or(last_seq);
            return QueueState::Items {
                envelopes: fresh.into_iter().map(|(_, e)| e).collect(),
                last_seq: new_last_seq,
            };
        }
        if queue.is_closed() {
            return QueueState::Closed;
        }
        QueueState::TimedOut
    }

    /// Drops a task's queue entirely. Intended for test cleanup and for
    /// the sweeper to bound memory once every subscriber has disconnected.
    pub fn remove(&self, task_id: &str) {
        self.queues.write().remove(task_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn envelope(task_id: &str, n: u64) -> ResultEnvelope {
        ResultEnvelope {
            task_id: task_id.to_string(),
            result: json!({ "n": n }),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn drain_once_returns_pushed_items_in_order() {
        let bus = ResultBus::new();
        bus.push("t1", envelope("t1", 1));
        bus.push("t1", envelope("t1", 2));

        match bus.drain_once("t1", 0).await {
            QueueState::Items { envelopes, last_seq } => {
                assert_eq!(envelopes.len(), 2);
                assert_eq!(envelopes[0].result, json!({ "n": 1 }));
                assert_eq!(envelopes[1].result, json!({ "n": 2 }));
                assert_eq!(last_seq, 1);
            }
            _ => panic!("expected items"),
        }
    }

    #[tokio::test]
    async fn two_subscribers_each_see_every_push() {
        let bus = ResultBus::new();
        bus.push("t1", envelope("t1", 1));

        let a = bus.drain_once("t1", 0).await;
        let b = bus.drain_once("t1", 0).await;
        assert!(matches!(a, QueueState::Items { .. }));
        assert!(matches!(b, QueueState::Items { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn drain_once_times_out_without_new_pushes() {
        let bus = ResultBus::new();
        bus.push("t1", envelope("t1", 1));
        let first = bus.drain_once("t1", 0).await;
        let last_seq = match first {
            QueueState::Items { last_seq, .. } => last_seq,
            _ => panic!("expected items"),
        };

        let wait = bus.drain_once("t1", last_seq);
        tokio::pin!(wait);
        tokio::time::advance(Duration::from_secs(2)).await;
        let result = wait.await;
        assert!(matches!(result, QueueState::TimedOut));
    }

    #[tokio::test]
    async fn closing_delivers_backlog_then_reports_closed() {
        let bus = ResultBus::new();
        bus.push("t1", envelope("t1", 1));
        bus.close("t1");

        let first = bus.drain_once("t1", 0).await;
        let last_seq = match first {
            QueueState::Items { last_seq, .. } => last_seq,
            _ => panic!("expected the backlog before closed"),
        };

        let second = bus.drain_once("t1", last_seq).await;
        assert!(matches!(second, QueueState::Closed));
    }

    #[tokio::test]
    async fn close_before_any_push_or_drain_still_sticks() {
        let bus = ResultBus::new();
        bus.close("t1");

        let result = bus.drain_once("t1", 0).await;
        assert!(matches!(result, QueueState::Closed));
    }

    #[tokio::test]
    async fn push_beyond_capacity_drops_oldest() {
        let bus = ResultBus::new();
        for n in 0..(TaskQueue::CAPACITY as u64 + 5) {
            bus.push("t1", envelope("t1", n));
        }

        match bus.drain_once("t1", 0).await {
            QueueState::Items { envelopes, .. } => {
                assert_eq!(envelopes.len(), TaskQueue::CAPACITY);
                assert_eq!(envelopes[0].result, json!({ "n": 5 }));
            }
            _ => panic!("expected items"),
        }
    }
}
