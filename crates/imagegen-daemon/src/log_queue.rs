//! Install log queue: the lines the client's log streamer pulls one by one.
//!
//! Bounded at [`LOG_QUEUE_CAPACITY`]; when full the oldest line is dropped so
//! a client that stopped polling never blocks the producers.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use imagegen_proto::protocol::{LogEntry, Severity};
use tokio::sync::Notify;

pub const LOG_QUEUE_CAPACITY: usize = 100;

/// How long a fetch waits for a line before answering with an empty entry.
pub const FETCH_WAIT: Duration = Duration::from_millis(100);

pub struct LogQueue {
    entries: Mutex<VecDeque<LogEntry>>,
    notify: Notify,
}

impl LogQueue {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(LOG_QUEUE_CAPACITY)),
            notify: Notify::new(),
        }
    }

    /// Never blocks; usable from a tracing layer.
    pub fn push(&self, message: impl Into<String>, severity: Severity) {
        // A poisoned lock only means a pusher panicked mid-push; the deque
        // itself is still consistent.
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() >= LOG_QUEUE_CAPACITY {
            entries.pop_front();
        }
        entries.push_back(LogEntry::new(message, severity));
        drop(entries);
        self.notify.notify_one();
    }

    pub fn try_pop(&self) -> Option<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }

    /// Next line, waiting up to `wait` for one to arrive.  Returns an empty
    /// entry when nothing showed up.
    pub async fn next(&self, wait: Duration) -> LogEntry {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let notified = self.notify.notified();
            if let Some(entry) = self.try_pop() {
                return entry;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.try_pop().unwrap_or_default();
            }
        }
    }
}

impl Default for LogQueue {
    fn default() -> Self {
        Self::new()
    }
}
