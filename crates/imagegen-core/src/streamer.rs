//! Log Streamer: pulls backend log lines into the Logger.
//!
//! Runs for the whole session regardless of readiness or generation state.
//! A failed fetch is not shown to the user (it would flood the panel); the
//! next attempt just waits longer.

use std::time::Duration;

use imagegen_proto::protocol::LogEntry;
use tracing::trace;

use crate::error::BackendError;
use crate::logger::Logger;

pub struct LogStreamer {
    interval: Duration,
    backoff: Duration,
    failures: u64,
}

impl LogStreamer {
    pub fn new(interval: Duration, backoff: Duration) -> Self {
        Self {
            interval,
            backoff,
            failures: 0,
        }
    }

    /// Consecutive failed fetches so far.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Handle one fetch and return the delay before the next one.
    pub fn on_fetch(
        &mut self,
        outcome: Result<Option<LogEntry>, BackendError>,
        log: &mut Logger,
    ) -> Duration {
        match outcome {
            Ok(entry) => {
                self.failures = 0;
                if let Some(entry) = entry.filter(|e| !e.is_empty()) {
                    log.append(entry.message, entry.severity);
                }
                self.interval
            }
            Err(e) => {
                self.failures += 1;
                trace!("install log fetch failed ({}x): {}", self.failures, e);
                self.backoff
            }
        }
    }
}
