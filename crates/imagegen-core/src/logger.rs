//! Logger: bounded, append-only log buffer shown in the log panel.
//!
//! Holds at most [`LOG_CAPACITY`] lines; appending past the cap evicts the
//! oldest line first.  Every append bumps `revision`, which presenters use to
//! auto-scroll to the newest entry.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use imagegen_proto::protocol::Severity;

pub const LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub at: DateTime<Local>,
    pub message: String,
    pub severity: Severity,
}

impl LogLine {
    /// `[HH:MM:SS] message`, the form shown in the panel.
    pub fn display(&self) -> String {
        format!("[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

#[derive(Debug, Clone)]
pub struct Logger {
    lines: VecDeque<LogLine>,
    visible: bool,
    revision: u64,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            lines: VecDeque::with_capacity(LOG_CAPACITY),
            visible: true,
            revision: 0,
        }
    }

    pub fn append(&mut self, message: impl Into<String>, severity: Severity) {
        self.lines.push_back(LogLine {
            at: Local::now(),
            message: message.into(),
            severity,
        });
        while self.lines.len() > LOG_CAPACITY {
            self.lines.pop_front();
        }
        self.revision += 1;
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.append(message, Severity::Info);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.append(message, Severity::Warning);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.append(message, Severity::Error);
    }

    pub fn clear(&mut self) {
        self.lines = VecDeque::with_capacity(LOG_CAPACITY);
        self.revision += 1;
    }

    /// Expand or collapse the log content.  Never touches the buffer.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn toggle_visible(&mut self) {
        self.visible = !self.visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn lines(&self) -> impl DoubleEndedIterator<Item = &LogLine> + ExactSizeIterator {
        self.lines.iter()
    }

    pub fn last(&self) -> Option<&LogLine> {
        self.lines.back()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.lines.iter().filter(|l| l.severity == severity).count()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_evicts_oldest() {
        let mut log = Logger::new();
        for i in 0..=LOG_CAPACITY {
            log.info(format!("line {}", i));
        }
        assert_eq!(log.len(), LOG_CAPACITY);
        let first = log.lines().next().unwrap();
        assert_eq!(first.message, "line 1");
        assert_eq!(log.last().unwrap().message, format!("line {}", LOG_CAPACITY));

        let messages: Vec<_> = log.lines().map(|l| l.message.clone()).collect();
        let expected: Vec<_> = (1..=LOG_CAPACITY).map(|i| format!("line {}", i)).collect();
        assert_eq!(messages, expected);
    }

    #[test]
    fn test_clear_keeps_visibility() {
        let mut log = Logger::new();
        log.set_visible(false);
        log.warning("careful");
        log.clear();
        assert!(log.is_empty());
        assert!(!log.is_visible());
    }

    #[test]
    fn test_visibility_leaves_buffer_alone() {
        let mut log = Logger::new();
        log.error("boom");
        log.toggle_visible();
        assert!(!log.is_visible());
        log.toggle_visible();
        assert!(log.is_visible());
        assert_eq!(log.count(Severity::Error), 1);
    }

    #[test]
    fn test_revision_bumps_on_append() {
        let mut log = Logger::new();
        let before = log.revision();
        log.info("a");
        log.info("b");
        assert_eq!(log.revision(), before + 2);
    }

    #[test]
    fn test_display_has_timestamp_prefix() {
        let mut log = Logger::new();
        log.info("ready");
        let shown = log.last().unwrap().display();
        assert!(shown.starts_with('['));
        assert!(shown.ends_with("] ready"));
    }
}
