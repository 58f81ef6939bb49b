//! LogPanel: the install / generation log.
//!
//! Shows one line (the newest entry) when collapsed; expands to a scrollable
//! pane.  Follows the tail until the user scrolls up.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Borders, Clear, Paragraph},
    Frame,
};

use imagegen_core::logger::Logger;
use imagegen_proto::protocol::Severity;

use crate::theme::{severity_color, style_muted, C_ERROR, C_PENDING};
use crate::widgets::pane_chrome::{draw_collapsed_pane, pane_chrome_borders, Badge};

pub struct LogPanel {
    scroll: usize,
    follow: bool,
    last_revision: u64,
}

impl LogPanel {
    pub fn new() -> Self {
        Self {
            scroll: 0,
            follow: true,
            last_revision: 0,
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
        self.follow = false;
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    pub fn to_top(&mut self) {
        self.scroll = 0;
        self.follow = false;
    }

    pub fn to_bottom(&mut self) {
        self.follow = true;
    }

    /// First visible line for a log of `len` lines in `height` rows.
    fn sync(&mut self, revision: u64, len: usize, height: usize) -> usize {
        let max_scroll = len.saturating_sub(height);
        if revision != self.last_revision {
            self.last_revision = revision;
            if self.follow {
                self.scroll = max_scroll;
            }
        }
        if self.follow || self.scroll >= max_scroll {
            self.scroll = max_scroll;
            self.follow = true;
        }
        self.scroll
    }

    pub fn draw(&mut self, frame: &mut Frame, area: Rect, log: &Logger) {
        if area.height == 0 {
            return;
        }
        frame.render_widget(Clear, area);

        if !log.is_visible() || area.height <= 2 {
            let last = log.last().map(|l| l.display());
            draw_collapsed_pane(frame, area, "log (^L)", last.as_deref());
            return;
        }

        let errors = log.count(Severity::Error);
        let warnings = log.count(Severity::Warning);
        let badge_text = if errors > 0 {
            format!("{} ERR", errors)
        } else {
            format!("{} WARN", warnings)
        };
        let badge = match (errors, warnings) {
            (0, 0) => None,
            (0, _) => Some(Badge {
                text: &badge_text,
                color: C_PENDING,
            }),
            _ => Some(Badge {
                text: &badge_text,
                color: C_ERROR,
            }),
        };
        let block = pane_chrome_borders("log", false, badge, Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if log.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  no log entries yet", style_muted())),
                inner,
            );
            return;
        }

        let height = inner.height as usize;
        let start = self.sync(log.revision(), log.len(), height);
        let lines: Vec<Line> = log
            .lines()
            .skip(start)
            .take(height)
            .map(|line| {
                Line::from(vec![
                    Span::raw(" "),
                    Span::styled(line.display(), Style::default().fg(severity_color(line.severity))),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), inner);
    }
}

impl Default for LogPanel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follows_tail_on_new_lines() {
        let mut panel = LogPanel::new();
        assert_eq!(panel.sync(1, 5, 10), 0);
        assert_eq!(panel.sync(2, 25, 10), 15);
        assert_eq!(panel.sync(3, 30, 10), 20);
    }

    #[test]
    fn test_scrolling_up_stops_following() {
        let mut panel = LogPanel::new();
        panel.sync(1, 30, 10);
        panel.scroll_up(5);
        assert_eq!(panel.sync(2, 31, 10), 15);

        panel.to_bottom();
        assert_eq!(panel.sync(3, 32, 10), 22);
    }

    #[test]
    fn test_scrolling_back_down_resumes_following() {
        let mut panel = LogPanel::new();
        panel.sync(1, 30, 10);
        panel.scroll_up(3);
        panel.scroll_down(50);
        assert_eq!(panel.sync(1, 30, 10), 20);
        assert_eq!(panel.sync(2, 35, 10), 25);
    }

    #[test]
    fn test_cleared_log_clamps_scroll() {
        let mut panel = LogPanel::new();
        panel.sync(1, 50, 10);
        panel.to_top();
        assert_eq!(panel.sync(2, 1, 10), 0);
    }
}
