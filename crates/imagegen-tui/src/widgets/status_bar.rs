//! Status line (environment readiness) and keybindings footer.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use imagegen_core::session::StatusIndicator;

use crate::theme::{C_ACCENT, C_MUTED, C_PENDING, C_PRIMARY, C_READY, C_SEPARATOR};

const KEYS: &str = " Tab/S-Tab fields  Enter/F5 generate  Space toggle  ^S save  ^Y copy path  ^L log  ^O options  Esc dismiss  ^Q quit";

/// One row: app name, readiness dot, status text.
pub fn draw_status_line(frame: &mut Frame, area: Rect, status: &StatusIndicator) {
    let (dot, color) = if status.ready {
        ("●", C_READY)
    } else {
        ("○", C_PENDING)
    };
    let line = Line::from(vec![
        Span::styled(
            " imagegen ",
            Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled(dot, Style::default().fg(color)),
        Span::raw(" "),
        Span::styled(status.text.as_str(), Style::default().fg(C_PRIMARY)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

pub fn draw_separator(frame: &mut Frame, area: Rect) {
    let line = Line::from(Span::styled(
        "─".repeat(area.width as usize),
        Style::default().fg(C_SEPARATOR),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

pub fn draw_keys_bar(frame: &mut Frame, area: Rect) {
    frame.render_widget(
        Paragraph::new(Span::styled(KEYS, Style::default().fg(C_MUTED))),
        area,
    );
}
