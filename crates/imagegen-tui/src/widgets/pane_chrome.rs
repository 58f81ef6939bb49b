//! PaneChrome: bordered pane with focus styling and an optional badge.

use crate::theme::{
    style_focused_border, style_unfocused_border, C_MUTED, C_PANEL_BORDER, C_PRIMARY,
    C_SECONDARY,
};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// A badge shown in the top-right of the pane header (e.g. "READY").
pub struct Badge<'a> {
    pub text: &'a str,
    pub color: Color,
}

pub fn pane_chrome<'a>(title: &'a str, focused: bool, badge: Option<Badge<'a>>) -> Block<'a> {
    pane_chrome_borders(title, focused, badge, Borders::ALL)
}

/// Like `pane_chrome` but with explicit border selection.
pub fn pane_chrome_borders<'a>(
    title: &'a str,
    focused: bool,
    badge: Option<Badge<'a>>,
    borders: Borders,
) -> Block<'a> {
    let border_style = if focused {
        style_focused_border()
    } else {
        style_unfocused_border()
    };

    let title_style = if focused {
        Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(C_MUTED)
    };

    let block = Block::default()
        .borders(borders)
        .border_style(border_style)
        .title(Line::from(Span::styled(format!(" {} ", title), title_style)));

    match badge {
        Some(b) => block.title_top(
            Line::from(Span::styled(
                format!(" {} ", b.text),
                Style::default().fg(b.color).add_modifier(Modifier::BOLD),
            ))
            .right_aligned(),
        ),
        None => block,
    }
}

/// Collapsed pane as a single strip: " ▸ title  summary".
pub fn draw_collapsed_pane(frame: &mut Frame, area: Rect, title: &str, summary: Option<&str>) {
    if area.height == 0 {
        return;
    }

    let mut spans = vec![
        Span::styled(" ▸ ", Style::default().fg(C_PANEL_BORDER)),
        Span::styled(title, Style::default().fg(C_MUTED)),
    ];

    if let Some(s) = summary.filter(|s| !s.is_empty()) {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(s, Style::default().fg(C_SECONDARY)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
