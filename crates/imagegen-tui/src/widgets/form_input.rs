//! FormInput: a labelled single-line text field over tui-input.

use ratatui::crossterm::event::{Event, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};
use unicode_width::UnicodeWidthStr;

use crate::theme::{style_input, C_INPUT_BG, C_MUTED, C_PANEL_BORDER_FOCUSED, C_SECONDARY};

pub struct FormInput {
    label: &'static str,
    input: Input,
    placeholder: String,
}

impl FormInput {
    pub fn new(label: &'static str, placeholder: impl Into<String>) -> Self {
        Self {
            label,
            input: Input::default(),
            placeholder: placeholder.into(),
        }
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.set_value(value);
        self
    }

    pub fn set_value(&mut self, value: &str) {
        self.input = Input::new(value.to_string());
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    pub fn is_empty(&self) -> bool {
        self.input.value().is_empty()
    }

    /// Feed an editing key (chars, backspace, arrows, home/end...).
    pub fn handle_key(&mut self, key: KeyEvent) {
        self.input.handle_event(&Event::Key(key));
    }

    /// `label: value` on one row.  Shows the cursor when focused.
    pub fn draw(&self, frame: &mut Frame, area: Rect, focused: bool) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let label = format!("{}: ", self.label);
        let label_w = label.width() as u16;
        let label_style = if focused {
            Style::default().fg(C_PANEL_BORDER_FOCUSED)
        } else {
            Style::default().fg(C_SECONDARY)
        };

        let field_w = area.width.saturating_sub(label_w + 1) as usize;
        let scroll = self.input.visual_scroll(field_w);
        let value = self.input.value();
        let shown = if value.is_empty() {
            Span::styled(self.placeholder.clone(), Style::default().fg(C_MUTED).bg(C_INPUT_BG))
        } else {
            Span::styled(visible_tail(value, scroll), style_input())
        };

        frame.render_widget(
            Paragraph::new(Line::from(vec![Span::styled(label, label_style), shown])),
            area,
        );

        if focused {
            let cursor_x = area.x + label_w + (self.input.visual_cursor() - scroll) as u16;
            frame.set_cursor_position((cursor_x.min(area.x + area.width - 1), area.y));
        }
    }
}

/// Drop the first `scroll` display columns of `value`.
fn visible_tail(value: &str, scroll: usize) -> String {
    let mut skipped = 0;
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if skipped < scroll {
            skipped += unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
            continue;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_and_backspace() {
        let mut field = FormInput::new("Steps", "20").with_value("2");
        field.handle_key(key(KeyCode::Char('5')));
        assert_eq!(field.text(), "25");
        field.handle_key(key(KeyCode::Backspace));
        field.handle_key(key(KeyCode::Backspace));
        assert!(field.is_empty());
    }

    #[test]
    fn test_visible_tail_counts_columns() {
        assert_eq!(visible_tail("a red fox", 2), "red fox");
        assert_eq!(visible_tail("狐狸", 2), "狸");
        assert_eq!(visible_tail("fox", 0), "fox");
    }
}
