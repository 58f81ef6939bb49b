//! PromptForm: prompt, generation options and the two action buttons.
//!
//! Holds the raw text of every input; parsing into `GenerationOptions` happens
//! in the engine so malformed values fall back per field.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use imagegen_core::options::RawOptions;
use imagegen_core::session::Session;
use imagegen_proto::protocol::{
    DEFAULT_GUIDANCE_SCALE, DEFAULT_HEIGHT, DEFAULT_SEED, DEFAULT_STEPS, DEFAULT_WIDTH,
};

use crate::focus::{FieldId, FocusRing};
use crate::theme::{style_button, C_PANEL_BORDER_FOCUSED, C_SECONDARY};
use crate::widgets::form_input::FormInput;
use crate::widgets::pane_chrome::{draw_collapsed_pane, pane_chrome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    None,
    Generate,
    Save,
}

pub struct PromptForm {
    prompt: FormInput,
    steps: FormInput,
    guidance_scale: FormInput,
    width: FormInput,
    height: FormInput,
    seed: FormInput,
    optimize_speed: bool,
    optimize_memory: bool,
    focus: FocusRing,
    advanced: bool,
}

impl PromptForm {
    pub fn new() -> Self {
        let mut form = Self {
            prompt: FormInput::new("Prompt", "describe the image, e.g. a red fox in the snow"),
            steps: FormInput::new("Steps", DEFAULT_STEPS.to_string())
                .with_value(&DEFAULT_STEPS.to_string()),
            guidance_scale: FormInput::new("Guidance", DEFAULT_GUIDANCE_SCALE.to_string())
                .with_value(&DEFAULT_GUIDANCE_SCALE.to_string()),
            width: FormInput::new("Width", DEFAULT_WIDTH.to_string())
                .with_value(&DEFAULT_WIDTH.to_string()),
            height: FormInput::new("Height", DEFAULT_HEIGHT.to_string())
                .with_value(&DEFAULT_HEIGHT.to_string()),
            seed: FormInput::new("Seed", "0 = random").with_value(&DEFAULT_SEED.to_string()),
            optimize_speed: false,
            optimize_memory: false,
            focus: FocusRing::default(),
            advanced: false,
        };
        form.focus.set_items(focus_items(false));
        form
    }

    pub fn prompt(&self) -> &str {
        self.prompt.text()
    }

    pub fn raw_options(&self) -> RawOptions {
        RawOptions {
            steps: Some(self.steps.text().to_string()),
            guidance_scale: Some(self.guidance_scale.text().to_string()),
            width: Some(self.width.text().to_string()),
            height: Some(self.height.text().to_string()),
            seed: Some(self.seed.text().to_string()),
            optimize_speed: self.optimize_speed,
            optimize_memory: self.optimize_memory,
        }
    }

    /// Follow the advanced panel: hidden option fields leave the focus ring.
    pub fn sync_advanced(&mut self, advanced: bool) {
        if self.advanced != advanced {
            self.advanced = advanced;
            self.focus.set_items(focus_items(advanced));
        }
    }

    pub fn focused(&self) -> Option<FieldId> {
        self.focus.current()
    }

    pub fn focus_next(&mut self) {
        self.focus.next();
    }

    pub fn focus_prev(&mut self) {
        self.focus.prev();
    }

    /// Rows needed, borders included.
    pub fn height(&self) -> u16 {
        if self.advanced {
            7
        } else {
            6
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormAction {
        let Some(focused) = self.focus.current() else {
            return FormAction::None;
        };
        match (key.code, focused) {
            (KeyCode::Enter, FieldId::SaveButton) | (KeyCode::Char(' '), FieldId::SaveButton) => {
                FormAction::Save
            }
            (KeyCode::Enter, _) | (KeyCode::Char(' '), FieldId::GenerateButton) => {
                FormAction::Generate
            }
            (KeyCode::Char(' '), FieldId::OptimizeSpeed) => {
                self.optimize_speed = !self.optimize_speed;
                FormAction::None
            }
            (KeyCode::Char(' '), FieldId::OptimizeMemory) => {
                self.optimize_memory = !self.optimize_memory;
                FormAction::None
            }
            (_, id) => {
                if let Some(input) = self.input_mut(id) {
                    input.handle_key(key);
                }
                FormAction::None
            }
        }
    }

    fn input_mut(&mut self, id: FieldId) -> Option<&mut FormInput> {
        match id {
            FieldId::Prompt => Some(&mut self.prompt),
            FieldId::Steps => Some(&mut self.steps),
            FieldId::GuidanceScale => Some(&mut self.guidance_scale),
            FieldId::Width => Some(&mut self.width),
            FieldId::Height => Some(&mut self.height),
            FieldId::Seed => Some(&mut self.seed),
            _ => None,
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect, session: &Session) {
        let focused = self.focus.current();
        let block = pane_chrome("generate", focused.is_some_and(|f| !f.is_button()), None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let option_rows = if self.advanced { 2 } else { 1 };
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(option_rows),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);

        self.prompt
            .draw(frame, rows[0], self.focus.is_focused(FieldId::Prompt));

        if self.advanced {
            let thirds = |area: Rect| {
                Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([
                        Constraint::Ratio(1, 3),
                        Constraint::Ratio(1, 3),
                        Constraint::Ratio(1, 3),
                    ])
                    .split(area)
            };
            let lines = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Length(1)])
                .split(rows[1]);
            let top = thirds(lines[0]);
            let bottom = thirds(lines[1]);
            self.steps
                .draw(frame, top[0], self.focus.is_focused(FieldId::Steps));
            self.guidance_scale
                .draw(frame, top[1], self.focus.is_focused(FieldId::GuidanceScale));
            self.width
                .draw(frame, top[2], self.focus.is_focused(FieldId::Width));
            self.height
                .draw(frame, bottom[0], self.focus.is_focused(FieldId::Height));
            self.seed
                .draw(frame, bottom[1], self.focus.is_focused(FieldId::Seed));
            frame.render_widget(
                Paragraph::new(Line::from(vec![
                    checkbox(
                        "speed",
                        self.optimize_speed,
                        self.focus.is_focused(FieldId::OptimizeSpeed),
                    ),
                    Span::raw("  "),
                    checkbox(
                        "memory",
                        self.optimize_memory,
                        self.focus.is_focused(FieldId::OptimizeMemory),
                    ),
                ])),
                bottom[2],
            );
        } else {
            let summary = self.options_summary();
            draw_collapsed_pane(frame, rows[1], "options (^O)", Some(summary.as_str()));
        }

        let buttons = Line::from(vec![
            Span::styled(
                format!("[ {} ]", session.generate.label.text()),
                style_button(
                    session.generate.enabled,
                    self.focus.is_focused(FieldId::GenerateButton),
                ),
            ),
            Span::raw("  "),
            Span::styled(
                format!("[ {} ]", session.save.label.text()),
                style_button(
                    session.save.enabled,
                    self.focus.is_focused(FieldId::SaveButton),
                ),
            ),
        ]);
        frame.render_widget(Paragraph::new(buttons), rows[2]);
    }

    fn options_summary(&self) -> String {
        let mut summary = format!(
            "{} steps · guidance {} · {}x{} · seed {}",
            self.steps.text(),
            self.guidance_scale.text(),
            self.width.text(),
            self.height.text(),
            self.seed.text()
        );
        if self.optimize_speed {
            summary.push_str(" · fast");
        }
        if self.optimize_memory {
            summary.push_str(" · low memory");
        }
        summary
    }
}

impl Default for PromptForm {
    fn default() -> Self {
        Self::new()
    }
}

fn focus_items(advanced: bool) -> Vec<FieldId> {
    let mut items = vec![FieldId::Prompt];
    if advanced {
        items.extend([
            FieldId::Steps,
            FieldId::GuidanceScale,
            FieldId::Width,
            FieldId::Height,
            FieldId::Seed,
            FieldId::OptimizeSpeed,
            FieldId::OptimizeMemory,
        ]);
    }
    items.extend([FieldId::GenerateButton, FieldId::SaveButton]);
    items
}

fn checkbox(label: &str, checked: bool, focused: bool) -> Span<'static> {
    let mark = if checked { "[x]" } else { "[ ]" };
    let color = if focused {
        C_PANEL_BORDER_FOCUSED
    } else {
        C_SECONDARY
    };
    Span::styled(format!("{} {}", mark, label), Style::default().fg(color))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(form: &mut PromptForm, text: &str) {
        for c in text.chars() {
            form.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_defaults_parse_to_default_options() {
        let form = PromptForm::new();
        assert_eq!(
            form.raw_options().parse(),
            imagegen_proto::protocol::GenerationOptions::default()
        );
    }

    #[test]
    fn test_typing_goes_to_prompt_and_enter_generates() {
        let mut form = PromptForm::new();
        type_text(&mut form, "a red fox");
        assert_eq!(form.prompt(), "a red fox");
        assert_eq!(form.handle_key(key(KeyCode::Enter)), FormAction::Generate);
    }

    #[test]
    fn test_hidden_options_are_skipped_by_focus() {
        let mut form = PromptForm::new();
        form.focus_next();
        assert_eq!(form.focused(), Some(FieldId::GenerateButton));
        form.focus_next();
        assert_eq!(form.focused(), Some(FieldId::SaveButton));
        assert_eq!(form.handle_key(key(KeyCode::Char(' '))), FormAction::Save);
    }

    #[test]
    fn test_advanced_fields_edit_and_toggle() {
        let mut form = PromptForm::new();
        form.sync_advanced(true);
        assert_eq!(form.height(), 7);

        form.focus_next();
        assert_eq!(form.focused(), Some(FieldId::Steps));
        form.handle_key(key(KeyCode::Backspace));
        form.handle_key(key(KeyCode::Backspace));
        type_text(&mut form, "35");

        while form.focused() != Some(FieldId::OptimizeMemory) {
            form.focus_next();
        }
        assert_eq!(form.handle_key(key(KeyCode::Char(' '))), FormAction::None);

        let raw = form.raw_options();
        assert_eq!(raw.steps.as_deref(), Some("35"));
        assert!(raw.optimize_memory);
        assert!(!raw.optimize_speed);
    }

    #[test]
    fn test_collapsing_options_moves_focus_off_hidden_field() {
        let mut form = PromptForm::new();
        form.sync_advanced(true);
        form.focus_next();
        form.sync_advanced(false);
        assert_eq!(form.focused(), Some(FieldId::Prompt));
    }
}
