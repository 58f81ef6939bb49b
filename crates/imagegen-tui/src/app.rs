//! App: terminal front end over the controller engine.
//!
//! Architecture:
//! - The engine owns all state and publishes `Session` snapshots on a watch
//!   channel; the app keeps the latest one and draws from it.
//! - Terminal input arrives on a `tokio::mpsc` channel fed by a blocking
//!   reader task.
//! - Key presses become either local UI changes (focus, typing, scrolling) or
//!   `UserCommand`s sent to the engine.

use std::io;
use std::time::Duration;

use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::Block,
    Frame, Terminal,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use imagegen_core::{EngineHandle, Session, UserCommand};

use crate::components::{
    log_panel::LogPanel,
    prompt_form::{FormAction, PromptForm},
    result_panel,
};
use crate::theme::C_BG;
use crate::widgets::{status_bar, toast::ToastManager};

const LOG_PANEL_HEIGHT: u16 = 12;

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
}

/// Keys handled before the focused field sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GlobalKey {
    Quit,
    Generate,
    Save,
    ToggleLog,
    ToggleAdvanced,
    CopyPath,
    Dismiss,
    FocusNext,
    FocusPrev,
    LogUp,
    LogDown,
    LogTop,
    LogBottom,
}

fn global_key(key: &KeyEvent) -> Option<GlobalKey> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let global = match key.code {
        KeyCode::Char('c') | KeyCode::Char('q') if ctrl => GlobalKey::Quit,
        KeyCode::Char('s') if ctrl => GlobalKey::Save,
        KeyCode::Char('l') if ctrl => GlobalKey::ToggleLog,
        KeyCode::Char('o') if ctrl => GlobalKey::ToggleAdvanced,
        KeyCode::Char('y') if ctrl => GlobalKey::CopyPath,
        KeyCode::Enter if ctrl || alt => GlobalKey::Generate,
        KeyCode::F(5) => GlobalKey::Generate,
        KeyCode::Esc => GlobalKey::Dismiss,
        KeyCode::Tab => GlobalKey::FocusNext,
        KeyCode::BackTab => GlobalKey::FocusPrev,
        KeyCode::PageUp => GlobalKey::LogUp,
        KeyCode::PageDown => GlobalKey::LogDown,
        KeyCode::Home if ctrl => GlobalKey::LogTop,
        KeyCode::End if ctrl => GlobalKey::LogBottom,
        _ => return None,
    };
    Some(global)
}

pub struct App {
    handle: EngineHandle,
    session_rx: watch::Receiver<Session>,
    /// Latest snapshot from the engine.
    session: Session,
    form: PromptForm,
    log_panel: LogPanel,
    toasts: ToastManager,
    spinner: usize,
    should_quit: bool,
}

impl App {
    pub fn new(handle: EngineHandle, session_rx: watch::Receiver<Session>) -> Self {
        let session = session_rx.borrow().clone();
        Self {
            handle,
            session_rx,
            session,
            form: PromptForm::new(),
            log_panel: LogPanel::new(),
            toasts: ToastManager::new(),
            spinner: 0,
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(256);

        // ── Background task: keyboard/mouse events ────────────────────────────
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // Toast expiry + spinner animation
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    needs_redraw = self.handle_message(msg).await;
                }
                changed = self.session_rx.changed() => {
                    if changed.is_err() {
                        warn!("engine stopped, leaving");
                        self.should_quit = true;
                    } else {
                        self.session = self.session_rx.borrow_and_update().clone();
                        self.form.sync_advanced(self.session.panels.advanced);
                    }
                    needs_redraw = true;
                }
                _ = ui_tick.tick() => {
                    needs_redraw = self.toasts.tick();
                    if self.session.view.is_loading() {
                        self.spinner = self.spinner.wrapping_add(1);
                        needs_redraw = true;
                    }
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        if self.handle.shutdown().await.is_err() {
            debug!("engine already stopped");
        }
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        info!("ui stopped");

        Ok(())
    }

    /// Returns whether a redraw is needed.
    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                if key.kind == KeyEventKind::Release {
                    return false;
                }
                self.handle_key(key).await;
                true
            }
            AppMessage::Event(Event::Mouse(mouse)) => match mouse.kind {
                MouseEventKind::ScrollUp => {
                    self.log_panel.scroll_up(1);
                    true
                }
                MouseEventKind::ScrollDown => {
                    self.log_panel.scroll_down(1);
                    true
                }
                _ => false,
            },
            AppMessage::Event(Event::Resize(_, _)) => true,
            AppMessage::Event(_) => false,
        }
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        let Some(global) = global_key(&key) else {
            match self.form.handle_key(key) {
                FormAction::Generate => self.generate().await,
                FormAction::Save => self.send(UserCommand::SaveToDesktop).await,
                FormAction::None => {}
            }
            return;
        };

        match global {
            GlobalKey::Quit => self.should_quit = true,
            GlobalKey::Generate => self.generate().await,
            GlobalKey::Save => self.send(UserCommand::SaveToDesktop).await,
            GlobalKey::ToggleLog => self.send(UserCommand::ToggleLog).await,
            GlobalKey::ToggleAdvanced => self.send(UserCommand::ToggleAdvanced).await,
            GlobalKey::CopyPath => self.copy_image_path(),
            GlobalKey::Dismiss => {
                if self.session.notice.is_some() {
                    self.send(UserCommand::DismissNotice).await;
                }
            }
            GlobalKey::FocusNext => self.form.focus_next(),
            GlobalKey::FocusPrev => self.form.focus_prev(),
            GlobalKey::LogUp => self.log_panel.scroll_up(10),
            GlobalKey::LogDown => self.log_panel.scroll_down(10),
            GlobalKey::LogTop => self.log_panel.to_top(),
            GlobalKey::LogBottom => self.log_panel.to_bottom(),
        }
    }

    /// A disabled control can't be pressed; say why instead.
    async fn generate(&mut self) {
        if !self.session.generate.enabled {
            self.toasts.info(self.session.generate.label.text());
            return;
        }
        let command = UserCommand::Generate {
            prompt: self.form.prompt().to_string(),
            options: self.form.raw_options(),
        };
        self.send(command).await;
    }

    async fn send(&mut self, command: UserCommand) {
        debug!("ui: {:?}", command);
        if self.handle.send(command).await.is_err() {
            warn!("engine stopped, command dropped");
            self.should_quit = true;
        }
    }

    fn copy_image_path(&mut self) {
        let Some(image) = self.session.displayed.as_ref() else {
            self.toasts.info("No image to copy yet");
            return;
        };
        match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(image.path.clone())) {
            Ok(()) => self.toasts.success(format!("Copied {}", image.path)),
            Err(e) => {
                warn!("clipboard: {}", e);
                self.toasts.error(format!("Clipboard error: {}", e));
            }
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        let log_h = match (self.session.panels.install_log, self.session.log.is_visible()) {
            (false, _) => 0,
            (true, false) => 1,
            (true, true) => LOG_PANEL_HEIGHT,
        };
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(self.form.height()),
                Constraint::Min(4),
                Constraint::Length(log_h),
                Constraint::Length(1),
            ])
            .split(area);

        status_bar::draw_status_line(frame, outer[0], &self.session.status);
        status_bar::draw_separator(frame, outer[1]);
        self.form.draw(frame, outer[2], &self.session);
        result_panel::draw(frame, outer[3], &self.session, self.spinner);
        self.log_panel.draw(frame, outer[4], &self.session.log);
        status_bar::draw_keys_bar(frame, outer[5]);

        self.toasts.draw(frame, area);
    }
}
