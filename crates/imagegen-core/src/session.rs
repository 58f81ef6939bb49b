//! Session: the single explicit state object the engine owns.
//!
//! Presenters read it, components mutate only the slice they need, and only
//! the engine loop ever holds it mutably.

use crate::logger::Logger;

// ── Controls ──────────────────────────────────────────────────────────────────

/// Label shown on the generation control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateLabel {
    Generate,
    Preparing,
    Checking,
    Generating,
}

impl GenerateLabel {
    pub fn text(self) -> &'static str {
        match self {
            GenerateLabel::Generate => "Generate image",
            GenerateLabel::Preparing => "Preparing environment...",
            GenerateLabel::Checking => "Checking environment...",
            GenerateLabel::Generating => "Generating...",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateControl {
    pub enabled: bool,
    pub label: GenerateLabel,
}

impl GenerateControl {
    pub fn enable(&mut self) {
        self.enabled = true;
        self.label = GenerateLabel::Generate;
    }

    pub fn disable(&mut self, label: GenerateLabel) {
        self.enabled = false;
        self.label = label;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveLabel {
    Save,
    Saving,
}

impl SaveLabel {
    pub fn text(self) -> &'static str {
        match self {
            SaveLabel::Save => "Save to desktop",
            SaveLabel::Saving => "Saving...",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveControl {
    pub enabled: bool,
    pub label: SaveLabel,
}

// ── Status / panels ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusIndicator {
    pub text: String,
    pub ready: bool,
}

impl StatusIndicator {
    pub fn set(&mut self, text: impl Into<String>, ready: bool) {
        self.text = text.into();
        self.ready = ready;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Panels {
    /// Installation log + environment status area.
    pub install_log: bool,
    /// Advanced generation options.
    pub advanced: bool,
}

// ── Generation view ───────────────────────────────────────────────────────────

/// Colour of the result message line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationView {
    Idle,
    Loading,
    Result { message: String, tone: Tone },
    Error { message: String },
}

impl GenerationView {
    pub fn is_loading(&self) -> bool {
        matches!(self, GenerationView::Loading)
    }
}

/// The image currently on display.  At most one exists per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayedImage {
    pub path: String,
    pub synthesized_name: String,
    pub encoded_data: Option<String>,
    /// Identifies the generation that produced this image.
    pub ticket: u64,
}

// ── Session ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Session {
    pub log: Logger,
    /// Last readiness reported by the backend.
    pub ready: bool,
    pub status: StatusIndicator,
    pub generate: GenerateControl,
    pub save: SaveControl,
    pub view: GenerationView,
    pub panels: Panels,
    pub displayed: Option<DisplayedImage>,
    /// Inline warning for the user (e.g. nothing to save yet).
    pub notice: Option<String>,
    save_in_flight: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            log: Logger::new(),
            ready: false,
            status: StatusIndicator {
                text: "Initializing...".to_string(),
                ready: false,
            },
            generate: GenerateControl {
                enabled: false,
                label: GenerateLabel::Checking,
            },
            save: SaveControl {
                enabled: false,
                label: SaveLabel::Save,
            },
            view: GenerationView::Idle,
            panels: Panels {
                install_log: true,
                advanced: false,
            },
            displayed: None,
            notice: None,
            save_in_flight: false,
        }
    }

    /// Shows the install log panel.  The content keeps whatever collapsed or
    /// expanded state the user left it in.
    pub fn show_install_log(&mut self) {
        self.panels.install_log = true;
    }

    pub fn hide_install_log(&mut self) {
        self.panels.install_log = false;
    }

    /// Collapse or expand the log content.  A hidden panel is brought back
    /// first, unchanged.
    pub fn toggle_install_log(&mut self) {
        if self.panels.install_log {
            self.log.toggle_visible();
        } else {
            self.show_install_log();
        }
    }

    pub fn hide_error(&mut self) {
        if matches!(self.view, GenerationView::Error { .. }) {
            self.view = GenerationView::Idle;
        }
    }

    pub fn is_saving(&self) -> bool {
        self.save_in_flight
    }

    pub(crate) fn set_saving(&mut self, saving: bool) {
        self.save_in_flight = saving;
        self.sync_save_control();
    }

    /// Save is only offered when an image with a path is on display and no
    /// save is already running.
    pub(crate) fn sync_save_control(&mut self) {
        self.save.label = if self.save_in_flight {
            SaveLabel::Saving
        } else {
            SaveLabel::Save
        };
        self.save.enabled = !self.save_in_flight
            && self
                .displayed
                .as_ref()
                .is_some_and(|img| !img.path.is_empty());
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
