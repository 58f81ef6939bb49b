//! Generation Controller: validates input, drives the loading / result /
//! error states around one generation request.
//!
//! Failures are never retried automatically; the user triggers again.

use imagegen_proto::protocol::{GenerationOptions, GenerationResult};
use tracing::{debug, info, warn};

use crate::error::BackendError;
use crate::options::RawOptions;
use crate::result::{LoadRequest, ResultManager};
use crate::session::{GenerateLabel, GenerationView, Session, Tone};

pub const PROMPT_REQUIRED: &str = "prompt required";
pub const GENERATED_OK: &str = "Image generated successfully!";

/// A request ready to be sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub ticket: u64,
    pub prompt: String,
    pub options: GenerationOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Started(GenerationRequest),
    /// Validation failed; the error state is showing.
    Rejected,
    /// A generation is already running.
    Busy,
}

pub struct GenerationController {
    next_ticket: u64,
    in_flight: Option<u64>,
}

impl GenerationController {
    pub fn new() -> Self {
        Self {
            next_ticket: 1,
            in_flight: None,
        }
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    pub fn submit(
        &mut self,
        prompt: &str,
        raw: &RawOptions,
        session: &mut Session,
        results: &mut ResultManager,
    ) -> Submission {
        if self.in_flight.is_some() {
            debug!("generation already running, ignoring submit");
            return Submission::Busy;
        }
        session.notice = None;

        let prompt = prompt.trim();
        if prompt.is_empty() {
            show_error(session, PROMPT_REQUIRED.to_string());
            return Submission::Rejected;
        }

        // Loading state
        session.view = GenerationView::Loading;
        session.generate.disable(GenerateLabel::Generating);
        session.show_install_log();
        session.log.clear();
        session.log.info("Starting image generation...");
        results.invalidate(session);

        let options = raw.parse();
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        info!(
            "generation #{}: {:?} steps={} guidance={} {}x{} seed={}",
            ticket,
            prompt,
            options.steps,
            options.guidance_scale,
            options.width,
            options.height,
            options.seed
        );

        Submission::Started(GenerationRequest {
            ticket,
            prompt: prompt.to_string(),
            options,
        })
    }

    /// Apply the backend's answer.  Returns the image data fetch to issue on
    /// success.
    pub fn on_result(
        &mut self,
        ticket: u64,
        outcome: Result<GenerationResult, BackendError>,
        session: &mut Session,
        results: &mut ResultManager,
    ) -> Option<LoadRequest> {
        if self.in_flight != Some(ticket) {
            warn!("result for unknown generation #{} ignored", ticket);
            return None;
        }
        self.in_flight = None;

        match outcome {
            Ok(result) if result.success && !result.image_path.is_empty() => {
                info!("generation #{} produced {}", ticket, result.image_path);
                session.view = GenerationView::Result {
                    message: GENERATED_OK.to_string(),
                    tone: Tone::Neutral,
                };
                session.generate.enable();
                Some(results.present(ticket, result.image_path, session))
            }
            Ok(result) if result.success => {
                warn!("generation #{} reported success without a path", ticket);
                show_error(
                    session,
                    "Generation reported success but returned no image".to_string(),
                );
                None
            }
            Ok(result) => {
                info!("generation #{} failed: {}", ticket, result.message);
                let message = if result.message.trim().is_empty() {
                    "Image generation failed".to_string()
                } else {
                    result.message
                };
                show_error(session, message);
                None
            }
            Err(e) => {
                warn!("generation #{} transport error: {}", ticket, e);
                show_error(session, format!("Error while generating image: {}", e));
                None
            }
        }
    }
}

impl Default for GenerationController {
    fn default() -> Self {
        Self::new()
    }
}

/// Error state.  The control only comes back when the environment is ready.
fn show_error(session: &mut Session, message: String) {
    session.view = GenerationView::Error { message };
    if session.ready {
        session.generate.enable();
    } else {
        session.generate.disable(GenerateLabel::Preparing);
    }
}
