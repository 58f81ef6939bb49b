//! Result Manager: owns the identity of the image on display and the
//! save-to-desktop action.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::BackendError;
use crate::session::{DisplayedImage, GenerationView, Session, Tone};

pub const IMAGE_NAME_PREFIX: &str = "CreatingImage_";
pub const NOTHING_TO_SAVE: &str = "No image to save yet, generate one first";

/// Image data to fetch for a freshly generated image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub ticket: u64,
    pub path: String,
}

pub struct ResultManager {
    last_token: i64,
}

impl ResultManager {
    pub fn new() -> Self {
        Self { last_token: 0 }
    }

    /// `CreatingImage_<millis>.png`, with the token strictly increasing even
    /// when two names are made within the same millisecond.
    pub fn synthesize_name(&mut self) -> String {
        let token = Utc::now().timestamp_millis().max(self.last_token + 1);
        self.last_token = token;
        format!("{}{}.png", IMAGE_NAME_PREFIX, token)
    }

    /// Drop the current image; a new generation is starting.
    pub fn invalidate(&mut self, session: &mut Session) {
        if let Some(old) = session.displayed.take() {
            debug!("dropping displayed image {}", old.path);
        }
        session.sync_save_control();
    }

    /// Make `path` the displayed image and return the data fetch to issue.
    /// The path is set before any data arrives, so saving works right away.
    pub fn present(&mut self, ticket: u64, path: String, session: &mut Session) -> LoadRequest {
        let synthesized_name = self.synthesize_name();
        info!("displaying {} as {}", path, synthesized_name);
        session.displayed = Some(DisplayedImage {
            path: path.clone(),
            synthesized_name,
            encoded_data: None,
            ticket,
        });
        session.sync_save_control();
        LoadRequest { ticket, path }
    }

    /// Apply fetched image data.  Returns `false` when the data belongs to an
    /// image that is no longer displayed.
    pub fn on_image_data(
        &mut self,
        request: &LoadRequest,
        outcome: Result<String, BackendError>,
        session: &mut Session,
    ) -> bool {
        let current = session
            .displayed
            .as_mut()
            .filter(|img| img.ticket == request.ticket && img.path == request.path);
        let Some(image) = current else {
            debug!("discarding stale image data for {}", request.path);
            return false;
        };

        match outcome {
            Ok(data) => {
                debug!("loaded {} bytes of image data", data.len());
                image.encoded_data = Some(data);
            }
            Err(e) => {
                warn!("failed to load image {}: {}", request.path, e);
                if let GenerationView::Result { message, .. } = &mut session.view {
                    *message = format!(
                        "Image generated successfully, but the preview failed to load: {}",
                        e
                    );
                }
            }
        }
        true
    }

    /// Start a save.  Returns the path to send to the backend, or `None` when
    /// there is nothing to save (a notice is raised) or a save is running.
    pub fn request_save(&mut self, session: &mut Session) -> Option<String> {
        if session.is_saving() {
            debug!("save already in flight");
            return None;
        }
        let path = session
            .displayed
            .as_ref()
            .map(|img| img.path.clone())
            .filter(|p| !p.is_empty());
        match path {
            Some(path) => {
                session.set_saving(true);
                Some(path)
            }
            None => {
                session.notice = Some(NOTHING_TO_SAVE.to_string());
                None
            }
        }
    }

    pub fn on_saved(&mut self, outcome: Result<String, BackendError>, session: &mut Session) {
        session.set_saving(false);
        let (message, tone) = match outcome {
            Ok(destination) => {
                info!("image saved to {}", destination);
                session.log.info(format!("Saved to {}", destination));
                (format!("✓ Image saved to desktop: {}", destination), Tone::Success)
            }
            Err(e) => {
                warn!("save failed: {}", e);
                session.log.error(format!("Save failed: {}", e));
                (format!("✗ Save failed: {}", e), Tone::Failure)
            }
        };
        // A newer generation may have replaced the result view meanwhile.
        if matches!(session.view, GenerationView::Result { .. }) {
            session.view = GenerationView::Result { message, tone };
        }
    }
}

impl Default for ResultManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_view(session: &mut Session) {
        session.view = GenerationView::Result {
            message: "Image generated successfully!".into(),
            tone: Tone::Neutral,
        };
    }

    #[test]
    fn test_names_are_unique_and_increasing() {
        let mut rm = ResultManager::new();
        let names: Vec<String> = (0..50).map(|_| rm.synthesize_name()).collect();
        for pair in names.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        assert!(names[0].starts_with(IMAGE_NAME_PREFIX));
        assert!(names[0].ends_with(".png"));
    }

    #[test]
    fn test_present_enables_save_before_data() {
        let mut rm = ResultManager::new();
        let mut s = Session::new();
        let req = rm.present(1, "/tmp/out.png".into(), &mut s);
        assert_eq!(req.path, "/tmp/out.png");
        assert!(s.save.enabled);
        assert_eq!(rm.request_save(&mut s), Some("/tmp/out.png".to_string()));
    }

    #[test]
    fn test_image_data_is_stored() {
        let mut rm = ResultManager::new();
        let mut s = Session::new();
        let req = rm.present(3, "/tmp/out.png".into(), &mut s);
        assert!(rm.on_image_data(&req, Ok("data:image/png;base64,AAAA".into()), &mut s));
        assert_eq!(
            s.displayed.unwrap().encoded_data.as_deref(),
            Some("data:image/png;base64,AAAA")
        );
    }

    #[test]
    fn test_stale_image_data_is_dropped() {
        let mut rm = ResultManager::new();
        let mut s = Session::new();
        let old = rm.present(1, "/tmp/a.png".into(), &mut s);
        rm.invalidate(&mut s);
        rm.present(2, "/tmp/b.png".into(), &mut s);
        assert!(!rm.on_image_data(&old, Ok("old".into()), &mut s));
        assert!(s.displayed.unwrap().encoded_data.is_none());
    }

    #[test]
    fn test_load_failure_keeps_success_message() {
        let mut rm = ResultManager::new();
        let mut s = Session::new();
        result_view(&mut s);
        let req = rm.present(1, "/tmp/a.png".into(), &mut s);
        rm.on_image_data(&req, Err(BackendError::Unavailable("gone".into())), &mut s);
        match &s.view {
            GenerationView::Result { message, .. } => {
                assert!(message.starts_with("Image generated successfully"));
                assert!(message.contains("gone"));
            }
            other => panic!("unexpected view {:?}", other),
        }
        assert!(s.displayed.is_some());
    }

    #[test]
    fn test_save_without_image_raises_notice() {
        let mut rm = ResultManager::new();
        let mut s = Session::new();
        assert_eq!(rm.request_save(&mut s), None);
        assert_eq!(s.notice.as_deref(), Some(NOTHING_TO_SAVE));
        assert!(!s.is_saving());
    }

    #[test]
    fn test_duplicate_save_is_ignored() {
        let mut rm = ResultManager::new();
        let mut s = Session::new();
        rm.present(1, "/tmp/a.png".into(), &mut s);
        assert!(rm.request_save(&mut s).is_some());
        assert!(!s.save.enabled);
        assert_eq!(rm.request_save(&mut s), None);
        assert!(s.notice.is_none());
    }

    #[test]
    fn test_save_outcomes_restore_control() {
        let mut rm = ResultManager::new();
        let mut s = Session::new();
        result_view(&mut s);
        rm.present(1, "/tmp/a.png".into(), &mut s);

        rm.request_save(&mut s);
        rm.on_saved(Ok("/home/me/Desktop/CreatingImage_1.png".into()), &mut s);
        assert!(s.save.enabled);
        assert!(matches!(
            &s.view,
            GenerationView::Result { tone: Tone::Success, message } if message.contains("Desktop")
        ));

        rm.request_save(&mut s);
        rm.on_saved(Err(BackendError::Unavailable("disk full".into())), &mut s);
        assert!(s.save.enabled);
        assert!(matches!(
            &s.view,
            GenerationView::Result { tone: Tone::Failure, message } if message.contains("disk full")
        ));
    }
}
