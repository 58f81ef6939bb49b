use std::fmt::Write as _;
use std::sync::Arc;

use imagegen_proto::protocol::Severity;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::log_queue::LogQueue;

/// Target for events meant for the user's install log panel.  Everything
/// else only goes to the daemon log file.
pub const INSTALL_LOG: &str = "install_log";

/// A tracing layer that copies `INSTALL_LOG` events into the log queue.
pub struct InstallLogLayer {
    queue: Arc<LogQueue>,
}

impl InstallLogLayer {
    pub fn new(queue: Arc<LogQueue>) -> Self {
        Self { queue }
    }
}

impl<S> Layer<S> for InstallLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if meta.target() != INSTALL_LOG {
            return;
        }
        let severity = match *meta.level() {
            Level::ERROR => Severity::Error,
            Level::WARN => Severity::Warning,
            Level::INFO => Severity::Info,
            // debug/trace stay in the file
            _ => return,
        };

        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));
        if !message.is_empty() {
            self.queue.push(message, severity);
        }
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl<'a> Visit for MessageVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0.push_str(value);
        } else {
            let _ = write!(self.0, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.0, "{:?}", value);
        } else {
            let _ = write!(self.0, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, error, info, warn};
    use tracing_subscriber::layer::SubscriberExt;

    fn capture(f: impl FnOnce()) -> Arc<LogQueue> {
        let queue = Arc::new(LogQueue::new());
        let subscriber =
            tracing_subscriber::registry().with(InstallLogLayer::new(Arc::clone(&queue)));
        tracing::subscriber::with_default(subscriber, f);
        queue
    }

    #[test]
    fn test_only_install_log_target_is_forwarded() {
        let queue = capture(|| {
            info!("internal detail");
            info!(target: INSTALL_LOG, "Checking torch");
            warn!(target: INSTALL_LOG, "Missing modules: diffusers");
            error!(target: INSTALL_LOG, "Traceback");
            debug!(target: INSTALL_LOG, "noise");
        });
        let lines: Vec<_> = std::iter::from_fn(|| queue.try_pop())
            .map(|e| (e.message, e.severity))
            .collect();
        assert_eq!(
            lines,
            vec![
                ("Checking torch".to_string(), Severity::Info),
                ("Missing modules: diffusers".to_string(), Severity::Warning),
                ("Traceback".to_string(), Severity::Error),
            ]
        );
    }

    #[test]
    fn test_formatted_message_keeps_text() {
        let queue = capture(|| {
            let step = 3;
            info!(target: INSTALL_LOG, "step {}/20", step);
        });
        assert_eq!(queue.try_pop().unwrap().message, "step 3/20");
    }
}
