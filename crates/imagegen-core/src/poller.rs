//! Status Poller: recurring readiness check against the backend.
//!
//! # States
//! ```text
//!  Unknown ──start──▶ Checking ──ready=true──▶ Ready        (terminal)
//!                        │  ▲
//!        ready=false or  │  │ retry timer
//!        call failed     ▼  │
//!                      NotReady
//! ```
//!
//! Retries run forever at a fixed interval: no backoff growth and no retry
//! cap.  Once `Ready` is reached the loop stops and never regresses.

use std::time::Duration;

use imagegen_proto::protocol::ReadinessStatus;
use tracing::{debug, info, warn};

use crate::error::BackendError;
use crate::session::{GenerateLabel, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Unknown,
    Checking,
    NotReady,
    Ready,
}

/// What the poll loop should do after a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    /// Check again after the delay.
    RetryAfter(Duration),
    /// Stop polling; collapse the install log after `grace`.
    Ready { grace: Duration },
}

pub struct StatusPoller {
    state: PollerState,
    retry_interval: Duration,
    grace_delay: Duration,
    checks: u64,
}

impl StatusPoller {
    pub fn new(retry_interval: Duration, grace_delay: Duration) -> Self {
        Self {
            state: PollerState::Unknown,
            retry_interval,
            grace_delay,
            checks: 0,
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    /// Number of completed checks (successful or not).
    pub fn checks(&self) -> u64 {
        self.checks
    }

    /// Enter `Checking` for the next attempt.  Returns `false` once `Ready`,
    /// in which case no check should be issued.
    pub fn begin_check(&mut self) -> bool {
        match self.state {
            PollerState::Ready => false,
            PollerState::Unknown | PollerState::NotReady | PollerState::Checking => {
                self.state = PollerState::Checking;
                true
            }
        }
    }

    pub fn on_status(
        &mut self,
        outcome: Result<ReadinessStatus, BackendError>,
        session: &mut Session,
    ) -> PollStep {
        self.checks += 1;
        // A generation in flight owns the generate control until it finishes.
        let generating = session.view.is_loading();

        match outcome {
            Ok(status) if status.ready => {
                info!("environment ready after {} check(s)", self.checks);
                self.state = PollerState::Ready;
                session.ready = true;
                if !generating {
                    session.generate.enable();
                }
                session.status.set("Environment ready", true);
                session.log.info("Environment ready");
                session.hide_error();
                PollStep::Ready {
                    grace: self.grace_delay,
                }
            }
            Ok(status) => {
                debug!("environment not ready: {}", status.message);
                self.state = PollerState::NotReady;
                session.ready = false;
                if !generating {
                    session.generate.disable(GenerateLabel::Preparing);
                }
                session.status.set("Installing dependencies...", false);
                session.show_install_log();
                let message = if status.message.trim().is_empty() {
                    "Environment is not ready yet".to_string()
                } else {
                    status.message
                };
                session.log.warning(message);
                PollStep::RetryAfter(self.retry_interval)
            }
            Err(e) => {
                warn!("environment check failed: {}", e);
                self.state = PollerState::NotReady;
                session.log.error(format!("Environment check failed: {}", e));
                if !generating {
                    session.generate.disable(GenerateLabel::Checking);
                }
                session.status.set("Check failed", false);
                PollStep::RetryAfter(self.retry_interval)
            }
        }
    }

    /// Grace delay after `Ready` has elapsed: collapse the install log, unless
    /// a generation re-opened it to show progress in the meantime.
    pub fn on_grace_elapsed(&self, session: &mut Session) {
        if self.state == PollerState::Ready && !session.view.is_loading() {
            session.hide_install_log();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::GenerationView;
    use imagegen_proto::protocol::Severity;

    fn poller() -> StatusPoller {
        StatusPoller::new(Duration::from_secs(3), Duration::from_secs(2))
    }

    #[test]
    fn test_not_ready_disables_and_warns() {
        let mut p = poller();
        let mut s = Session::new();
        assert!(p.begin_check());
        let step = p.on_status(Ok(ReadinessStatus::not_ready("installing torch")), &mut s);
        assert_eq!(step, PollStep::RetryAfter(Duration::from_secs(3)));
        assert_eq!(p.state(), PollerState::NotReady);
        assert!(!s.generate.enabled);
        assert_eq!(s.generate.label, GenerateLabel::Preparing);
        assert!(s.panels.install_log);
        assert_eq!(s.log.last().unwrap().message, "installing torch");
        assert_eq!(s.log.last().unwrap().severity, Severity::Warning);
    }

    #[test]
    fn test_repeated_not_ready_logs_one_warning_each() {
        let mut p = poller();
        let mut s = Session::new();
        for _ in 0..7 {
            assert!(p.begin_check());
            p.on_status(Ok(ReadinessStatus::not_ready("still going")), &mut s);
        }
        assert_eq!(s.log.count(Severity::Warning), 7);
        assert!(!s.generate.enabled);
        assert_eq!(p.checks(), 7);
    }

    #[test]
    fn test_ready_enables_and_stops() {
        let mut p = poller();
        let mut s = Session::new();
        s.view = GenerationView::Error {
            message: "old".into(),
        };
        p.begin_check();
        let step = p.on_status(Ok(ReadinessStatus::ready("ok")), &mut s);
        assert_eq!(
            step,
            PollStep::Ready {
                grace: Duration::from_secs(2)
            }
        );
        assert!(s.ready);
        assert!(s.generate.enabled);
        assert_eq!(s.generate.label, GenerateLabel::Generate);
        assert!(s.status.ready);
        assert_eq!(s.view, GenerationView::Idle);
        // Still visible until the grace delay elapses.
        assert!(s.panels.install_log);
        p.on_grace_elapsed(&mut s);
        assert!(!s.panels.install_log);
        assert!(!p.begin_check());
    }

    #[test]
    fn test_transport_failure_uses_checking_label() {
        let mut p = poller();
        let mut s = Session::new();
        p.begin_check();
        let step = p.on_status(
            Err(BackendError::Unavailable("connection refused".into())),
            &mut s,
        );
        assert_eq!(step, PollStep::RetryAfter(Duration::from_secs(3)));
        assert_eq!(s.generate.label, GenerateLabel::Checking);
        assert!(!s.generate.enabled);
        let last = s.log.last().unwrap();
        assert_eq!(last.severity, Severity::Error);
        assert!(last.message.contains("connection refused"));
    }

    #[test]
    fn test_empty_not_ready_message_gets_fallback() {
        let mut p = poller();
        let mut s = Session::new();
        p.begin_check();
        p.on_status(Ok(ReadinessStatus::not_ready("  ")), &mut s);
        assert_eq!(s.log.last().unwrap().message, "Environment is not ready yet");
    }

    #[test]
    fn test_generation_keeps_control_while_loading() {
        let mut p = poller();
        let mut s = Session::new();
        s.view = GenerationView::Loading;
        s.generate.disable(GenerateLabel::Generating);
        p.begin_check();
        p.on_status(Ok(ReadinessStatus::ready("ok")), &mut s);
        assert!(s.ready);
        assert!(!s.generate.enabled);
        assert_eq!(s.generate.label, GenerateLabel::Generating);
        p.on_grace_elapsed(&mut s);
        assert!(s.panels.install_log);
    }
}
