//! Engine: single-owner event loop for the controller.
//!
//! The engine owns the `Session` and every component that mutates it.  Backend
//! calls run in spawned tasks and come back as `EngineEvent`s, so no other
//! task ever touches session state.  After each event the presenter gets a
//! fresh render.
//!
//! The two recurring loops (readiness and install log) are driven by their
//! own tasks.  Each one hands its outcome to the engine together with a
//! oneshot reply and waits for the engine to say how long to sleep before
//! the next call, or to stop.  That keeps at most one request of each kind in
//! flight and leaves the scheduling decision with the state machine.
use std::sync::Arc;
use std::time::Duration;

use imagegen_proto::protocol::{GenerationResult, LogEntry, ReadinessStatus};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backend::Backend;
use crate::error::{BackendError, EngineStopped};
use crate::generation::{GenerationController, GenerationRequest, Submission};
use crate::options::RawOptions;
use crate::poller::{PollStep, StatusPoller};
use crate::presenter::Presenter;
use crate::result::{LoadRequest, ResultManager};
use crate::session::Session;
use crate::streamer::LogStreamer;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Scheduling constants.  Tests shrink or pause these; the app uses the
/// defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Delay between readiness checks until the environment is ready.
    pub readiness_retry: Duration,
    /// How long the install log stays open after the environment is ready.
    pub ready_grace: Duration,
    /// Delay between install log fetches.
    pub log_interval: Duration,
    /// Delay after a failed install log fetch.
    pub log_backoff: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            readiness_retry: Duration::from_secs(3),
            ready_grace: Duration::from_secs(2),
            log_interval: Duration::from_millis(100),
            log_backoff: Duration::from_millis(500),
        }
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

/// Intents coming from the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Generate { prompt: String, options: RawOptions },
    SaveToDesktop,
    ToggleLog,
    ToggleAdvanced,
    DismissNotice,
}

#[derive(Debug)]
enum EngineEvent {
    Command(UserCommand),
    /// A readiness check finished.  Reply with the delay before the next
    /// check, or `None` to stop.
    Readiness {
        outcome: Result<ReadinessStatus, BackendError>,
        reply: oneshot::Sender<Option<Duration>>,
    },
    /// An install log fetch finished.  Reply with the delay before the next.
    InstallLog {
        outcome: Result<Option<LogEntry>, BackendError>,
        reply: oneshot::Sender<Duration>,
    },
    GraceElapsed,
    Generated {
        ticket: u64,
        outcome: Result<GenerationResult, BackendError>,
    },
    ImageData {
        request: LoadRequest,
        outcome: Result<String, BackendError>,
    },
    Saved {
        outcome: Result<String, BackendError>,
    },
    Shutdown,
}

/// Cloneable sender side used by the UI.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineEvent>,
}

impl EngineHandle {
    pub async fn send(&self, command: UserCommand) -> Result<(), EngineStopped> {
        self.tx
            .send(EngineEvent::Command(command))
            .await
            .map_err(|_| EngineStopped)
    }

    /// Ask the engine to stop.  Spawned backend calls are abandoned.
    pub async fn shutdown(&self) -> Result<(), EngineStopped> {
        self.tx
            .send(EngineEvent::Shutdown)
            .await
            .map_err(|_| EngineStopped)
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

pub struct Engine {
    backend: Arc<dyn Backend>,
    presenter: Box<dyn Presenter>,
    session: Session,
    poller: StatusPoller,
    streamer: LogStreamer,
    generation: GenerationController,
    results: ResultManager,
    event_tx: mpsc::Sender<EngineEvent>,
    event_rx: mpsc::Receiver<EngineEvent>,
    /// The two recurring loops; aborted when the engine exits.
    loops: Vec<JoinHandle<()>>,
}

impl Engine {
    pub fn new(
        backend: Arc<dyn Backend>,
        presenter: Box<dyn Presenter>,
        timings: Timings,
    ) -> (Self, EngineHandle) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let handle = EngineHandle {
            tx: event_tx.clone(),
        };
        let engine = Self {
            backend,
            presenter,
            session: Session::new(),
            poller: StatusPoller::new(timings.readiness_retry, timings.ready_grace),
            streamer: LogStreamer::new(timings.log_interval, timings.log_backoff),
            generation: GenerationController::new(),
            results: ResultManager::new(),
            event_tx,
            event_rx,
            loops: Vec::new(),
        };
        (engine, handle)
    }

    /// Run until `EngineHandle::shutdown` is called.
    pub async fn run(mut self) {
        info!("engine: starting event loop");
        self.start();
        self.presenter.render(&self.session);

        while let Some(evt) = self.event_rx.recv().await {
            if matches!(evt, EngineEvent::Shutdown) {
                info!("engine: shutdown requested");
                break;
            }
            self.handle(evt);
            self.presenter.render(&self.session);
        }

        for task in self.loops.drain(..) {
            task.abort();
        }
        debug!("engine: stopped");
    }

    fn start(&mut self) {
        self.session.show_install_log();
        self.session.log.info("Initializing...");

        self.loops.push(tokio::spawn(readiness_loop(
            Arc::clone(&self.backend),
            self.event_tx.clone(),
        )));
        self.loops.push(tokio::spawn(install_log_loop(
            Arc::clone(&self.backend),
            self.event_tx.clone(),
        )));
    }

    fn handle(&mut self, evt: EngineEvent) {
        match evt {
            EngineEvent::Command(cmd) => self.handle_command(cmd),

            EngineEvent::Readiness { outcome, reply } => {
                let next = if self.poller.begin_check() {
                    match self.poller.on_status(outcome, &mut self.session) {
                        PollStep::RetryAfter(delay) => Some(delay),
                        PollStep::Ready { grace } => {
                            self.spawn_grace_timer(grace);
                            None
                        }
                    }
                } else {
                    None
                };
                let _ = reply.send(next);
            }

            EngineEvent::InstallLog { outcome, reply } => {
                let delay = self.streamer.on_fetch(outcome, &mut self.session.log);
                let _ = reply.send(delay);
            }

            EngineEvent::GraceElapsed => self.poller.on_grace_elapsed(&mut self.session),

            EngineEvent::Generated { ticket, outcome } => {
                let load =
                    self.generation
                        .on_result(ticket, outcome, &mut self.session, &mut self.results);
                if let Some(load) = load {
                    self.spawn_image_load(load);
                }
            }

            EngineEvent::ImageData { request, outcome } => {
                self.results
                    .on_image_data(&request, outcome, &mut self.session);
            }

            EngineEvent::Saved { outcome } => self.results.on_saved(outcome, &mut self.session),

            EngineEvent::Shutdown => {}
        }
    }

    fn handle_command(&mut self, cmd: UserCommand) {
        debug!("engine: command {:?}", cmd);
        match cmd {
            UserCommand::Generate { prompt, options } => {
                let submission = self.generation.submit(
                    &prompt,
                    &options,
                    &mut self.session,
                    &mut self.results,
                );
                if let Submission::Started(request) = submission {
                    self.spawn_generation(request);
                }
            }
            UserCommand::SaveToDesktop => {
                if let Some(path) = self.results.request_save(&mut self.session) {
                    self.spawn_save(path);
                }
            }
            UserCommand::ToggleLog => self.session.toggle_install_log(),
            UserCommand::ToggleAdvanced => {
                self.session.panels.advanced = !self.session.panels.advanced;
            }
            UserCommand::DismissNotice => self.session.notice = None,
        }
    }

    // ── spawned work ──────────────────────────────────────────────────────────

    fn spawn_grace_timer(&self, grace: Duration) {
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = tx.send(EngineEvent::GraceElapsed).await;
        });
    }

    fn spawn_generation(&self, request: GenerationRequest) {
        let backend = Arc::clone(&self.backend);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = backend
                .generate_image(&request.prompt, &request.options)
                .await;
            let _ = tx
                .send(EngineEvent::Generated {
                    ticket: request.ticket,
                    outcome,
                })
                .await;
        });
    }

    fn spawn_image_load(&self, request: LoadRequest) {
        let backend = Arc::clone(&self.backend);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = backend.get_image_data(&request.path).await;
            let _ = tx.send(EngineEvent::ImageData { request, outcome }).await;
        });
    }

    fn spawn_save(&self, path: String) {
        let backend = Arc::clone(&self.backend);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = backend.save_image_to_desktop(&path).await;
            let _ = tx.send(EngineEvent::Saved { outcome }).await;
        });
    }
}

async fn readiness_loop(backend: Arc<dyn Backend>, tx: mpsc::Sender<EngineEvent>) {
    loop {
        let outcome = backend.check_environment().await;
        let (reply, next) = oneshot::channel();
        if tx
            .send(EngineEvent::Readiness { outcome, reply })
            .await
            .is_err()
        {
            break;
        }
        match next.await {
            Ok(Some(delay)) => tokio::time::sleep(delay).await,
            _ => break,
        }
    }
    debug!("readiness loop finished");
}

async fn install_log_loop(backend: Arc<dyn Backend>, tx: mpsc::Sender<EngineEvent>) {
    loop {
        let outcome = backend.get_install_log().await;
        let (reply, next) = oneshot::channel();
        if tx
            .send(EngineEvent::InstallLog { outcome, reply })
            .await
            .is_err()
        {
            break;
        }
        match next.await {
            Ok(delay) => tokio::time::sleep(delay).await,
            Err(_) => break,
        }
    }
    debug!("install log loop finished");
}
