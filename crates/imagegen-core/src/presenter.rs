//! Presentation port.  The engine calls `render` after every state change;
//! what the presenter does with the snapshot (draw a terminal frame, diff a
//! DOM, record it in a test) is up to it.

use tokio::sync::watch;

use crate::session::Session;

pub trait Presenter: Send {
    fn render(&mut self, session: &Session);
}

/// Publishes every rendered session on a `watch` channel.  Readers only ever
/// see the latest snapshot, so a slow UI skips frames instead of queueing.
pub struct WatchPresenter {
    tx: watch::Sender<Session>,
}

impl WatchPresenter {
    pub fn new() -> (Self, watch::Receiver<Session>) {
        let (tx, rx) = watch::channel(Session::new());
        (Self { tx }, rx)
    }
}

impl Presenter for WatchPresenter {
    fn render(&mut self, session: &Session) {
        self.tx.send_replace(session.clone());
    }
}
