//! Client-side controller for the image generator: readiness polling, log
//! streaming, generation and result handling, driven by one event loop.

pub mod backend;
pub mod engine;
pub mod error;
pub mod generation;
pub mod logger;
pub mod options;
pub mod poller;
pub mod presenter;
pub mod result;
pub mod session;
pub mod streamer;

pub use backend::{Backend, HttpBackend};
pub use engine::{Engine, EngineHandle, Timings, UserCommand};
pub use error::{BackendError, EngineStopped};
pub use presenter::{Presenter, WatchPresenter};
pub use session::Session;
