use thiserror::Error;

/// Transport-level failure of a backend call: the call itself did not
/// complete.  Application-level failures travel inside the response types
/// (`ReadinessStatus::ready == false`, `GenerationResult::success == false`).
#[derive(Error, Debug)]
pub enum BackendError {
    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// The daemon answered with a non-success HTTP status.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The daemon's answer could not be decoded.
    #[error("invalid response from backend: {0}")]
    InvalidResponse(String),

    /// The backend could not be reached at all.
    #[error("{0}")]
    Unavailable(String),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BackendError>;

/// The engine's event loop has exited; commands can no longer be delivered.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("engine has stopped")]
pub struct EngineStopped;
