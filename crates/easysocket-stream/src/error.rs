use easysocket_frame::FrameError;

/// Errors raised by background stream processors.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// `start` was called while the processor was still running.
    #[error("{0} is already running")]
    AlreadyRunning(String),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The background thread could not be spawned.
    #[error("failed to spawn {name}: {source}")]
    Spawn {
        name: String,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, StreamError>;
