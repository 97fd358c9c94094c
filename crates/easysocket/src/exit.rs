use std::io;

use easysocket_frame::FrameError;
use easysocket_stream::StreamError;

pub const SUCCESS: u8 = 0;
pub const FAILURE: u8 = 1;
pub const PERMISSION_DENIED: u8 = 50;
pub const DATA_INVALID: u8 = 60;
pub const USAGE: u8 = 64;
pub const TIMEOUT: u8 = 124;
pub const INTERNAL: u8 = 125;

pub type CliResult<T> = Result<T, CliError>;

/// A failed command: the process exit code plus the message printed to stderr.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CliError {
    pub code: u8,
    pub message: String,
}

impl CliError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrInUse => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::BodyTooLarge { .. }
        | FrameError::FrameTooLarge { .. }
        | FrameError::InvalidVersion { .. }
        | FrameError::LengthMismatch { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn stream_error(context: &str, err: StreamError) -> CliError {
    match err {
        StreamError::Frame(err) => frame_error(context, err),
        StreamError::Spawn { source, .. } => io_error(context, source),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}
