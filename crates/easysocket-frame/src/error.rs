/// Errors that can occur while framing, decoding or encoding datagrams.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The header carries a protocol version this codec does not speak.
    #[error("unsupported datagram version {found} (expected {expected})")]
    InvalidVersion { found: u8, expected: u8 },

    /// Fewer bytes than a field or header requires.
    #[error("truncated datagram ({len} bytes, need {needed})")]
    Truncated { len: usize, needed: usize },

    /// The length declared in the header disagrees with the frame handed to the codec.
    #[error("datagram length mismatch (header declares {declared} body bytes, frame holds {actual})")]
    LengthMismatch { declared: usize, actual: usize },

    /// A body cannot be represented in the 4-byte length field.
    #[error("datagram body too large ({size} bytes, max {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// A declared frame exceeds the configured maximum frame size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The accumulation buffer cannot grow any further.
    #[error("buffer exhausted (capacity {capacity} bytes, frame needs {required})")]
    BufferExhausted { capacity: usize, required: usize },

    /// Reader configuration is inconsistent.
    #[error("invalid reader config: {0}")]
    InvalidConfig(String),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed while writing.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether the error is a resource-exhaustion condition the reader must not retry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FrameError::BufferExhausted { .. }
                | FrameError::FrameTooLarge { .. }
                | FrameError::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
