/// Why an incoming frame was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MalformedReason {
    /// The message sink rejected the decoded payload.
    #[error("payload rejected by message sink")]
    Rejected,

    /// The length field announced more bytes than the reader accepts.
    #[error("declared length {declared} exceeds maximum {max}")]
    LengthExceeded { declared: usize, max: usize },
}

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An incoming frame was refused; the connection must be closed.
    #[error("malformed frame: {0}")]
    MalformedFrame(MalformedReason),

    /// The payload exceeds the configured maximum size. Nothing was written.
    #[error("payload too large ({size} bytes, max {max})")]
    OversizedPayload { size: usize, max: usize },

    /// The stream is closed, either by the peer or by an earlier error.
    #[error("connection closed")]
    ConnectionClosed,

    /// An I/O error occurred while writing or flushing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Whether this error leaves the connection unusable.
    ///
    /// Only `OversizedPayload` is recoverable: the caller may retry with
    /// different data.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FrameError::OversizedPayload { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
