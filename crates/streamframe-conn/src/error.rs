use crate::handler::CloseReason;

/// Errors that can occur in connection operations.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Transport-level error (bind, connect, accept).
    #[error("transport error: {0}")]
    Transport(#[from] streamframe_transport::TransportError),

    /// Frame-level error that left the connection open.
    #[error("frame error: {0}")]
    Frame(#[from] streamframe_frame::FrameError),

    /// The connection is closed and permanently unusable.
    #[error("connection closed: {0}")]
    Closed(CloseReason),
}

impl ConnectionError {
    /// Whether this error reports a closed connection.
    pub fn is_closed(&self) -> bool {
        matches!(self, ConnectionError::Closed(_))
    }
}

pub type Result<T> = std::result::Result<T, ConnectionError>;
