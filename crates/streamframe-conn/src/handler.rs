use std::fmt;
use std::io::ErrorKind;

use bytes::Bytes;
use streamframe_frame::{Disposition, MalformedReason, MessageSink};

/// Why a connection became unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// A frame was refused by the handler or announced an oversized length.
    Malformed(MalformedReason),
    /// The transport reported that the peer went away.
    PeerClosed,
    /// The owner closed the connection.
    Local,
    /// The transport failed with an I/O error.
    Io(ErrorKind),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Malformed(reason) => write!(f, "malformed frame: {reason}"),
            CloseReason::PeerClosed => f.write_str("peer disconnected"),
            CloseReason::Local => f.write_str("closed locally"),
            CloseReason::Io(kind) => write!(f, "transport I/O error: {kind}"),
        }
    }
}

/// Owner callbacks for a [`Connection`](crate::Connection).
///
/// `on_frame` (from [`MessageSink`]) receives each decoded payload and may
/// reject it, which closes the connection. `on_closed` fires exactly once,
/// whatever made the connection unusable.
pub trait ConnectionHandler: MessageSink {
    /// The connection closed; no further frames will be delivered.
    fn on_closed(&mut self, reason: CloseReason);
}

/// Collects payloads and ignores the close notification.
impl ConnectionHandler for Vec<Bytes> {
    fn on_closed(&mut self, _reason: CloseReason) {}
}

/// Handler built from two closures.
///
/// ```
/// use streamframe_conn::{handler_fn, CloseReason};
/// use streamframe_frame::Disposition;
///
/// let handler = handler_fn(
///     |payload| Disposition::from_bool(!payload.is_empty()),
///     |reason: CloseReason| eprintln!("closed: {reason}"),
/// );
/// # drop(handler);
/// ```
pub fn handler_fn<F, C>(on_frame: F, on_closed: C) -> FnHandler<F, C>
where
    F: FnMut(Bytes) -> Disposition,
    C: FnMut(CloseReason),
{
    FnHandler {
        on_frame,
        on_closed,
    }
}

/// See [`handler_fn`].
pub struct FnHandler<F, C> {
    on_frame: F,
    on_closed: C,
}

impl<F, C> MessageSink for FnHandler<F, C>
where
    F: FnMut(Bytes) -> Disposition,
{
    fn on_frame(&mut self, payload: Bytes) -> Disposition {
        (self.on_frame)(payload)
    }
}

impl<F, C> ConnectionHandler for FnHandler<F, C>
where
    F: FnMut(Bytes) -> Disposition,
    C: FnMut(CloseReason),
{
    fn on_closed(&mut self, reason: CloseReason) {
        (self.on_closed)(reason)
    }
}

impl<F, C> fmt::Debug for FnHandler<F, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}
