use std::io::{Read, Write};

use crate::error::Result;

/// A duplex, non-blocking byte channel.
///
/// Read semantics:
/// - `Ok(0)` means the peer closed its side; no more bytes will arrive.
/// - `Err(WouldBlock)` means every currently available byte has been read.
/// - `Err(Interrupted)` should be retried by the caller.
///
/// Write semantics follow [`Write`]: a call may accept only a prefix, and
/// `Err(WouldBlock)` means the outbound side is full for now.
///
/// [`Write::flush`] is the flush capability. Each transport kind implements
/// it once, pushing any internally buffered outbound bytes to the peer.
/// Transports that always write through may leave it as a no-op.
pub trait Transport: Read + Write {
    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str;

    /// Close both directions of the channel.
    ///
    /// Calling this more than once is not an error.
    fn shutdown(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }

    fn shutdown(&mut self) -> Result<()> {
        (**self).shutdown()
    }
}

/// Lifecycle notifications dispatched by a transport's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// Bytes may be available to read.
    Readable,
    /// The transport reported that the peer disconnected.
    Closed,
}
