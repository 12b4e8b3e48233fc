use std::io::ErrorKind;

use streamframe_frame::{FrameConfig, FrameError, FrameReader, FrameWriter};
use streamframe_transport::{Transport, TransportEvent};
use tracing::{debug, info, warn};

use crate::error::{ConnectionError, Result};
use crate::handler::{CloseReason, ConnectionHandler};

const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

/// Configuration for a [`Connection`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Frame size bound, applied to both directions.
    pub frame: FrameConfig,
    /// Bytes pulled from the transport per read call. Default: 8 KiB.
    pub read_chunk_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

/// Connection lifecycle. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

/// A framed connection over one transport.
///
/// Bridges transport events to a [`FrameReader`] and the owner's
/// [`ConnectionHandler`]: on `Readable` it drains the transport and delivers
/// every complete frame; a rejected or oversized frame, a peer disconnect, a
/// transport error or [`close`](Self::close) moves it to `Closed`, shuts the
/// transport down and calls `on_closed` exactly once.
///
/// All methods are synchronous and non-blocking. Callers sharing a
/// connection across threads must serialize access themselves.
pub struct Connection<T: Transport, H: ConnectionHandler> {
    transport: T,
    handler: H,
    reader: FrameReader,
    writer: FrameWriter,
    scratch: Vec<u8>,
    close_reason: Option<CloseReason>,
}

impl<T: Transport, H: ConnectionHandler> Connection<T, H> {
    /// Bind a handler to an open transport with default configuration.
    pub fn attach(transport: T, handler: H) -> Self {
        Self::attach_with_config(transport, handler, ConnectionConfig::default())
    }

    /// Bind a handler to an open transport with explicit configuration.
    pub fn attach_with_config(transport: T, handler: H, config: ConnectionConfig) -> Self {
        debug!(
            transport = transport.transport_name(),
            max_payload = config.frame.max_payload_size,
            "attached connection"
        );
        Self {
            transport,
            handler,
            reader: FrameReader::with_config(config.frame.clone()),
            writer: FrameWriter::with_config(config.frame),
            scratch: vec![0; config.read_chunk_size.max(1)],
            close_reason: None,
        }
    }

    /// Dispatch a transport lifecycle event.
    ///
    /// Returns the number of frames delivered to the handler.
    pub fn handle_event(&mut self, event: TransportEvent) -> Result<usize> {
        match event {
            TransportEvent::Readable => self.on_readable(),
            TransportEvent::Closed => {
                self.on_transport_closed();
                Ok(0)
            }
        }
    }

    /// Pull every currently available byte and deliver complete frames.
    ///
    /// Returns the number of frames the handler accepted. Closure detected
    /// while reading is reported through `on_closed`, not as an error; only
    /// calling this on an already closed connection fails.
    pub fn on_readable(&mut self) -> Result<usize> {
        self.ensure_open()?;
        let before = self.reader.frames_decoded();

        loop {
            let n = match self.transport.read(&mut self.scratch) {
                Ok(0) => {
                    self.transition(CloseReason::PeerClosed);
                    break;
                }
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => {
                    warn!(error = %err, "transport read failed");
                    self.transition(CloseReason::Io(err.kind()));
                    break;
                }
            };

            match self.reader.consume(&self.scratch[..n], &mut self.handler) {
                Ok(_) => {}
                Err(FrameError::MalformedFrame(reason)) => {
                    self.transition(CloseReason::Malformed(reason));
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "frame reader failed");
                    self.transition(CloseReason::Local);
                    break;
                }
            }
        }

        Ok((self.reader.frames_decoded() - before) as usize)
    }

    /// The transport reported a disconnect.
    ///
    /// Any partial frame is dropped without being delivered. Safe to call
    /// on an already closed connection.
    pub fn on_transport_closed(&mut self) {
        self.transition(CloseReason::PeerClosed);
    }

    /// Encode and send one frame, then flush the transport.
    ///
    /// `OversizedPayload` comes back as `ConnectionError::Frame` and leaves
    /// the connection open. Write failures close the connection.
    pub fn send_frame(&mut self, payload: &[u8]) -> Result<()> {
        self.ensure_open()?;
        let result = self.writer.send(&mut self.transport, payload);
        self.settle_write(result)
    }

    /// Retry writing frames the transport could not take earlier.
    pub fn poll_flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        let result = self.writer.poll_flush(&mut self.transport);
        self.settle_write(result)
    }

    /// Whether encoded frames are still waiting for the transport.
    pub fn has_pending_writes(&self) -> bool {
        self.writer.has_pending()
    }

    /// Close the connection from this side.
    ///
    /// Queued outbound bytes that the transport has not taken are dropped.
    pub fn close(&mut self) {
        self.transition(CloseReason::Local);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        if self.close_reason.is_some() {
            ConnectionState::Closed
        } else {
            ConnectionState::Open
        }
    }

    /// Whether frames can still be sent and received.
    pub fn is_open(&self) -> bool {
        self.close_reason.is_none()
    }

    /// Why the connection closed, once it has.
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    /// Frames delivered to the handler and accepted.
    pub fn frames_received(&self) -> u64 {
        self.reader.frames_decoded()
    }

    /// Frames queued for sending.
    pub fn frames_sent(&self) -> u64 {
        self.writer.frames_sent()
    }

    /// Borrow the handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Mutably borrow the handler.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Split the connection back into its transport and handler.
    pub fn into_parts(self) -> (T, H) {
        (self.transport, self.handler)
    }

    fn ensure_open(&self) -> Result<()> {
        match self.close_reason {
            Some(reason) => Err(ConnectionError::Closed(reason)),
            None => Ok(()),
        }
    }

    fn settle_write(&mut self, result: streamframe_frame::Result<()>) -> Result<()> {
        let reason = match result {
            Ok(()) => return Ok(()),
            Err(err @ FrameError::OversizedPayload { .. }) => return Err(err.into()),
            Err(FrameError::ConnectionClosed) => CloseReason::PeerClosed,
            Err(FrameError::Io(err)) => match err.kind() {
                ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::NotConnected => {
                    CloseReason::PeerClosed
                }
                kind => {
                    warn!(error = %err, "transport write failed");
                    CloseReason::Io(kind)
                }
            },
            Err(FrameError::MalformedFrame(reason)) => CloseReason::Malformed(reason),
        };
        self.transition(reason);
        Err(ConnectionError::Closed(reason))
    }

    // Open -> Closed, at most once.
    fn transition(&mut self, reason: CloseReason) {
        if self.close_reason.is_some() {
            return;
        }
        self.close_reason = Some(reason);

        info!(
            transport = self.transport.transport_name(),
            %reason,
            frames_received = self.reader.frames_decoded(),
            frames_sent = self.writer.frames_sent(),
            "connection closed"
        );

        self.reader.close();
        self.writer.clear();
        if let Err(err) = self.transport.shutdown() {
            debug!(error = %err, "transport shutdown failed");
        }
        self.handler.on_closed(reason);
    }
}

impl<T, H> std::fmt::Debug for Connection<T, H>
where
    T: Transport,
    H: ConnectionHandler,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("transport", &self.transport.transport_name())
            .field("state", &self.state())
            .field("close_reason", &self.close_reason)
            .field("parse_state", &self.reader.state())
            .field("pending_writes", &self.writer.pending_len())
            .finish()
    }
}
