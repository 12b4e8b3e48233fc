use std::io::{ErrorKind, Write};

use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::codec::{encode_frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Encodes payloads into frames and pushes them to a transport.
///
/// The writer does not own the transport; the caller lends it for each call.
/// Bytes a non-blocking transport cannot take right away stay queued, in
/// order, until the next [`send`](Self::send) or
/// [`poll_flush`](Self::poll_flush).
#[derive(Debug)]
pub struct FrameWriter {
    pending: BytesMut,
    config: FrameConfig,
    frames_sent: u64,
}

impl FrameWriter {
    /// Create a new frame writer with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            pending: BytesMut::new(),
            config,
            frames_sent: 0,
        }
    }

    /// Encode `payload` as one frame, write it and request a flush.
    ///
    /// Payloads above the configured bound fail with `OversizedPayload`
    /// before anything is queued or written.
    pub fn send<W>(&mut self, out: &mut W, payload: &[u8]) -> Result<()>
    where
        W: Write + ?Sized,
    {
        let max = self.config.effective_max_payload();
        if payload.len() > max {
            return Err(FrameError::OversizedPayload {
                size: payload.len(),
                max,
            });
        }

        encode_frame(payload, &mut self.pending)?;
        self.frames_sent += 1;
        trace!(size = payload.len(), "queued frame");

        self.poll_flush(out)
    }

    /// Write as much queued data as the transport accepts, then flush it.
    ///
    /// Returns `Ok(())` when the transport would block; the remainder stays
    /// queued. A transport that accepts zero bytes is treated as closed.
    pub fn poll_flush<W>(&mut self, out: &mut W) -> Result<()>
    where
        W: Write + ?Sized,
    {
        while !self.pending.is_empty() {
            match out.write(&self.pending) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => self.pending.advance(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    trace!(pending = self.pending.len(), "transport full; frame bytes queued");
                    break;
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        loop {
            match out.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Whether encoded bytes are still waiting for the transport.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of encoded bytes still waiting for the transport.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Discard queued bytes.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Frames accepted by [`send`](Self::send) since creation.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Update maximum payload size for subsequent sends.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new()
    }
}
