//! In-process duplex pipe.
//!
//! Writes are held in a per-side outbound buffer and only become visible to
//! the peer on `flush`, so code that forgets to flush is caught in tests.
//! A per-read size cap can be set to simulate fragmented delivery.

use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::error::Result;
use crate::traits::Transport;

#[derive(Debug, Default)]
struct Pipe {
    /// `inbound[i]` holds flushed bytes waiting to be read by side `i`.
    inbound: [BytesMut; 2],
    closed: [bool; 2],
}

/// One end of an in-memory duplex pipe created by [`pair`].
#[derive(Debug)]
pub struct MemoryTransport {
    side: usize,
    pipe: Arc<Mutex<Pipe>>,
    outbound: BytesMut,
    max_read: Option<usize>,
}

/// Create two connected in-memory transports.
pub fn pair() -> (MemoryTransport, MemoryTransport) {
    let pipe = Arc::new(Mutex::new(Pipe::default()));
    let left = MemoryTransport {
        side: 0,
        pipe: Arc::clone(&pipe),
        outbound: BytesMut::new(),
        max_read: None,
    };
    let right = MemoryTransport {
        side: 1,
        pipe,
        outbound: BytesMut::new(),
        max_read: None,
    };
    (left, right)
}

impl MemoryTransport {
    /// Limit every `read` to at most `max` bytes.
    pub fn with_max_read(mut self, max: usize) -> Self {
        self.set_max_read(Some(max));
        self
    }

    /// Change the per-read size cap. `None` removes it; zero is treated as one.
    pub fn set_max_read(&mut self, max: Option<usize>) {
        self.max_read = max.map(|m| m.max(1));
    }

    /// Bytes written but not yet flushed to the peer.
    pub fn pending_outbound(&self) -> usize {
        self.outbound.len()
    }

    /// Flushed bytes waiting to be read on this side.
    pub fn available(&self) -> usize {
        self.lock().inbound[self.side].len()
    }

    /// Whether the peer has shut down its end.
    pub fn is_peer_closed(&self) -> bool {
        self.lock().closed[self.peer()]
    }

    /// Whether this end has been shut down.
    pub fn is_closed(&self) -> bool {
        self.lock().closed[self.side]
    }

    fn peer(&self) -> usize {
        1 - self.side
    }

    fn lock(&self) -> MutexGuard<'_, Pipe> {
        self.pipe.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Read for MemoryTransport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let side = self.side;
        let peer = self.peer();
        let max_read = self.max_read;
        let mut pipe = self.lock();

        if pipe.closed[side] {
            return Ok(0);
        }

        let peer_closed = pipe.closed[peer];
        let inbound = &mut pipe.inbound[side];
        if inbound.is_empty() {
            if peer_closed {
                return Ok(0);
            }
            return Err(ErrorKind::WouldBlock.into());
        }

        let mut n = buf.len().min(inbound.len());
        if let Some(max) = max_read {
            n = n.min(max);
        }
        buf[..n].copy_from_slice(&inbound[..n]);
        inbound.advance(n);
        Ok(n)
    }
}

impl Write for MemoryTransport {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.is_closed() {
            return Err(ErrorKind::BrokenPipe.into());
        }
        self.outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if self.outbound.is_empty() {
            return Ok(());
        }

        let side = self.side;
        let peer = self.peer();
        let outbound = self.outbound.split();
        let mut pipe = self.lock();
        if pipe.closed[side] || pipe.closed[peer] {
            return Err(ErrorKind::BrokenPipe.into());
        }

        trace!(side, bytes = outbound.len(), "memory pipe flush");
        pipe.inbound[peer].extend_from_slice(&outbound);
        Ok(())
    }
}

impl Transport for MemoryTransport {
    fn transport_name(&self) -> &'static str {
        "memory"
    }

    fn shutdown(&mut self) -> Result<()> {
        self.outbound.clear();
        let side = self.side;
        let mut pipe = self.lock();
        pipe.closed[side] = true;
        pipe.inbound[side].clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_arrive_only_after_flush() {
        let (mut left, mut right) = pair();
        left.write_all(b"hello").unwrap();
        assert_eq!(left.pending_outbound(), 5);

        let mut buf = [0u8; 16];
        let err = right.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);

        left.flush().unwrap();
        assert_eq!(left.pending_outbound(), 0);
        assert_eq!(right.available(), 5);

        let n = right.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
    }

    #[test]
    fn max_read_fragments_delivery() {
        let (mut left, right) = pair();
        let mut right = right.with_max_read(3);
        left.write_all(b"abcdefgh").unwrap();
        left.flush().unwrap();

        let mut buf = [0u8; 16];
        let mut chunks = Vec::new();
        loop {
            match right.read(&mut buf) {
                Ok(n) => chunks.push(buf[..n].to_vec()),
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => panic!("unexpected error: {err}"),
            }
        }

        assert_eq!(
            chunks,
            vec![b"abc".to_vec(), b"def".to_vec(), b"gh".to_vec()]
        );
    }

    #[test]
    fn peer_shutdown_drains_then_eof() {
        let (mut left, mut right) = pair();
        left.write_all(b"bye").unwrap();
        left.flush().unwrap();
        left.shutdown().unwrap();

        assert!(right.is_peer_closed());

        let mut buf = [0u8; 16];
        assert_eq!(right.read(&mut buf).unwrap(), 3);
        assert_eq!(right.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn writes_after_shutdown_fail() {
        let (mut left, mut right) = pair();
        left.shutdown().unwrap();
        left.shutdown().unwrap();

        let err = left.write(b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);

        right.write_all(b"x").unwrap();
        let err = right.flush().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }

    #[test]
    fn unflushed_bytes_are_dropped_on_shutdown() {
        let (mut left, mut right) = pair();
        left.write_all(b"lost").unwrap();
        left.shutdown().unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(right.read(&mut buf).unwrap(), 0);
    }
}
