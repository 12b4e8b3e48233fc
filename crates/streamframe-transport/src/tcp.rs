use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// A connected, non-blocking TCP stream.
///
/// `TCP_NODELAY` is enabled so small frames are not held back by Nagle's
/// algorithm; `flush` is then a no-op.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    shut_down: bool,
}

impl TcpTransport {
    /// Connect to a TCP endpoint (blocking connect, non-blocking afterwards).
    pub fn connect(addr: impl ToSocketAddrs + std::fmt::Debug) -> Result<Self> {
        let stream = TcpStream::connect(&addr).map_err(|e| TransportError::ConnectAddr {
            addr: format!("{addr:?}"),
            source: e,
        })?;
        debug!(?addr, "connected to tcp endpoint");
        Self::from_stream(stream)
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        stream.set_nonblocking(true)?;
        Ok(Self {
            stream,
            shut_down: false,
        })
    }

    /// Address of the connected peer.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &TcpStream {
        &self.stream
    }
}

impl Read for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TcpTransport {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.stream.flush()
    }
}

impl Transport for TcpTransport {
    fn transport_name(&self) -> &'static str {
        "tcp"
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
