//! Duplex byte transports for streamframe.
//!
//! Provides a single [`Transport`] trait over the byte channels a framed
//! connection can run on:
//! - Unix domain sockets (Linux/macOS)
//! - TCP streams
//! - In-process memory pipes
//!
//! All transports are non-blocking. This is the lowest layer of streamframe:
//! the framing and connection layers are generic over [`Transport`] and never
//! look at the concrete transport type.

pub mod error;
pub mod memory;
pub mod tcp;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use tcp::TcpTransport;
pub use traits::{Transport, TransportEvent};

#[cfg(unix)]
pub use uds::{UnixDomainSocket, UnixStreamTransport};
