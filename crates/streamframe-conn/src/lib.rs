//! Framed connections over non-blocking transports.
//!
//! This is the layer an application talks to. Attach a
//! [`ConnectionHandler`] to a transport, forward the transport's readable
//! and closed events, and receive complete payloads. The handler hears
//! about closure exactly once, whatever caused it.

pub mod error;
pub mod handler;
pub mod monitor;

#[cfg(unix)]
pub mod connector;
#[cfg(unix)]
pub mod listener;

#[cfg(unix)]
pub use connector::{connect, connect_with_config};
pub use error::{ConnectionError, Result};
pub use handler::{handler_fn, CloseReason, ConnectionHandler, FnHandler};
#[cfg(unix)]
pub use listener::ConnectionListener;
pub use monitor::{Connection, ConnectionConfig, ConnectionState};
