//! Length-prefixed message framing over non-blocking byte streams.
//!
//! streamframe turns a stream transport that delivers bytes in arbitrary
//! chunks into a sequence of discrete messages, each sent as a 4-byte
//! big-endian length followed by the payload.
//!
//! # Crate Structure
//!
//! - [`transport`]: duplex byte transports (Unix sockets, TCP, memory pipes)
//! - [`frame`]: incremental frame reader and flushing frame writer
//! - [`conn`]: connections that bind frames to transport lifecycle events

/// Re-export transport types.
pub mod transport {
    pub use streamframe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use streamframe_frame::*;
}

/// Re-export connection types.
pub mod conn {
    pub use streamframe_conn::*;
}
