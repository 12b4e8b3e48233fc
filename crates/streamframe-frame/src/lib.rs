//! Incremental length-prefixed message framing.
//!
//! Turns a partial-delivery byte stream into discrete messages and back.
//! Every message on the wire is:
//! - A 4-byte big-endian payload length
//! - Exactly that many payload bytes
//!
//! There is no magic number, checksum or version byte. [`FrameReader`]
//! accepts bytes in any fragmentation (including one byte at a time, even
//! inside the length field) and hands complete payloads to a
//! [`MessageSink`]. [`FrameWriter`] encodes, writes and flushes.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod reader;
pub mod sink;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::FrameCodec;
pub use codec::{
    decode_frame, encode_frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE,
    MAX_REPRESENTABLE_PAYLOAD,
};
pub use error::{FrameError, MalformedReason, Result};
pub use reader::{FrameReader, ParseState};
pub use sink::{Disposition, MessageSink};
pub use writer::FrameWriter;
