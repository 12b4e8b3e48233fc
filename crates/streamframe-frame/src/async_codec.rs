//! `tokio_util` codec speaking the same wire format.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::codec::{decode_frame, encode_frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Length-prefixed frame codec for use with `tokio_util::codec::Framed`.
///
/// Decoding refuses oversized lengths as soon as the header is visible,
/// exactly like [`FrameReader`](crate::FrameReader).
#[derive(Debug, Clone, Default)]
pub struct FrameCodec {
    config: FrameConfig,
}

impl FrameCodec {
    /// Codec with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self { config }
    }

    /// Current codec configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn check_outgoing(&self, len: usize) -> Result<()> {
        let max = self.config.effective_max_payload();
        if len > max {
            return Err(FrameError::OversizedPayload { size: len, max });
        }
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        let frame = decode_frame(src, self.config.effective_max_payload())?;
        if let Some(payload) = &frame {
            trace!(size = payload.len(), "decoded frame");
        }
        Ok(frame)
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        self.check_outgoing(item.len())?;
        encode_frame(&item, dst)
    }
}

impl Encoder<&[u8]> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<()> {
        self.check_outgoing(item.len())?;
        encode_frame(item, dst)
    }
}
