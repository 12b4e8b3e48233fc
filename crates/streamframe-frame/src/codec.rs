use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, MalformedReason, Result};

/// Frame header: a single big-endian `u32` payload length.
pub const HEADER_SIZE: usize = 4;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Largest payload the 4-byte length field can describe.
pub const MAX_REPRESENTABLE_PAYLOAD: usize = u32::MAX as usize;

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────┬──────────────────┐
/// │ Length (4B, BE)  │ Payload          │
/// │                  │ (Length bytes)   │
/// └──────────────────┴──────────────────┘
/// ```
///
/// Fails with `OversizedPayload` if the length does not fit in 32 bits;
/// `dst` is left untouched in that case.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::OversizedPayload {
        size: payload.len(),
        max: MAX_REPRESENTABLE_PAYLOAD,
    })?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u32(len);
    dst.put_slice(payload);
    Ok(())
}

/// Decode one frame from the front of a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. An announced length
/// above `max_payload` is refused as soon as the header is visible.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let payload_len = read_length(&src[..HEADER_SIZE]);
    if payload_len > max_payload {
        return Err(FrameError::MalformedFrame(
            MalformedReason::LengthExceeded {
                declared: payload_len,
                max: max_payload,
            },
        ));
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    Ok(Some(src.split_to(payload_len).freeze()))
}

/// Parse a length field. `header` must hold exactly [`HEADER_SIZE`] bytes.
pub(crate) fn read_length(header: &[u8]) -> usize {
    let mut raw = [0u8; HEADER_SIZE];
    raw.copy_from_slice(header);
    u32::from_be_bytes(raw) as usize
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes, for both directions. Default: 16 MiB.
    ///
    /// Values above `u32::MAX` behave as `u32::MAX`.
    pub max_payload_size: usize,
}

impl FrameConfig {
    /// Configuration with an explicit payload bound.
    pub fn with_max_payload(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }

    /// The payload bound actually enforced.
    pub fn effective_max_payload(&self) -> usize {
        self.max_payload_size.min(MAX_REPRESENTABLE_PAYLOAD)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_encodes_to_known_bytes() {
        let mut buf = BytesMut::new();
        encode_frame(b"PING", &mut buf).unwrap();
        assert_eq!(
            buf.as_ref(),
            &[0x00, 0x00, 0x00, 0x04, 0x50, 0x49, 0x4E, 0x47]
        );
    }

    #[test]
    fn empty_payload_is_a_bare_header() {
        let mut buf = BytesMut::new();
        encode_frame(b"", &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0, 0, 0, 0]);

        let payload = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert!(payload.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_waits_for_header_and_body() {
        let mut wire = BytesMut::new();
        encode_frame(b"hello", &mut wire).unwrap();

        let mut partial = BytesMut::from(&wire[..3]);
        assert!(decode_frame(&mut partial, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .is_none());

        let mut partial = BytesMut::from(&wire[..HEADER_SIZE + 2]);
        assert!(decode_frame(&mut partial, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .is_none());
        assert_eq!(partial.len(), HEADER_SIZE + 2);
    }

    #[test]
    fn decode_refuses_oversized_length_from_header_alone() {
        let mut buf = BytesMut::new();
        buf.put_u32(1024);

        let err = decode_frame(&mut buf, 16).unwrap_err();
        assert!(matches!(
            err,
            FrameError::MalformedFrame(MalformedReason::LengthExceeded {
                declared: 1024,
                max: 16
            })
        ));
    }

    #[test]
    fn decode_consumes_frames_in_order() {
        let mut buf = BytesMut::new();
        encode_frame(b"first", &mut buf).unwrap();
        encode_frame(b"second", &mut buf).unwrap();

        let f1 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        let f2 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();

        assert_eq!(f1.as_ref(), b"first");
        assert_eq!(f2.as_ref(), b"second");
        assert!(buf.is_empty());
    }

    #[test]
    fn effective_max_is_clamped_to_length_field() {
        let cfg = FrameConfig::with_max_payload(usize::MAX);
        assert_eq!(cfg.effective_max_payload(), MAX_REPRESENTABLE_PAYLOAD);
        assert_eq!(
            FrameConfig::default().effective_max_payload(),
            DEFAULT_MAX_PAYLOAD
        );
    }
}
