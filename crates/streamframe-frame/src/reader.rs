use bytes::{Bytes, BytesMut};
use tracing::{trace, warn};

use crate::codec::{read_length, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, MalformedReason, Result};
use crate::sink::{Disposition, MessageSink};

/// Upper bound on buffer space reserved up front for a frame body.
///
/// Larger bodies grow the buffer as their bytes actually arrive, so a peer
/// announcing a huge (but permitted) length cannot force an allocation it
/// never backs with data.
const MAX_BODY_PREALLOC: usize = 64 * 1024;

/// Which part of a frame the reader is accumulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Collecting the 4 length bytes.
    AwaitingHeader,
    /// Collecting `expected` payload bytes.
    AwaitingBody { expected: usize },
}

/// Incremental frame decoder.
///
/// Feed it whatever bytes the transport produced, in any fragmentation;
/// it hands each completed payload to a [`MessageSink`] and keeps partial
/// header and body bytes for the next call. It never blocks and never
/// touches the transport itself.
#[derive(Debug)]
pub struct FrameReader {
    state: ParseState,
    header: [u8; HEADER_SIZE],
    header_len: usize,
    body: BytesMut,
    config: FrameConfig,
    closed: bool,
    frames_decoded: u64,
}

impl FrameReader {
    /// Create a new frame reader with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            state: ParseState::AwaitingHeader,
            header: [0; HEADER_SIZE],
            header_len: 0,
            body: BytesMut::new(),
            config,
            closed: false,
            frames_decoded: 0,
        }
    }

    /// Parse `input`, delivering every completed payload to `sink`.
    ///
    /// Returns the number of frames the sink accepted. Stops at the first
    /// rejected payload or oversized length with `MalformedFrame`; bytes
    /// after that point are not parsed and the reader is closed. Calls on a
    /// closed reader fail with `ConnectionClosed`.
    pub fn consume<S>(&mut self, mut input: &[u8], sink: &mut S) -> Result<usize>
    where
        S: MessageSink + ?Sized,
    {
        if self.closed {
            return Err(FrameError::ConnectionClosed);
        }

        let mut delivered = 0usize;
        loop {
            match self.state {
                ParseState::AwaitingHeader => {
                    let take = (HEADER_SIZE - self.header_len).min(input.len());
                    self.header[self.header_len..self.header_len + take]
                        .copy_from_slice(&input[..take]);
                    self.header_len += take;
                    input = &input[take..];

                    if self.header_len < HEADER_SIZE {
                        return Ok(delivered);
                    }

                    let expected = read_length(&self.header);
                    let max = self.config.effective_max_payload();
                    if expected > max {
                        warn!(declared = expected, max, "refusing oversized frame");
                        self.fail();
                        return Err(FrameError::MalformedFrame(
                            MalformedReason::LengthExceeded {
                                declared: expected,
                                max,
                            },
                        ));
                    }

                    self.header_len = 0;
                    self.body.reserve(expected.min(MAX_BODY_PREALLOC));
                    self.state = ParseState::AwaitingBody { expected };
                }
                ParseState::AwaitingBody { expected } => {
                    let take = (expected - self.body.len()).min(input.len());
                    self.body.extend_from_slice(&input[..take]);
                    input = &input[take..];

                    if self.body.len() < expected {
                        return Ok(delivered);
                    }

                    let payload = self.body.split().freeze();
                    trace!(size = payload.len(), "decoded frame");

                    match sink.on_frame(payload) {
                        Disposition::Accept => {
                            self.state = ParseState::AwaitingHeader;
                            self.frames_decoded += 1;
                            delivered += 1;
                        }
                        Disposition::Reject => {
                            warn!(size = expected, "message sink rejected frame");
                            self.fail();
                            return Err(FrameError::MalformedFrame(MalformedReason::Rejected));
                        }
                    }
                }
            }
        }
    }

    /// Parse `input` and return every completed payload.
    ///
    /// Convenience over [`consume`](Self::consume) with a sink that accepts
    /// everything; only an oversized length can fail.
    pub fn consume_all(&mut self, input: &[u8]) -> Result<Vec<Bytes>> {
        let mut frames = Vec::new();
        self.consume(input, &mut frames)?;
        Ok(frames)
    }

    /// Drop any partial frame and wait for a fresh header.
    ///
    /// A closed reader stays closed.
    pub fn reset(&mut self) {
        self.state = ParseState::AwaitingHeader;
        self.header_len = 0;
        self.body.clear();
    }

    /// Discard partial state and refuse all further input.
    pub fn close(&mut self) {
        self.reset();
        self.body = BytesMut::new();
        self.closed = true;
    }

    /// Current parse state.
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Bytes held for the frame in progress (header or body).
    pub fn buffered_len(&self) -> usize {
        match self.state {
            ParseState::AwaitingHeader => self.header_len,
            ParseState::AwaitingBody { .. } => self.body.len(),
        }
    }

    /// Whether the reader refuses further input.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Frames accepted by a sink since creation.
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// Update maximum payload size for subsequent headers.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    // Header scratch is cleared; the owner closes the connection.
    fn fail(&mut self) {
        self.header_len = 0;
        self.closed = true;
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::codec::encode_frame;

    fn wire(payloads: &[&[u8]]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for payload in payloads {
            encode_frame(payload, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn ping_split_three_and_five() {
        let bytes = [0x00, 0x00, 0x00, 0x04, 0x50, 0x49, 0x4E, 0x47];
        let mut reader = FrameReader::new();

        assert!(reader.consume_all(&bytes[..3]).unwrap().is_empty());
        assert_eq!(reader.state(), ParseState::AwaitingHeader);
        assert_eq!(reader.buffered_len(), 3);

        let frames = reader.consume_all(&bytes[3..]).unwrap();
        assert_eq!(frames, vec![Bytes::from_static(b"PING")]);
        assert_eq!(reader.state(), ParseState::AwaitingHeader);
        assert_eq!(reader.buffered_len(), 0);
    }

    #[test]
    fn header_resumes_one_byte_at_a_time() {
        let bytes = wire(&[b"slow"]);
        let mut reader = FrameReader::new();
        let mut frames = Vec::new();

        for byte in &bytes {
            reader.consume(std::slice::from_ref(byte), &mut frames).unwrap();
        }

        assert_eq!(frames, vec![Bytes::from_static(b"slow")]);
    }

    #[test]
    fn every_two_way_split_yields_the_same_frame() {
        let bytes = wire(&[b"fragmented payload"]);

        for split in 1..bytes.len() {
            let mut reader = FrameReader::new();
            let mut frames = reader.consume_all(&bytes[..split]).unwrap();
            frames.extend(reader.consume_all(&bytes[split..]).unwrap());
            assert_eq!(
                frames,
                vec![Bytes::from_static(b"fragmented payload")],
                "split at {split}"
            );
        }
    }

    #[test]
    fn batch_of_frames_decodes_in_order() {
        let bytes = wire(&[b"one", b"", b"three", b"four"]);
        let mut reader = FrameReader::new();

        let frames = reader.consume_all(&bytes).unwrap();

        assert_eq!(
            frames,
            vec![
                Bytes::from_static(b"one"),
                Bytes::new(),
                Bytes::from_static(b"three"),
                Bytes::from_static(b"four"),
            ]
        );
        assert_eq!(reader.frames_decoded(), 4);
    }

    #[test]
    fn zero_length_frame_emitted_from_header_alone() {
        let mut reader = FrameReader::new();
        let frames = reader.consume_all(&[0, 0, 0, 0]).unwrap();
        assert_eq!(frames, vec![Bytes::new()]);
    }

    #[test]
    fn partial_body_is_kept_between_calls() {
        let bytes = wire(&[b"hello world"]);
        let mut reader = FrameReader::new();

        assert!(reader.consume_all(&bytes[..7]).unwrap().is_empty());
        assert_eq!(reader.state(), ParseState::AwaitingBody { expected: 11 });
        assert_eq!(reader.buffered_len(), 3);

        assert!(reader.consume_all(&bytes[7..10]).unwrap().is_empty());
        assert_eq!(reader.buffered_len(), 6);

        let frames = reader.consume_all(&bytes[10..]).unwrap();
        assert_eq!(frames, vec![Bytes::from_static(b"hello world")]);
    }

    #[test]
    fn rejection_stops_before_queued_frames() {
        let bytes = wire(&[b"good", b"bad", b"never"]);
        let mut reader = FrameReader::new();
        let mut seen = Vec::new();

        let mut sink = |payload: Bytes| {
            let verdict = Disposition::from_bool(payload.as_ref() != b"bad");
            seen.push(payload);
            verdict
        };
        let err = reader.consume(&bytes, &mut sink).unwrap_err();

        assert!(matches!(
            err,
            FrameError::MalformedFrame(MalformedReason::Rejected)
        ));
        assert_eq!(
            seen,
            vec![Bytes::from_static(b"good"), Bytes::from_static(b"bad")]
        );
        assert!(reader.is_closed());
        assert_eq!(reader.frames_decoded(), 1);
    }

    #[test]
    fn closed_reader_refuses_input() {
        let mut reader = FrameReader::new();
        let mut reject = |_: Bytes| Disposition::Reject;
        let _ = reader.consume(&wire(&[b"x"]), &mut reject);

        let err = reader.consume_all(&wire(&[b"y"])).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn oversized_length_rejected_before_buffering() {
        let mut header = BytesMut::new();
        header.put_u32(1024);
        header.put_slice(b"body bytes that must not be buffered");

        let mut reader = FrameReader::with_config(FrameConfig::with_max_payload(16));
        let err = reader.consume_all(&header).unwrap_err();

        assert!(matches!(
            err,
            FrameError::MalformedFrame(MalformedReason::LengthExceeded {
                declared: 1024,
                max: 16
            })
        ));
        assert_eq!(reader.buffered_len(), 0);
        assert!(reader.is_closed());
    }

    #[test]
    fn refused_header_leaves_nothing_buffered() {
        let mut reader = FrameReader::with_config(FrameConfig::with_max_payload(16));
        let mut frames = Vec::new();

        let err = reader.consume(&[0x00, 0x00, 0x04, 0x00], &mut frames).unwrap_err();

        assert!(matches!(
            err,
            FrameError::MalformedFrame(MalformedReason::LengthExceeded {
                declared: 1024,
                max: 16
            })
        ));
        assert!(frames.is_empty());
        assert_eq!(reader.state(), ParseState::AwaitingHeader);
        assert_eq!(reader.buffered_len(), 0);
    }

    #[test]
    fn frame_at_exact_limit_is_accepted() {
        let payload = vec![7u8; 16];
        let mut reader = FrameReader::with_config(FrameConfig::with_max_payload(16));
        let frames = reader.consume_all(&wire(&[payload.as_slice()])).unwrap();
        assert_eq!(frames[0].as_ref(), payload.as_slice());
    }

    #[test]
    fn large_payload_in_small_chunks() {
        let payload = vec![0xAB; 64 * 1024 + 17];
        let bytes = wire(&[payload.as_slice()]);
        let mut reader = FrameReader::new();
        let mut frames = Vec::new();

        for chunk in bytes.chunks(1000) {
            reader.consume(chunk, &mut frames).unwrap();
            if let ParseState::AwaitingBody { expected } = reader.state() {
                assert!(reader.buffered_len() <= expected);
            }
        }

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), payload.as_slice());
    }

    #[test]
    fn reset_discards_partial_frame() {
        let bytes = wire(&[b"abandoned"]);
        let mut reader = FrameReader::new();
        reader.consume_all(&bytes[..6]).unwrap();

        reader.reset();
        assert_eq!(reader.state(), ParseState::AwaitingHeader);
        assert_eq!(reader.buffered_len(), 0);

        let frames = reader.consume_all(&wire(&[b"fresh"])).unwrap();
        assert_eq!(frames, vec![Bytes::from_static(b"fresh")]);
    }

    #[test]
    fn close_drops_partial_frame() {
        let bytes = wire(&[b"partial"]);
        let mut reader = FrameReader::new();
        reader.consume_all(&bytes[..8]).unwrap();

        reader.close();

        assert_eq!(reader.buffered_len(), 0);
        assert!(matches!(
            reader.consume_all(&bytes[8..]),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn raised_limit_applies_to_next_header() {
        let payload = vec![1u8; 32];
        let mut reader = FrameReader::with_config(FrameConfig::with_max_payload(8));
        reader.set_max_payload_size(64);
        assert_eq!(reader.config().max_payload_size, 64);

        let frames = reader.consume_all(&wire(&[payload.as_slice()])).unwrap();
        assert_eq!(frames.len(), 1);
    }
}
