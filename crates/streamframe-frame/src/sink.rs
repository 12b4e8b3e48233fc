use bytes::Bytes;

/// A message sink's verdict on a decoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Keep parsing.
    Accept,
    /// Treat the frame as malformed; the connection will be closed.
    Reject,
}

impl Disposition {
    /// `Accept` when `ok` is true, `Reject` otherwise.
    pub fn from_bool(ok: bool) -> Self {
        if ok {
            Disposition::Accept
        } else {
            Disposition::Reject
        }
    }
}

/// Consumer of decoded frame payloads.
pub trait MessageSink {
    /// Called once per complete frame, in wire order.
    fn on_frame(&mut self, payload: Bytes) -> Disposition;
}

impl<F> MessageSink for F
where
    F: FnMut(Bytes) -> Disposition,
{
    fn on_frame(&mut self, payload: Bytes) -> Disposition {
        self(payload)
    }
}

/// Collects every payload and never rejects.
impl MessageSink for Vec<Bytes> {
    fn on_frame(&mut self, payload: Bytes) -> Disposition {
        self.push(payload);
        Disposition::Accept
    }
}
