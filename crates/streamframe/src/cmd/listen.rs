use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use streamframe_conn::{CloseReason, ConnectionHandler, ConnectionListener};
use streamframe_frame::{Disposition, MessageSink};

use crate::cmd::{Context, ListenArgs};
use crate::exit::{connection_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};
use crate::session::{install_ctrlc_handler, peer_label, pump, POLL_INTERVAL};

/// Prints frames as they are decoded, up to an optional limit.
#[derive(Debug)]
struct Printer {
    format: OutputFormat,
    peer: String,
    next_sequence: u64,
    remaining: Option<usize>,
}

impl Printer {
    fn new(format: OutputFormat, next_sequence: u64, remaining: Option<usize>) -> Self {
        Self {
            format,
            peer: "unknown".to_string(),
            next_sequence,
            remaining,
        }
    }

    fn is_done(&self) -> bool {
        self.remaining == Some(0)
    }
}

impl MessageSink for Printer {
    fn on_frame(&mut self, payload: Bytes) -> Disposition {
        if self.is_done() {
            return Disposition::Accept;
        }
        self.next_sequence += 1;
        print_frame(self.next_sequence, &payload, &self.peer, self.format);
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        Disposition::Accept
    }
}

impl ConnectionHandler for Printer {
    fn on_closed(&mut self, reason: CloseReason) {
        tracing::debug!(peer = %self.peer, %reason, "listener connection closed");
    }
}

pub fn run(args: ListenArgs, ctx: &Context) -> CliResult<i32> {
    let listener = ConnectionListener::bind(&args.path)
        .map_err(|err| connection_error("bind failed", err))?
        .with_config(ctx.config.clone());

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut sequence = 0u64;
    let mut remaining = args.count;

    while running.load(Ordering::SeqCst) {
        let mut conn = listener
            .accept(Printer::new(ctx.format, sequence, remaining))
            .map_err(|err| connection_error("accept failed", err))?;
        conn.handler_mut().peer = peer_label(conn.transport());

        while running.load(Ordering::SeqCst) && conn.is_open() && !conn.handler().is_done() {
            pump(&mut conn, POLL_INTERVAL)?;
        }

        sequence = conn.handler().next_sequence;
        remaining = conn.handler().remaining;
        if conn.handler().is_done() {
            conn.close();
            return Ok(SUCCESS);
        }
    }

    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printer_stops_counting_at_limit() {
        let mut printer = Printer::new(OutputFormat::Pretty, 0, Some(2));

        printer.on_frame(Bytes::from_static(b"one"));
        assert!(!printer.is_done());
        printer.on_frame(Bytes::from_static(b"two"));
        assert!(printer.is_done());
        printer.on_frame(Bytes::from_static(b"three"));

        assert_eq!(printer.next_sequence, 2);
        assert_eq!(printer.remaining, Some(0));
    }

    #[test]
    fn unlimited_printer_never_finishes() {
        let mut printer = Printer::new(OutputFormat::Pretty, 5, None);
        printer.on_frame(Bytes::new());
        assert!(!printer.is_done());
        assert_eq!(printer.next_sequence, 6);
    }
}
