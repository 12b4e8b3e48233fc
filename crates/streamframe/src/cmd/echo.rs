use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use streamframe_conn::{CloseReason, ConnectionHandler, ConnectionListener};
use streamframe_frame::{Disposition, MessageSink};

use crate::cmd::{Context, EchoArgs};
use crate::exit::{connection_error, CliResult, SUCCESS};
use crate::session::{flush_pending, install_ctrlc_handler, peer_label, pump, POLL_INTERVAL};

const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Queues every received payload for sending back.
///
/// Replies cannot be written from inside `on_frame`; the drive loop drains
/// the queue after each read.
#[derive(Debug, Default)]
struct EchoHandler {
    replies: VecDeque<Bytes>,
    closed: Option<CloseReason>,
}

impl MessageSink for EchoHandler {
    fn on_frame(&mut self, payload: Bytes) -> Disposition {
        self.replies.push_back(payload);
        Disposition::Accept
    }
}

impl ConnectionHandler for EchoHandler {
    fn on_closed(&mut self, reason: CloseReason) {
        self.closed = Some(reason);
    }
}

pub fn run(args: EchoArgs, ctx: &Context) -> CliResult<i32> {
    let listener = ConnectionListener::bind(&args.path)
        .map_err(|err| connection_error("bind failed", err))?
        .with_config(ctx.config.clone());

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    while running.load(Ordering::SeqCst) {
        let mut conn = listener
            .accept(EchoHandler::default())
            .map_err(|err| connection_error("accept failed", err))?;
        let peer = peer_label(conn.transport());
        tracing::info!(%peer, "client connected");

        while running.load(Ordering::SeqCst) && conn.is_open() {
            pump(&mut conn, POLL_INTERVAL)?;

            while let Some(payload) = conn.handler_mut().replies.pop_front() {
                if !conn.is_open() {
                    break;
                }
                tracing::info!(%peer, size = payload.len(), "echoing frame");
                if let Err(err) = conn.send_frame(&payload) {
                    tracing::warn!(%peer, error = %err, "echo send failed");
                }
            }

            if conn.is_open() {
                if let Err(err) = flush_pending(&mut conn, FLUSH_TIMEOUT) {
                    tracing::warn!(%peer, error = %err, "dropping client");
                    conn.close();
                }
            }
        }

        if conn.is_open() {
            conn.close();
        }
        if let Some(reason) = conn.handler().closed {
            tracing::info!(%peer, %reason, frames = conn.frames_received(), "client finished");
        }
    }

    Ok(SUCCESS)
}
