//! Blocking drive loop for framed Unix socket connections.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use streamframe_conn::{Connection, ConnectionHandler};
use streamframe_transport::UnixStreamTransport;

use crate::exit::{connection_error, transport_error, CliError, CliResult, INTERNAL, TIMEOUT};

pub type UnixConnection<H> = Connection<UnixStreamTransport, H>;

/// Upper bound on a single readiness wait, so shutdown flags are noticed.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

const FLUSH_BACKOFF: Duration = Duration::from_millis(5);

/// Wait up to `timeout` for input, then deliver whatever arrived.
///
/// Returns the number of frames the handler accepted.
pub fn pump<H: ConnectionHandler>(conn: &mut UnixConnection<H>, timeout: Duration) -> CliResult<usize> {
    let readable = conn
        .transport()
        .poll_readable(Some(timeout))
        .map_err(|err| transport_error("poll failed", err))?;
    if !readable {
        return Ok(0);
    }
    conn.on_readable()
        .map_err(|err| connection_error("receive failed", err))
}

/// Push queued frame bytes until the socket has taken all of them.
pub fn flush_pending<H: ConnectionHandler>(
    conn: &mut UnixConnection<H>,
    timeout: Duration,
) -> CliResult<()> {
    let deadline = Instant::now() + timeout;
    while conn.has_pending_writes() {
        conn.poll_flush()
            .map_err(|err| connection_error("flush failed", err))?;
        if !conn.has_pending_writes() {
            break;
        }
        if Instant::now() >= deadline {
            return Err(CliError::new(TIMEOUT, "flush timed out"));
        }
        thread::sleep(FLUSH_BACKOFF);
    }
    Ok(())
}

/// Short label for the remote end of an accepted or dialed socket.
pub fn peer_label(transport: &UnixStreamTransport) -> String {
    match transport.peer_credentials() {
        Some((_uid, _gid, pid)) => format!("pid:{pid}"),
        None => "unknown".to_string(),
    }
}

pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
