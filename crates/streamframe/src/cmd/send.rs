use std::fs;
use std::time::{Duration, Instant};

use bytes::Bytes;
use streamframe_conn::{connect_with_config, CloseReason};

use crate::cmd::{Context, SendArgs};
use crate::exit::{close_error, connection_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::print_frame;
use crate::session::{flush_pending, peer_label, pump, UnixConnection, POLL_INTERVAL};

pub fn run(args: SendArgs, ctx: &Context) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = resolve_payload(&args)?;

    let mut conn = connect_with_config(&args.path, Vec::<Bytes>::new(), ctx.config.clone())
        .map_err(|err| connection_error("connect failed", err))?;

    conn.send_frame(&payload)
        .map_err(|err| connection_error("send failed", err))?;
    flush_pending(&mut conn, wait_timeout)?;
    tracing::debug!(size = payload.len(), "frame sent");

    if args.wait {
        let reply = wait_for_reply(&mut conn, wait_timeout)?;
        print_frame(1, &reply, &peer_label(conn.transport()), ctx.format);
    }

    conn.close();
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), err)
        });
    }
    Err(CliError::new(USAGE, "one of --data or --file is required"))
}

fn wait_for_reply(conn: &mut UnixConnection<Vec<Bytes>>, timeout: Duration) -> CliResult<Bytes> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(reply) = first_reply(conn.handler(), conn.close_reason()) {
            return reply;
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(CliError::new(
                TIMEOUT,
                format!("no reply within {}ms", timeout.as_millis()),
            ));
        }
        pump(conn, (deadline - now).min(POLL_INTERVAL))?;
    }
}

// A frame that arrived together with the close still counts as the reply.
fn first_reply(received: &[Bytes], closed: Option<CloseReason>) -> Option<CliResult<Bytes>> {
    match (received.first(), closed) {
        (Some(frame), _) => Some(Ok(frame.clone())),
        (None, Some(reason)) => Some(Err(close_error("receive failed", reason))),
        (None, None) => None,
    }
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
