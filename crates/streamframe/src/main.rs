mod cmd;
mod exit;
mod logging;
mod output;
mod session;

use clap::Parser;
use streamframe_conn::ConnectionConfig;
use streamframe_frame::{FrameConfig, DEFAULT_MAX_PAYLOAD};

use crate::cmd::{Command, Context};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "streamframe", version, about = "Length-prefixed framing CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Largest payload accepted or sent, in bytes.
    #[arg(
        long,
        value_name = "BYTES",
        env = "STREAMFRAME_MAX_FRAME_SIZE",
        default_value_t = DEFAULT_MAX_PAYLOAD,
        global = true
    )]
    max_frame_size: usize,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let ctx = Context {
        format: cli.format.unwrap_or_else(OutputFormat::default_for_stdout),
        config: ConnectionConfig {
            frame: FrameConfig::with_max_payload(cli.max_frame_size),
            ..ConnectionConfig::default()
        },
    };

    match cmd::run(cli.command, &ctx) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "streamframe",
            "send",
            "/tmp/test.sock",
            "--data",
            "hello",
        ])
        .expect("send args should parse");

        assert!(matches!(cli.command, Command::Send(_)));
        assert_eq!(cli.max_frame_size, DEFAULT_MAX_PAYLOAD);
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "streamframe",
            "send",
            "/tmp/test.sock",
            "--file",
            "/tmp/payload.bin",
            "--data",
            "hello",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn send_requires_a_payload() {
        let err = Cli::try_parse_from(["streamframe", "send", "/tmp/test.sock"])
            .expect_err("missing payload should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn max_frame_size_is_global() {
        let cli = Cli::try_parse_from([
            "streamframe",
            "listen",
            "/tmp/test.sock",
            "--max-frame-size",
            "1024",
            "--count",
            "2",
        ])
        .expect("listen args should parse");

        assert_eq!(cli.max_frame_size, 1024);
        match cli.command {
            Command::Listen(args) => assert_eq!(args.count, Some(2)),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
