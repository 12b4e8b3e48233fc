use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One received frame, as reported on stdout.
#[derive(Debug, Serialize)]
pub struct FrameRecord<'a> {
    pub sequence: u64,
    pub payload_size: usize,
    pub payload: String,
    pub peer: &'a str,
    pub timestamp: String,
}

impl<'a> FrameRecord<'a> {
    pub fn new(sequence: u64, payload: &[u8], peer: &'a str) -> Self {
        Self {
            sequence,
            payload_size: payload.len(),
            payload: payload_preview(payload),
            peer,
            timestamp: now_unix_seconds(),
        }
    }
}

pub fn print_frame(sequence: u64, payload: &[u8], peer: &str, format: OutputFormat) {
    let record = FrameRecord::new(sequence, payload, peer);
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&record).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "SIZE", "PEER", "PAYLOAD"])
                .add_row(vec![
                    record.sequence.to_string(),
                    record.payload_size.to_string(),
                    record.peer.to_string(),
                    record.payload,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "#{} size={} peer={} payload={}",
                record.sequence, record.payload_size, record.peer, record.payload
            );
        }
        OutputFormat::Raw => print_raw(payload),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
