//! `.hlog` message logs: one JSON header line, then one JSON record per message.

use anyhow::{Context, Result};
use harp_message::{HarpMessage, MessageType, PayloadType};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::error;

#[derive(Debug, Serialize, Deserialize)]
pub struct HlogHeader {
    pub format: String,
    pub version: u32,
    pub device: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HlogRecord {
    #[serde(rename = "type")]
    pub message_type: String,
    pub address: u16,
    pub port: u8,
    pub payload_type: String,
    #[serde(default)]
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ts: Option<f64>,
    pub data: String,
}

pub fn header_line(device: &str) -> String {
    let created = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .ok();
    let header = HlogHeader {
        format: "hlog".to_string(),
        version: 1,
        device: device.to_string(),
        created,
    };
    serde_json::to_string(&header).unwrap_or_else(|_| "{}".to_string())
}

pub fn record_line(m: &HarpMessage) -> String {
    let mut data = String::with_capacity(m.payload.len() * 2);
    for b in &m.payload {
        let _ = core::fmt::Write::write_fmt(&mut data, format_args!("{b:02X}"));
    }
    let rec = HlogRecord {
        message_type: m.message_type.as_str().to_string(),
        address: m.address,
        port: m.port,
        payload_type: m.payload_type.as_str().to_string(),
        error: m.is_error,
        ts: m.timestamp,
        data,
    };
    serde_json::to_string(&rec).unwrap_or_else(|_| "{}".to_string())
}

pub fn parse_hex_compact(s: &str) -> Result<Vec<u8>> {
    let t = s.trim();
    if t.len() % 2 != 0 || !t.is_ascii() {
        return Err(anyhow::anyhow!("odd hex length"));
    }
    (0..t.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&t[i..i + 2], 16).map_err(|e| anyhow::anyhow!("invalid hex: {e}"))
        })
        .collect()
}

pub fn parse_message_type(s: &str) -> Option<MessageType> {
    match s.trim().to_ascii_lowercase().as_str() {
        "read" => Some(MessageType::Read),
        "write" => Some(MessageType::Write),
        "event" => Some(MessageType::Event),
        _ => None,
    }
}

pub fn record_to_message(rec: &HlogRecord) -> Result<HarpMessage> {
    let message_type = parse_message_type(&rec.message_type)
        .ok_or_else(|| anyhow::anyhow!("bad message type: {}", rec.message_type))?;
    let payload_type = PayloadType::parse(&rec.payload_type)
        .ok_or_else(|| anyhow::anyhow!("bad payload type: {}", rec.payload_type))?;
    let payload = parse_hex_compact(&rec.data)?;
    let mut m = HarpMessage::new(message_type, rec.address, payload_type, payload)
        .with_port(rec.port)
        .with_error(rec.error);
    m.timestamp = rec.ts;
    Ok(m)
}

/// Read every message from a log. Bad records are logged and skipped.
pub fn read_log(path: &str) -> Result<Vec<HarpMessage>> {
    let file = File::open(path).with_context(|| format!("opening log: {path}"))?;
    let mut reader = BufReader::new(file);
    let mut first = String::new();
    reader.read_line(&mut first)?;
    let header: HlogHeader = serde_json::from_str(&first)
        .with_context(|| format!("invalid hlog header in {path}"))?;
    if header.format != "hlog" {
        return Err(anyhow::anyhow!("not an hlog file: format={}", header.format));
    }

    let mut out = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let rec: HlogRecord = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                error!(line = n + 2, "bad record: {e}");
                continue;
            }
        };
        match record_to_message(&rec) {
            Ok(m) => out.push(m),
            Err(e) => error!(line = n + 2, "bad record: {e}"),
        }
    }
    Ok(out)
}

/// Append messages to a log, writing the header first if the file is new.
pub fn append_log(path: &str, device: &str, messages: &[HarpMessage]) -> Result<()> {
    let is_new = !Path::new(path).exists();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log: {path}"))?;
    if is_new {
        writeln!(file, "{}", header_line(device))?;
    }
    for m in messages {
        writeln!(file, "{}", record_line(m))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trip() {
        let m = HarpMessage::new(MessageType::Write, 35, PayloadType::U16, vec![0x09, 0x00])
            .with_timestamp(1.5);
        let line = record_line(&m);
        assert!(line.contains("\"type\":\"write\""));
        assert!(line.contains("\"data\":\"0900\""));
        let rec: HlogRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(record_to_message(&rec).unwrap(), m);
    }

    #[test]
    fn timestamp_is_omitted_when_absent() {
        let m = HarpMessage::new(MessageType::Read, 90, PayloadType::U16, vec![]);
        assert!(!record_line(&m).contains("\"ts\""));
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(parse_hex_compact("00ff10").unwrap(), vec![0x00, 0xFF, 0x10]);
        assert!(parse_hex_compact("abc").is_err());
        assert!(parse_hex_compact("zz").is_err());
        assert!(parse_hex_compact("").unwrap().is_empty());
    }

    #[test]
    fn append_then_read_skips_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.hlog");
        let path = path.to_str().unwrap();
        let a = HarpMessage::new(MessageType::Event, 32, PayloadType::U8, vec![0x01]);
        let b = HarpMessage::new(MessageType::Write, 42, PayloadType::Float, vec![0, 0, 0, 0x3F]);
        append_log(path, "OutputExpander", &[a.clone()]).unwrap();
        {
            let mut f = OpenOptions::new().append(true).open(path).unwrap();
            writeln!(f, "not json").unwrap();
        }
        append_log(path, "OutputExpander", &[b.clone()]).unwrap();

        let messages = read_log(path).unwrap();
        assert_eq!(messages, vec![a, b]);
    }

    #[test]
    fn rejects_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.log");
        std::fs::write(&path, "{\"format\":\"srlog\",\"version\":1,\"device\":\"x\"}\n").unwrap();
        assert!(read_log(path.to_str().unwrap()).is_err());
    }
}
