use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::Write;
use tracing::{info, warn};

use harp_message::{HarpLink, HarpMessage, MessageType, MockDevice, PayloadType};
use output_expander as oe;
use output_expander::{FilterMode, MessageStreamExt, RegisterCodec, RegisterId, ValueShape};

mod hlog;

#[derive(Parser, Debug)]
#[command(
    name = "oe",
    version,
    about = "Harp Output Expander register tool",
    disable_help_subcommand = true
)]
struct Cli {
    /// Codec config (YAML)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Print codec counters on exit
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum MessageTypeArg {
    Read,
    Write,
    Event,
}

impl MessageTypeArg {
    fn into_message_type(self) -> MessageType {
        match self {
            Self::Read => MessageType::Read,
            Self::Write => MessageType::Write,
            Self::Event => MessageType::Event,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the register map
    Registers {
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Build a message from a register value
    Encode {
        /// Register name (case-insensitive) or address
        #[arg(long)]
        register: String,
        /// Value text, e.g. "OUT0 | OUT3", "1500.5", "4096,200"
        #[arg(long)]
        value: String,
        #[arg(long, value_enum, default_value_t = MessageTypeArg::Write)]
        message_type: MessageTypeArg,
        /// Timestamp in seconds
        #[arg(long)]
        timestamp: Option<f64>,
        /// Append the message to an .hlog file
        #[arg(long)]
        to: Option<String>,
    },
    /// Decode a raw payload
    Decode {
        #[arg(long)]
        address: u16,
        /// Payload type name (U16, Float, ...) or raw code
        #[arg(long)]
        payload_type: String,
        /// Payload bytes as hex, e.g. "09 00" or 0900
        #[arg(long, num_args = 1..)]
        data: Vec<String>,
        #[arg(long, value_enum, default_value_t = MessageTypeArg::Event)]
        message_type: MessageTypeArg,
        #[arg(long)]
        timestamp: Option<f64>,
    },
    /// Print the messages of one register from an .hlog file
    Filter {
        #[arg(long)]
        from: String,
        #[arg(long)]
        register: String,
        /// Drop the register instead of keeping it
        #[arg(long, action = ArgAction::SetTrue)]
        exclude: bool,
        /// Print decoded values instead of raw messages
        #[arg(long, action = ArgAction::SetTrue)]
        decode: bool,
    },
    /// Summarize an .hlog file per register
    Group {
        #[arg(long)]
        from: String,
    },
    /// Write a value to the mock device and read it back
    Doctor {
        #[arg(long)]
        register: String,
        #[arg(long)]
        value: String,
        #[arg(long, default_value = "mock0")]
        device: String,
    },
}

#[derive(Serialize)]
struct RegisterRow {
    address: u16,
    name: &'static str,
    payload_type: &'static str,
    length: u8,
    access: &'static str,
    shape: String,
    description: &'static str,
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => oe::load_codec_config(path)?,
        None => oe::CodecConfig::default(),
    };
    let hub = oe::MetricsHub::new()?;
    let codec = RegisterCodec::new(config).with_metrics(hub.codec.clone());
    info!(validation = ?codec.config().validation, "codec ready");

    match cli.command {
        Commands::Registers { json } => list_registers(json)?,
        Commands::Encode {
            register,
            value,
            message_type,
            timestamp,
            to,
        } => encode_cmd(
            &codec,
            &register,
            &value,
            message_type.into_message_type(),
            timestamp,
            to.as_deref(),
        )?,
        Commands::Decode {
            address,
            payload_type,
            data,
            message_type,
            timestamp,
        } => decode_cmd(
            &codec,
            address,
            &payload_type,
            &data,
            message_type.into_message_type(),
            timestamp,
        )?,
        Commands::Filter {
            from,
            register,
            exclude,
            decode,
        } => filter_cmd(
            &codec,
            &from,
            &register,
            exclude,
            decode,
            &mut std::io::stdout().lock(),
        )?,
        Commands::Group { from } => group_cmd(&codec, &from, &mut std::io::stdout().lock())?,
        Commands::Doctor {
            register,
            value,
            device,
        } => doctor_cmd(&codec, &register, &value, &device)?,
    }

    if cli.metrics {
        print!("{}", hub.encode_text()?);
    }
    Ok(())
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn lookup_register(s: &str) -> Result<RegisterId> {
    let t = s.trim();
    let by_address = parse_u16(t).and_then(RegisterId::from_address);
    by_address
        .or_else(|| RegisterId::from_name(t))
        .ok_or_else(|| anyhow::anyhow!("unknown register: {t}"))
}

fn parse_u16(s: &str) -> Option<u16> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

fn shape_text(shape: ValueShape) -> String {
    match shape {
        ValueShape::Scalar => "scalar".to_string(),
        ValueShape::Flags(name) => format!("flags:{name}"),
        ValueShape::Enum(name) => format!("enum:{name}"),
        ValueShape::Composite(fields) => format!("composite:{}", fields.join(",")),
    }
}

fn list_registers(json: bool) -> Result<()> {
    if json {
        let rows: Vec<RegisterRow> = oe::REGISTERS
            .iter()
            .map(|d| RegisterRow {
                address: d.address,
                name: d.name,
                payload_type: d.payload_type().as_str(),
                length: d.length,
                access: d.access.as_str(),
                shape: shape_text(d.shape),
                description: d.description(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    println!("# {} (WhoAmI {})", oe::DEVICE_NAME, oe::WHO_AM_I);
    for d in oe::REGISTERS {
        let len = if d.length > 1 {
            format!("[{}]", d.length)
        } else {
            String::new()
        };
        println!(
            "{}\t{}\t{}{}\t{}\t{}",
            d.address,
            d.name,
            d.payload_type(),
            len,
            d.access.as_str(),
            shape_text(d.shape)
        );
    }
    Ok(())
}

fn build_message(
    codec: &RegisterCodec,
    register: &str,
    value: &str,
    message_type: MessageType,
    timestamp: Option<f64>,
) -> Result<HarpMessage> {
    let id = lookup_register(register)?;
    let value = oe::RegisterValue::parse_text(id, value)?;
    Ok(match timestamp {
        Some(ts) => codec.format_timestamped(ts, message_type, &value),
        None => codec.format(message_type, &value),
    })
}

fn encode_cmd(
    codec: &RegisterCodec,
    register: &str,
    value: &str,
    message_type: MessageType,
    timestamp: Option<f64>,
    to: Option<&str>,
) -> Result<()> {
    let msg = build_message(codec, register, value, message_type, timestamp)?;
    println!("{msg}");
    if let Some(path) = to {
        hlog::append_log(path, oe::DEVICE_NAME, std::slice::from_ref(&msg))?;
        info!(path, "appended message");
    }
    Ok(())
}

fn parse_data(items: &[String]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for tok in items.iter().flat_map(|s| s.split_whitespace()) {
        let t = tok.strip_prefix("0x").unwrap_or(tok);
        out.extend(hlog::parse_hex_compact(t).with_context(|| format!("invalid hex '{tok}'"))?);
    }
    Ok(out)
}

fn decode_cmd(
    codec: &RegisterCodec,
    address: u16,
    payload_type: &str,
    data: &[String],
    message_type: MessageType,
    timestamp: Option<f64>,
) -> Result<()> {
    let pt = PayloadType::parse(payload_type)
        .ok_or_else(|| anyhow::anyhow!("invalid payload type: {payload_type}"))?;
    let bytes = parse_data(data)?;
    let mut msg = HarpMessage::new(message_type, address, pt, bytes);
    msg.timestamp = timestamp;
    print_decoded(codec, &msg)
}

fn decoded_line(codec: &RegisterCodec, msg: &HarpMessage) -> Result<String> {
    let value = codec.parse(msg)?;
    Ok(match msg.timestamp {
        Some(ts) => format!("{ts:.6}\t{}\t{value}", msg.message_type),
        None => format!("{}\t{value}", msg.message_type),
    })
}

fn print_decoded(codec: &RegisterCodec, msg: &HarpMessage) -> Result<()> {
    println!("{}", decoded_line(codec, msg)?);
    Ok(())
}

fn filter_cmd(
    codec: &RegisterCodec,
    from: &str,
    register: &str,
    exclude: bool,
    decode: bool,
    out: &mut impl Write,
) -> Result<()> {
    let id = lookup_register(register)?;
    let mode = if exclude {
        FilterMode::Exclude
    } else {
        FilterMode::Include
    };
    let messages = hlog::read_log(from)?;
    for msg in messages.into_iter().filter_register(id, mode) {
        if !decode {
            writeln!(out, "{msg}")?;
            continue;
        }
        match decoded_line(codec, &msg) {
            Ok(line) => writeln!(out, "{line}")?,
            Err(e) => warn!(address = msg.address, "skipping: {e}"),
        }
    }
    Ok(())
}

fn group_cmd(codec: &RegisterCodec, from: &str, out: &mut impl Write) -> Result<()> {
    let messages = hlog::read_log(from)?;
    let total = messages.len();
    let groups = oe::group_by_register(messages);
    for group in groups.iter() {
        let last = group
            .messages
            .last()
            .and_then(|m| codec.parse(m).ok())
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{}\t{}\tcount={}\tlast={last}",
            group.register.address(),
            group.register,
            group.messages.len()
        )?;
    }
    writeln!(
        out,
        "total={total} registers={} unknown={}",
        groups.len(),
        groups.unknown().len()
    )?;
    Ok(())
}

fn doctor_cmd(codec: &RegisterCodec, register: &str, value: &str, device: &str) -> Result<()> {
    let msg = build_message(codec, register, value, MessageType::Write, None)?;
    println!("doctor: device={device} register={register}");
    let mut dev = MockDevice::open(device)?;
    println!("open: ok");
    dev.send(&msg)?;
    println!("write: ok ({} bytes)", msg.payload.len());
    let echo = dev.recv(Some(250))?;
    print!("echo: ");
    print_decoded(codec, &echo)?;

    dev.send(&HarpMessage::new(
        MessageType::Read,
        msg.address,
        msg.payload_type,
        Vec::new(),
    ))?;
    let reply = dev.recv(Some(250))?;
    if reply.is_error {
        return Err(anyhow::anyhow!("read: device returned an error"));
    }
    print!("read: ");
    print_decoded(codec, &reply)?;
    if reply.payload != msg.payload {
        return Err(anyhow::anyhow!("read-back mismatch"));
    }
    println!("doctor: done");
    Ok(())
}
