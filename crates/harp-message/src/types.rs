use core::fmt;

/// Port stamped on messages addressed to the device itself.
pub const DEFAULT_PORT: u8 = 0xFF;

/// Harp message direction / intent
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Read = 1,
    Write = 2,
    Event = 3,
}

impl MessageType {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Read),
            2 => Some(Self::Write),
            3 => Some(Self::Event),
            _ => None,
        }
    }

    pub fn raw(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload element tag. The low nibble is the element width in bytes,
/// `0x80` marks signed integers and `0x40` marks floating point.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum PayloadType {
    U8 = 0x01,
    S8 = 0x81,
    U16 = 0x02,
    S16 = 0x82,
    U32 = 0x04,
    S32 = 0x84,
    U64 = 0x08,
    S64 = 0x88,
    Float = 0x44,
}

impl PayloadType {
    pub const ALL: [PayloadType; 9] = [
        Self::U8,
        Self::S8,
        Self::U16,
        Self::S16,
        Self::U32,
        Self::S32,
        Self::U64,
        Self::S64,
        Self::Float,
    ];

    pub fn from_raw(raw: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.raw() == raw)
    }

    pub fn raw(self) -> u8 {
        self as u8
    }

    /// Element size in bytes
    pub fn width(self) -> usize {
        usize::from(self.raw() & 0x0F)
    }

    pub fn is_signed(self) -> bool {
        self.raw() & 0x80 != 0
    }

    pub fn is_float(self) -> bool {
        self.raw() & 0x40 != 0
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::U8 => "U8",
            Self::S8 => "S8",
            Self::U16 => "U16",
            Self::S16 => "S16",
            Self::U32 => "U32",
            Self::S32 => "S32",
            Self::U64 => "U64",
            Self::S64 => "S64",
            Self::Float => "Float",
        }
    }

    /// Parse a tag by name (case-insensitive) or numeric value.
    pub fn parse(s: &str) -> Option<Self> {
        let t = s.trim();
        if let Some(found) = Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(t))
        {
            return Some(found);
        }
        let raw = match t.strip_prefix("0x") {
            Some(hex) => u8::from_str_radix(hex, 16).ok()?,
            None => t.parse::<u8>().ok()?,
        };
        Self::from_raw(raw)
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded Harp message. Byte-level framing and checksums are handled
/// by whatever produced this value; only the structural fields live here.
#[derive(Clone, Debug, PartialEq)]
pub struct HarpMessage {
    pub message_type: MessageType,
    pub address: u16,
    pub port: u8,
    pub payload_type: PayloadType,
    pub is_error: bool,
    /// Seconds, as carried by timestamped messages
    pub timestamp: Option<f64>,
    pub payload: Vec<u8>,
}

impl HarpMessage {
    pub fn new(
        message_type: MessageType,
        address: u16,
        payload_type: PayloadType,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            message_type,
            address,
            port: DEFAULT_PORT,
            payload_type,
            is_error: false,
            timestamp: None,
            payload,
        }
    }

    pub fn timestamped(
        timestamp: f64,
        message_type: MessageType,
        address: u16,
        payload_type: PayloadType,
        payload: Vec<u8>,
    ) -> Self {
        Self::new(message_type, address, payload_type, payload).with_timestamp(timestamp)
    }

    pub fn with_timestamp(mut self, seconds: f64) -> Self {
        self.timestamp = Some(seconds);
        self
    }

    pub fn with_port(mut self, port: u8) -> Self {
        self.port = port;
        self
    }

    pub fn with_error(mut self, is_error: bool) -> Self {
        self.is_error = is_error;
        self
    }

    pub fn is_timestamped(&self) -> bool {
        self.timestamp.is_some()
    }

    /// Number of whole elements of `payload_type` carried by the payload
    pub fn element_count(&self) -> usize {
        match self.payload_type.width() {
            0 => 0,
            w => self.payload.len() / w,
        }
    }
}

impl fmt::Display for HarpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{ty}{err}\taddr={addr}\tport={port}\t{pt}",
            ty = self.message_type,
            err = if self.is_error { "!" } else { "" },
            addr = self.address,
            port = self.port,
            pt = self.payload_type,
        )?;
        f.write_str("\t")?;
        for (i, b) in self.payload.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02X}")?;
        }
        if let Some(ts) = self.timestamp {
            write!(f, "\tts={ts:.6}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct LinkInfo {
    pub name: String,
    pub driver: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_type_width_and_sign() {
        assert_eq!(PayloadType::U8.width(), 1);
        assert_eq!(PayloadType::S16.width(), 2);
        assert_eq!(PayloadType::Float.width(), 4);
        assert_eq!(PayloadType::S64.width(), 8);
        assert!(PayloadType::S16.is_signed());
        assert!(!PayloadType::U16.is_signed());
        assert!(PayloadType::Float.is_float());
    }

    #[test]
    fn payload_type_parse() {
        assert_eq!(PayloadType::parse("u16"), Some(PayloadType::U16));
        assert_eq!(PayloadType::parse("Float"), Some(PayloadType::Float));
        assert_eq!(PayloadType::parse("0x82"), Some(PayloadType::S16));
        assert_eq!(PayloadType::parse("68"), Some(PayloadType::Float));
        assert_eq!(PayloadType::parse("0x03"), None);
    }

    #[test]
    fn message_type_raw() {
        assert_eq!(MessageType::from_raw(1), Some(MessageType::Read));
        assert_eq!(MessageType::from_raw(3), Some(MessageType::Event));
        assert_eq!(MessageType::from_raw(0), None);
        assert_eq!(MessageType::Write.raw(), 2);
    }

    #[test]
    fn element_count() {
        let msg = HarpMessage::new(MessageType::Event, 91, PayloadType::S16, vec![0; 6]);
        assert_eq!(msg.element_count(), 3);
        assert!(!msg.is_timestamped());
        assert_eq!(msg.port, DEFAULT_PORT);
    }

    #[test]
    fn display_lists_payload_bytes() {
        let msg = HarpMessage::new(MessageType::Write, 35, PayloadType::U16, vec![0x09, 0x00])
            .with_timestamp(1.5);
        let text = msg.to_string();
        assert!(text.starts_with("write\taddr=35"));
        assert!(text.contains("09 00"));
        assert!(text.contains("ts=1.500000"));
    }
}
