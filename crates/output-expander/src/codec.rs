use crate::config::{CodecConfig, Validation};
use crate::error::{RegisterError, Result};
use crate::metrics::CodecMetrics;
use crate::payload::{PayloadValue, Timestamped};
use crate::registers::{RegisterDescriptor, RegisterId, RegisterValue};
use harp_message::{HarpMessage, MessageType};
use tracing::debug;

/// A statically known register with a typed payload.
///
/// The provided methods decode leniently and stamp the default port; use a
/// [`RegisterCodec`] for configured validation, port and metrics.
pub trait Register: Sized {
    const ADDRESS: u16;
    const NAME: &'static str;
    const ID: RegisterId;
    type Value: PayloadValue;

    fn decode(message: &HarpMessage) -> Result<Self::Value> {
        decode_with::<Self>(message, Validation::Lenient)
    }

    fn decode_timestamped(message: &HarpMessage) -> Result<Timestamped<Self::Value>> {
        let seconds = message
            .timestamp
            .ok_or(RegisterError::MissingTimestamp(Self::NAME))?;
        Ok(Timestamped::new(seconds, Self::decode(message)?))
    }

    fn encode(message_type: MessageType, value: Self::Value) -> HarpMessage {
        HarpMessage::new(
            message_type,
            Self::ADDRESS,
            <Self::Value as PayloadValue>::KIND.payload_type(),
            value.to_bytes(),
        )
    }

    fn encode_timestamped(
        timestamp: f64,
        message_type: MessageType,
        value: Self::Value,
    ) -> HarpMessage {
        Self::encode(message_type, value).with_timestamp(timestamp)
    }
}

fn malformed(desc: &RegisterDescriptor, message: &HarpMessage) -> RegisterError {
    RegisterError::MalformedPayload {
        register: desc.name,
        expected_type: desc.payload_type(),
        actual_type: message.payload_type,
        expected_len: desc.byte_len(),
        actual_len: message.payload.len(),
    }
}

/// Lenient checking only guarantees there are enough bytes to read;
/// strict checking also pins the address, payload type and exact length.
pub(crate) fn check_payload(
    desc: &RegisterDescriptor,
    message: &HarpMessage,
    validation: Validation,
) -> Result<()> {
    match validation {
        Validation::Strict => {
            if message.address != desc.address {
                return Err(RegisterError::AddressMismatch {
                    register: desc.name,
                    expected: desc.address,
                    actual: message.address,
                });
            }
            if message.payload_type != desc.payload_type()
                || message.payload.len() != desc.byte_len()
            {
                return Err(malformed(desc, message));
            }
        }
        Validation::Lenient => {
            if message.payload.len() < desc.byte_len() {
                return Err(malformed(desc, message));
            }
        }
    }
    Ok(())
}

fn decode_with<R: Register>(message: &HarpMessage, validation: Validation) -> Result<R::Value> {
    let desc = R::ID.descriptor();
    check_payload(desc, message, validation)?;
    R::Value::read(&message.payload).ok_or_else(|| malformed(desc, message))
}

fn parse_with(message: &HarpMessage, validation: Validation) -> Result<RegisterValue> {
    let id = RegisterId::from_address(message.address)
        .ok_or(RegisterError::UnknownRegister(message.address))?;
    let desc = id.descriptor();
    check_payload(desc, message, validation)?;
    RegisterValue::read(id, &message.payload).ok_or_else(|| malformed(desc, message))
}

/// Decode any message by its address with lenient validation
pub fn parse(message: &HarpMessage) -> Result<RegisterValue> {
    parse_with(message, Validation::Lenient)
}

/// Encode a value for its register with the default port
pub fn format(message_type: MessageType, value: &RegisterValue) -> HarpMessage {
    RegisterCodec::default().format(message_type, value)
}

/// Address-dispatched encoder/decoder carrying validation policy, port and
/// optional metrics.
#[derive(Clone, Default)]
pub struct RegisterCodec {
    config: CodecConfig,
    metrics: Option<CodecMetrics>,
}

impl RegisterCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self {
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: CodecMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn record<T>(&self, result: &Result<T>) {
        if let Err(e) = result {
            debug!(error = %e, "decode failed");
        }
        let Some(m) = &self.metrics else {
            return;
        };
        match result {
            Ok(_) => m.decoded.inc(),
            Err(RegisterError::UnknownRegister(_)) => m.unknown_register.inc(),
            Err(RegisterError::MalformedPayload { .. } | RegisterError::AddressMismatch { .. }) => {
                m.malformed_payload.inc()
            }
            Err(_) => {}
        }
    }

    fn record_encode(&self) {
        if let Some(m) = &self.metrics {
            m.encoded.inc();
        }
    }

    pub fn decode<R: Register>(&self, message: &HarpMessage) -> Result<R::Value> {
        let result = decode_with::<R>(message, self.config.validation);
        self.record(&result);
        result
    }

    pub fn decode_timestamped<R: Register>(
        &self,
        message: &HarpMessage,
    ) -> Result<Timestamped<R::Value>> {
        let seconds = message
            .timestamp
            .ok_or(RegisterError::MissingTimestamp(R::NAME))?;
        Ok(Timestamped::new(seconds, self.decode::<R>(message)?))
    }

    pub fn encode<R: Register>(&self, message_type: MessageType, value: R::Value) -> HarpMessage {
        self.record_encode();
        R::encode(message_type, value).with_port(self.config.port)
    }

    pub fn encode_timestamped<R: Register>(
        &self,
        timestamp: f64,
        message_type: MessageType,
        value: R::Value,
    ) -> HarpMessage {
        self.encode::<R>(message_type, value)
            .with_timestamp(timestamp)
    }

    /// Decode a message by its address
    pub fn parse(&self, message: &HarpMessage) -> Result<RegisterValue> {
        let result = parse_with(message, self.config.validation);
        self.record(&result);
        result
    }

    /// Like [`parse`](Self::parse), but an untimestamped message fails before
    /// anything is decoded or counted.
    pub fn parse_timestamped(&self, message: &HarpMessage) -> Result<Timestamped<RegisterValue>> {
        let Some(seconds) = message.timestamp else {
            let name = RegisterId::from_address(message.address)
                .map_or("unknown register", RegisterId::name);
            return Err(RegisterError::MissingTimestamp(name));
        };
        Ok(Timestamped::new(seconds, self.parse(message)?))
    }

    /// Build a message for the register `value` belongs to
    pub fn format(&self, message_type: MessageType, value: &RegisterValue) -> HarpMessage {
        self.record_encode();
        let desc = value.id().descriptor();
        HarpMessage::new(
            message_type,
            desc.address,
            desc.payload_type(),
            value.to_bytes(),
        )
        .with_port(self.config.port)
    }

    pub fn format_timestamped(
        &self,
        timestamp: f64,
        message_type: MessageType,
        value: &RegisterValue,
    ) -> HarpMessage {
        self.format(message_type, value).with_timestamp(timestamp)
    }
}
