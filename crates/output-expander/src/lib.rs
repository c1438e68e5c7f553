//! output-expander: register map and codecs for the Harp Output Expander
//!
//! The device's registers live in one static table. Each register is also a
//! unit type implementing [`Register`], so payloads can be decoded and
//! encoded either statically (`OutputSet::decode(&msg)`) or by address
//! ([`RegisterCodec::parse`]). The [`MessageStreamExt`] adaptors group,
//! filter and parse message streams by register.

mod error;
pub use error::{RegisterError, Result};

mod payload;
pub use payload::{PayloadKind, PayloadValue, Timestamped, ValueShape};

mod flags;
pub use flags::{
    AcquisitionMode, AuxiliaryInputs, DigitalOutputs, EnableFlag, EncoderDirection, EventFlags,
    ExpansionBoardType, PwmAndStimMappings, PwmChannels, SampleRate, ServoChannels, TriggerSource,
};

mod composite;
pub use composite::{MagneticEncoderPayload, OpticalFlowPayload};

pub mod registers;
pub use registers::{
    descriptor, Access, RegisterDescriptor, RegisterId, RegisterValue, DEVICE_NAME, REGISTERS,
    WHO_AM_I,
};

mod codec;
pub use codec::{format, parse, Register, RegisterCodec};

mod dispatch;
pub use dispatch::{
    group_by_register, CreateMessage, FilterMode, FilterRegister, KeyedByRegister,
    MessageStreamExt, ParseAll, ParseRegister, ParseRegisterTimestamped, RegisterGroup,
    RegisterGroups,
};

mod config;
pub use config::{load_codec_config, CodecConfig, Validation};

mod metrics;
pub use metrics::{CodecMetrics, MetricsHub};
