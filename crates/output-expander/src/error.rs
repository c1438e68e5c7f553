use harp_message::PayloadType;
use thiserror::Error;

pub type Result<T, E = RegisterError> = core::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegisterError {
    #[error("no register at address {0}")]
    UnknownRegister(u16),
    #[error(
        "malformed payload for {register}: expected {expected_len} bytes of {expected_type}, \
         got {actual_len} bytes of {actual_type}"
    )]
    MalformedPayload {
        register: &'static str,
        expected_type: PayloadType,
        actual_type: PayloadType,
        expected_len: usize,
        actual_len: usize,
    },
    #[error("{register} lives at address {expected}, message is for address {actual}")]
    AddressMismatch {
        register: &'static str,
        expected: u16,
        actual: u16,
    },
    #[error("{0} message carries no timestamp")]
    MissingTimestamp(&'static str),
    #[error("invalid value for {register}: {text:?}")]
    InvalidValue { register: &'static str, text: String },
    #[error("metrics error: {0}")]
    Metrics(String),
}
