use thiserror::Error;

pub type Result<T, E = HarpError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum HarpError {
    #[error("interface not found: {0}")]
    InterfaceNotFound(String),
    #[error("timeout")]
    Timeout,
    #[error("invalid message: {0}")]
    InvalidMessage(&'static str),
}
