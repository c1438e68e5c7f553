use crate::{HarpMessage, LinkInfo, Result};

/// A minimal blocking link to a Harp device.
pub trait HarpLink {
    /// Open a link by name (e.g., "mock0", "COM3").
    fn open(name: &str) -> Result<Self>
    where
        Self: Sized;

    /// Attempt to list available links for this backend.
    fn list() -> Result<Vec<LinkInfo>>;

    /// Receive one message (blocking with optional timeout in milliseconds).
    fn recv(&mut self, timeout_ms: Option<u64>) -> Result<HarpMessage>;

    /// Send one message.
    fn send(&mut self, message: &HarpMessage) -> Result<()>;
}
