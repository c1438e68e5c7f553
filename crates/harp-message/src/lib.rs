//! harp-message: Harp message model and device link abstractions
//!
//! This crate provides the structural message type exchanged with Harp devices and a
//! blocking link trait, with feature-gated backends. The default build enables a `mock`
//! backend so that binaries can run on any host without hardware attached.

mod types;
pub use types::{HarpMessage, LinkInfo, MessageType, PayloadType, DEFAULT_PORT};

mod error;
pub use error::{HarpError, Result};

mod traits;
pub use traits::HarpLink;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::MockDevice;
