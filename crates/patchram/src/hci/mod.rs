//! Bluetooth HCI (Host Controller Interface) implementation
//!
//! This module provides the raw socket transport, adapter discovery and the
//! command/response engine used to drive a controller.

pub mod constants;
pub mod device;
pub mod engine;
pub mod packet;
pub mod socket;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;
#[cfg(test)]
mod tests;

pub use device::{AdapterFlags, AdapterHandle, DeviceSelector};
pub use engine::{CommandEngine, ResetOutcome};
pub use packet::{CommandFrame, EventFrame};
pub use socket::HciSocket;
pub use transport::HciTransport;
