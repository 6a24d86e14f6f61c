//! patchram - Broadcom Bluetooth firmware download over HCI
//!
//! This library flashes patchram (`.hcd`) files into a Broadcom controller
//! through a raw HCI socket on Linux and can program the controller's
//! permanent BD address afterwards.
//!
//! The pieces, leaf first: adapter discovery ([`hci::device`]), the raw
//! socket ([`HciSocket`]), the command/response engine ([`CommandEngine`]),
//! the record loader ([`PatchLoader`]) and the address programmer
//! ([`bdaddr`]). [`Provisioner`] runs them in order.

pub mod bdaddr;
pub mod config;
pub mod error;
pub mod hci;
pub mod patch;
pub mod provision;

// Re-export common types for convenience
pub use bdaddr::DeviceAddress;
pub use config::{AckPolicy, EngineConfig};
pub use error::{Error, HciError, Result};
pub use hci::{
    AdapterFlags, AdapterHandle, CommandEngine, CommandFrame, DeviceSelector, EventFrame,
    HciSocket, HciTransport, ResetOutcome,
};
pub use patch::{open_firmware, PatchLoader, PatchRecord, PatchSummary};
pub use provision::{ProvisionReport, Provisioner};
