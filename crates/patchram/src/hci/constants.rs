//! HCI protocol constants
//!
//! This module contains constants used in the Bluetooth HCI protocol and the
//! Broadcom vendor commands used to download patchram.

use std::time::Duration;

// HCI packet types
pub const HCI_COMMAND_PKT: u8 = 0x01;
pub const HCI_EVENT_PKT: u8 = 0x04;

// Maximum size of HCI command parameters
pub const HCI_MAX_PARAM_LEN: usize = 255;

// Packet type byte, event code, parameter length, up to 257 bytes of parameters
pub const HCI_MAX_EVENT_SIZE: usize = 260;

// Opcode Group Field values
pub const OGF_HOST_CTL: u8 = 0x03;
pub const OGF_VENDOR_CMD: u8 = 0x3f;

// Host Controller Commands (OGF: 0x03)
pub const OCF_RESET: u16 = 0x0003;

// Broadcom vendor commands (OGF: 0x3f)
pub const OCF_BCM_WRITE_BD_ADDR: u16 = 0x0001;
pub const OCF_BCM_DOWNLOAD_MINIDRIVER: u16 = 0x002e;

// Full opcodes as they appear on the wire
pub const OP_RESET: u16 = 0x0c03;
pub const OP_BCM_WRITE_BD_ADDR: u16 = 0xfc01;
pub const OP_BCM_DOWNLOAD_MINIDRIVER: u16 = 0xfc2e;

// HCI Events
pub const EVT_CMD_COMPLETE: u8 = 0x0E;
pub const EVT_CMD_STATUS: u8 = 0x0F;

/// Reset is retried this many times before giving up on an acknowledgment
pub const RESET_ATTEMPTS: usize = 5;

/// How long each reset attempt waits for the socket to become readable
pub const RESET_TIMEOUT: Duration = Duration::from_secs(4);

/// Pause the controller needs after the minidriver command
pub const MINIDRIVER_SETTLE: Duration = Duration::from_secs(1);
