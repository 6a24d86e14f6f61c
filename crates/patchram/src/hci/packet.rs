//! HCI packet structures and parsing
//!
//! This module contains the command frame sent to the controller and the
//! raw event frame read back from it.

use crate::error::HciError;
use crate::hci::constants::*;
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

/// Compose a 16-bit opcode from its group and command fields
pub const fn opcode(ogf: u8, ocf: u16) -> u16 {
    ((ogf as u16) << 10) | (ocf & 0x3ff)
}

/// An HCI command: opcode plus up to 255 parameter bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    opcode: u16,
    parameters: Vec<u8>,
}

impl CommandFrame {
    /// Create a command, rejecting parameters that do not fit the length byte
    pub fn new(opcode: u16, parameters: Vec<u8>) -> Result<Self, HciError> {
        if parameters.len() > HCI_MAX_PARAM_LEN {
            return Err(HciError::InvalidParamLength(parameters.len()));
        }
        Ok(Self { opcode, parameters })
    }

    /// HCI_Reset
    pub fn reset() -> Self {
        Self {
            opcode: opcode(OGF_HOST_CTL, OCF_RESET),
            parameters: Vec::new(),
        }
    }

    /// Broadcom HCI_Download_Minidriver
    pub fn download_minidriver() -> Self {
        Self {
            opcode: opcode(OGF_VENDOR_CMD, OCF_BCM_DOWNLOAD_MINIDRIVER),
            parameters: Vec::new(),
        }
    }

    /// Broadcom HCI_Write_BD_ADDR
    pub fn write_bd_addr(addr: [u8; 6]) -> Self {
        Self {
            opcode: opcode(OGF_VENDOR_CMD, OCF_BCM_WRITE_BD_ADDR),
            parameters: addr.to_vec(),
        }
    }

    pub fn opcode(&self) -> u16 {
        self.opcode
    }

    pub fn parameters(&self) -> &[u8] {
        &self.parameters
    }

    /// The four header bytes: packet type, opcode (little-endian), parameter length
    pub fn header(&self) -> [u8; 4] {
        let mut header = [HCI_COMMAND_PKT, 0, 0, self.parameters.len() as u8];
        LittleEndian::write_u16(&mut header[1..3], self.opcode);
        header
    }

    /// Convert the command to a contiguous raw HCI packet
    pub fn to_packet(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(4 + self.parameters.len());
        packet.extend_from_slice(&self.header());
        packet.extend_from_slice(&self.parameters);
        packet
    }
}

impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "opcode 0x{:04x} ({} parameter bytes)",
            self.opcode,
            self.parameters.len()
        )
    }
}

/// Raw bytes of one event read from the controller
///
/// Nothing is validated on construction. The accessors below parse on demand
/// and return `None` for anything they do not recognise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFrame {
    bytes: Vec<u8>,
}

impl EventFrame {
    /// Wrap the bytes of one read, keeping at most `HCI_MAX_EVENT_SIZE`
    pub fn new(bytes: &[u8]) -> Self {
        let len = bytes.len().min(HCI_MAX_EVENT_SIZE);
        Self {
            bytes: bytes[..len].to_vec(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Event code, if the frame is an HCI event packet
    pub fn event_code(&self) -> Option<u8> {
        match self.bytes.as_slice() {
            [HCI_EVENT_PKT, code, ..] => Some(*code),
            _ => None,
        }
    }

    /// Event parameters, bounded by the parameter length byte
    pub fn parameters(&self) -> Option<&[u8]> {
        match self.bytes.as_slice() {
            [HCI_EVENT_PKT, _, len, rest @ ..] if rest.len() >= *len as usize => {
                Some(&rest[..*len as usize])
            }
            _ => None,
        }
    }

    /// Status byte of a Command Complete or Command Status event for `opcode`
    pub fn status_for(&self, opcode: u16) -> Option<u8> {
        let params = self.parameters()?;
        match self.event_code()? {
            // Num_HCI_Command_Packets, Command_Opcode, Status, ...
            EVT_CMD_COMPLETE if params.len() >= 4 => {
                (u16::from_le_bytes([params[1], params[2]]) == opcode).then_some(params[3])
            }
            // Status, Num_HCI_Command_Packets, Command_Opcode
            EVT_CMD_STATUS if params.len() >= 4 => {
                (u16::from_le_bytes([params[2], params[3]]) == opcode).then_some(params[0])
            }
            _ => None,
        }
    }
}
