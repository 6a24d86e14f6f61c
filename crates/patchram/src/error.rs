//! Error types for the patchram library
//!
//! `HciError` covers failures on the raw HCI socket itself. `Error` is the
//! crate-wide type returned by every provisioning step; the binary maps it to
//! a process exit status with [`Error::exit_code`].

use crate::bdaddr::DeviceAddress;
use crate::hci::device::{AdapterFlags, AdapterHandle};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when working with HCI sockets
#[derive(Error, Debug)]
pub enum HciError {
    #[error("Failed to open HCI socket: {0}")]
    SocketError(#[from] std::io::Error),

    #[error("Failed to bind to HCI device: {0}")]
    BindError(std::io::Error),

    #[error("Failed to install HCI event filter: {0}")]
    FilterError(std::io::Error),

    #[error("writev() failed: {0}")]
    SendError(std::io::Error),

    #[error("Failed to receive HCI event: {0}")]
    ReceiveError(std::io::Error),

    #[error("Invalid parameter length: {0}")]
    InvalidParamLength(usize),
}

/// Errors surfaced by a provisioning run
#[derive(Error, Debug)]
pub enum Error {
    #[error("You must supply a patch RAM file with --patchram")]
    MissingFirmware,

    #[error("{} does not appear to be an .hcd file", .0.display())]
    NotHcdFile(PathBuf),

    #[error("Could not open hcd file {} ({source})", path.display())]
    FirmwareUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not find any bluetooth device matching {0}")]
    DeviceNotFound(Criterion),

    #[error("Found more than one bluetooth device, you must specify which one: {}", Candidates(.0))]
    AmbiguousDevice(Vec<AdapterHandle>),

    #[error("Device {adapter} could not be opened: {source}")]
    DeviceUnavailable {
        adapter: AdapterHandle,
        source: HciError,
    },

    #[error("Improper bdaddr format '{0}'")]
    MalformedAddress(String),

    #[error("Patch file truncated in record {record}: expected {expected} bytes, read {read}")]
    PatchFileTruncated {
        record: usize,
        expected: usize,
        read: usize,
    },

    #[error("Controller rejected command 0x{opcode:04x} with status 0x{status:02x}")]
    CommandRejected { opcode: u16, status: u8 },

    #[error("Controller did not acknowledge reset after {0} attempts")]
    ResetTimeout(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Hci(#[from] HciError),
}

impl Error {
    /// Process exit status for this failure kind
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::DeviceNotFound(_) | Error::AmbiguousDevice(_) => 1,
            Error::DeviceUnavailable { .. } => 2,
            Error::MalformedAddress(_) => 3,
            Error::NotHcdFile(_) => 4,
            Error::FirmwareUnreadable { .. } => 5,
            Error::MissingFirmware => 6,
            Error::PatchFileTruncated { .. } => 7,
            Error::CommandRejected { .. }
            | Error::ResetTimeout(_)
            | Error::Io(_)
            | Error::Hci(_) => 8,
        }
    }
}

/// What a failed device lookup was searching for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    /// Any adapter whose state contains these flags
    State(AdapterFlags),
    /// An adapter named `hciN`
    Name(String),
    /// An adapter that is up and owns this address
    Address(DeviceAddress),
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::State(flags) => write!(f, "state {:?}", flags),
            Criterion::Name(name) => write!(f, "name {}", name),
            Criterion::Address(addr) => write!(f, "address {}", addr),
        }
    }
}

struct Candidates<'a>(&'a [AdapterHandle]);

impl fmt::Display for Candidates<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, handle) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", handle)?;
        }
        Ok(())
    }
}

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;
