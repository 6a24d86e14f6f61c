//! Permanent BD address programming
//!
//! Addresses are accepted as `XX:XX:XX:XX:XX:XX` (what `hcitool dev` prints)
//! or as twelve contiguous hex digits. Octets are sent to the controller in
//! the order they were written.

use crate::error::{Error, Result};
use crate::hci::engine::CommandEngine;
use crate::hci::packet::{CommandFrame, EventFrame};
use crate::hci::transport::HciTransport;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

const COLON_FORM_LEN: usize = 17;
const CONTIGUOUS_FORM_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAddress([u8; 6]);

impl DeviceAddress {
    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 6] {
        self.0
    }

    /// Read a default address from a file holding it in colon form
    ///
    /// Exactly the first 17 bytes are used, so a trailing newline is fine.
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut text = [0u8; COLON_FORM_LEN];
        File::open(path.as_ref())?.read_exact(&mut text)?;

        let text = std::str::from_utf8(&text)
            .map_err(|_| Error::MalformedAddress(String::from_utf8_lossy(&text).into_owned()))?;
        text.parse()
    }
}

impl FromStr for DeviceAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || Error::MalformedAddress(s.to_string());

        let digits: Vec<u8> = match s.len() {
            COLON_FORM_LEN => {
                let mut digits = Vec::with_capacity(CONTIGUOUS_FORM_LEN);
                for (i, &b) in s.as_bytes().iter().enumerate() {
                    match (i % 3, b) {
                        (2, b':') => {}
                        (2, _) => return Err(malformed()),
                        _ => digits.push(b),
                    }
                }
                digits
            }
            CONTIGUOUS_FORM_LEN => s.as_bytes().to_vec(),
            _ => return Err(malformed()),
        };

        let mut bytes = [0u8; 6];
        hex::decode_to_slice(&digits, &mut bytes).map_err(|_| malformed())?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

/// Write `address` as the controller's permanent BD address
pub fn program<T: HciTransport>(
    engine: &mut CommandEngine<T>,
    address: DeviceAddress,
) -> Result<EventFrame> {
    let event = engine.execute(&CommandFrame::write_bd_addr(address.bytes()))?;
    info!(%address, "BD address written");
    Ok(event)
}
