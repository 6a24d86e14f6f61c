//! Firmware record parsing

use crate::error::{Error, Result};
use crate::hci::packet::CommandFrame;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};

/// Opcode (2 bytes) and parameter length (1 byte)
pub const RECORD_HEADER_LEN: usize = 3;

/// One vendor command stored in a firmware file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRecord {
    pub opcode: u16,
    pub parameters: Vec<u8>,
}

impl PatchRecord {
    pub fn to_command(&self) -> Result<CommandFrame> {
        Ok(CommandFrame::new(self.opcode, self.parameters.clone())?)
    }
}

/// Reads records from a firmware stream until end of file
///
/// Yields an error once for a truncated record and then stops.
pub struct PatchRecords<R> {
    reader: R,
    // Number of the next record, starting at 1
    next: usize,
    done: bool,
}

impl<R: Read> PatchRecords<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            next: 1,
            done: false,
        }
    }

    fn read_record(&mut self) -> Result<Option<PatchRecord>> {
        let mut header = [0u8; RECORD_HEADER_LEN];
        let read = read_full(&mut self.reader, &mut header)?;
        if read == 0 {
            return Ok(None);
        }
        if read < RECORD_HEADER_LEN {
            return Err(self.truncated(RECORD_HEADER_LEN, read));
        }

        let mut cursor = &header[..];
        let opcode = cursor.read_u16::<LittleEndian>()?;
        let len = cursor.read_u8()? as usize;

        let mut parameters = vec![0u8; len];
        let read = read_full(&mut self.reader, &mut parameters)?;
        if read < len {
            return Err(self.truncated(len, read));
        }

        self.next += 1;
        Ok(Some(PatchRecord { opcode, parameters }))
    }

    fn truncated(&self, expected: usize, read: usize) -> Error {
        Error::PatchFileTruncated {
            record: self.next,
            expected,
            read,
        }
    }
}

impl<R: Read> Iterator for PatchRecords<R> {
    type Item = Result<PatchRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let item = self.read_record().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

/// Fill `buf` from `reader`, stopping early only at end of file
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
