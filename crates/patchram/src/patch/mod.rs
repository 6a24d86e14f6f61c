//! Broadcom patchram (`.hcd`) download
//!
//! An `.hcd` file is a bare sequence of HCI vendor commands, each stored as a
//! little-endian opcode, a one byte parameter length and the parameters.

pub mod loader;
pub mod record;


pub use loader::{PatchLoader, PatchSummary};
pub use record::{PatchRecord, PatchRecords};

use crate::error::{Error, Result};
use std::fs::File;
use std::path::Path;

/// Whether `path` follows the `.hcd` naming convention (any case)
pub fn is_hcd_path(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("hcd"))
}

/// Open a firmware file after checking its name
pub fn open_firmware(path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    if !is_hcd_path(path) {
        return Err(Error::NotHcdFile(path.to_path_buf()));
    }

    File::open(path).map_err(|source| Error::FirmwareUnreadable {
        path: path.to_path_buf(),
        source,
    })
}
