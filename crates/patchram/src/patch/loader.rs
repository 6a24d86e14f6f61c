//! Drives a firmware file through the command engine

use crate::error::Result;
use crate::hci::constants::MINIDRIVER_SETTLE;
use crate::hci::engine::CommandEngine;
use crate::hci::packet::CommandFrame;
use crate::hci::transport::HciTransport;
use crate::patch::record::PatchRecords;
use std::io::Read;
use tracing::{debug, info};

/// What a completed download sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatchSummary {
    pub records: usize,
    pub payload_bytes: usize,
}

pub struct PatchLoader<'a, T> {
    engine: &'a mut CommandEngine<T>,
}

impl<'a, T: HciTransport> PatchLoader<'a, T> {
    pub fn new(engine: &'a mut CommandEngine<T>) -> Self {
        Self { engine }
    }

    /// Activate the minidriver, stream every record, then reset
    ///
    /// There is no rollback: a failure part way leaves the controller
    /// partially patched.
    pub fn download<R: Read>(&mut self, firmware: R) -> Result<PatchSummary> {
        self.activate_minidriver()?;
        let summary = self.stream(firmware)?;
        self.engine.reset()?;

        info!(
            records = summary.records,
            bytes = summary.payload_bytes,
            "patchram download complete"
        );
        Ok(summary)
    }

    fn activate_minidriver(&mut self) -> Result<()> {
        info!("downloading minidriver");
        self.engine.execute(&CommandFrame::download_minidriver())?;
        self.engine.transport_mut().settle(MINIDRIVER_SETTLE);
        Ok(())
    }

    fn stream<R: Read>(&mut self, firmware: R) -> Result<PatchSummary> {
        let mut summary = PatchSummary::default();

        for record in PatchRecords::new(firmware) {
            let record = record?;
            debug!(
                "sending record 0x{:04x} ({} bytes)",
                record.opcode,
                record.parameters.len()
            );

            // Whatever comes back counts as the acknowledgment
            self.engine.execute(&record.to_command()?)?;

            summary.records += 1;
            summary.payload_bytes += record.parameters.len();
        }

        Ok(summary)
    }
}
