//! The full provisioning sequence for one controller

use crate::bdaddr::{self, DeviceAddress};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::hci::engine::{CommandEngine, ResetOutcome};
use crate::hci::transport::HciTransport;
use crate::patch::{PatchLoader, PatchSummary};
use std::io::Read;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub initial_reset: ResetOutcome,
    pub patch: PatchSummary,
    pub address: Option<DeviceAddress>,
}

pub struct Provisioner<T> {
    engine: CommandEngine<T>,
}

impl<T: HciTransport> Provisioner<T> {
    pub fn new(transport: T, config: EngineConfig) -> Self {
        Self {
            engine: CommandEngine::new(transport, config),
        }
    }

    /// Reset, download `firmware`, then program `address` if given
    pub fn run<R: Read>(
        &mut self,
        firmware: R,
        address: Option<DeviceAddress>,
    ) -> Result<ProvisionReport> {
        let initial_reset = self.engine.reset()?;
        let patch = PatchLoader::new(&mut self.engine).download(firmware)?;

        if let Some(address) = address {
            bdaddr::program(&mut self.engine, address)?;
        }

        Ok(ProvisionReport {
            initial_reset,
            patch,
            address,
        })
    }

    pub fn into_transport(self) -> T {
        self.engine.into_transport()
    }
}
