//! brcm-patchram - download a Broadcom patchram file into an HCI controller
//!
//! Returns 0 on success and a small positive number for each failure kind.

use clap::Parser;
use patchram::{
    open_firmware, AckPolicy, DeviceAddress, DeviceSelector, EngineConfig, Error, HciSocket,
    Provisioner,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "BRCM_PATCHRAM_LOG";

/// Download a patchram (.hcd) file to a Broadcom Bluetooth controller
#[derive(Parser, Debug)]
#[command(name = "brcm-patchram", version, about, long_about = None)]
struct CliArgs {
    /// Print a debug log, including every frame written and received
    #[arg(short, long)]
    debug: bool,

    /// Patchram file to download
    #[arg(short, long, value_name = "FILE")]
    patchram: Option<PathBuf>,

    /// BD address to program after the download (XX:XX:XX:XX:XX:XX or XXXXXXXXXXXX)
    #[arg(short, long = "bd_addr", visible_alias = "bd-addr", value_name = "ADDR")]
    bd_addr: Option<String>,

    /// File holding a default BD address, used when --bd_addr is not given
    #[arg(long, value_name = "PATH")]
    bd_addr_file: Option<PathBuf>,

    /// Treat a failed command status or a silent reset as an error
    #[arg(long)]
    strict: bool,

    /// HCI device (hciN or its BD address); defaults to the only adapter that is up
    device: Option<String>,
}

impl CliArgs {
    fn engine_config(&self) -> EngineConfig {
        let policy = if self.strict {
            AckPolicy::Strict
        } else {
            AckPolicy::Permissive
        };
        EngineConfig::default()
            .with_hexdump(self.debug)
            .with_ack_policy(policy)
    }

    fn address(&self) -> Result<Option<DeviceAddress>, Error> {
        if let Some(text) = &self.bd_addr {
            return text.parse().map(Some);
        }

        let Some(path) = &self.bd_addr_file else {
            return Ok(None);
        };
        match DeviceAddress::read_from_file(path) {
            Ok(address) => {
                info!(%address, "read default bdaddr from {}", path.display());
                Ok(Some(address))
            }
            Err(e) => {
                warn!("ignoring default bdaddr in {}: {e}", path.display());
                Ok(None)
            }
        }
    }
}

fn init_tracing(debug: bool) {
    match EnvFilter::builder().with_env_var(LOG_ENV).try_from_env() {
        Ok(filter) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        Err(_) => {
            tracing_subscriber::fmt()
                .with_max_level(if debug {
                    tracing::Level::DEBUG
                } else {
                    tracing::Level::INFO
                })
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

fn run(args: &CliArgs) -> Result<(), Error> {
    let address = args.address()?;

    let path = args.patchram.as_ref().ok_or(Error::MissingFirmware)?;
    let firmware = open_firmware(path)?;

    let adapter = DeviceSelector::from(args.device.clone()).resolve()?;
    eprintln!("Using {adapter}");

    let socket = HciSocket::open_adapter(adapter)?;
    let report = Provisioner::new(socket, args.engine_config()).run(firmware, address)?;

    info!(
        %adapter,
        records = report.patch.records,
        bytes = report.patch.payload_bytes,
        "provisioning finished"
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(args.debug);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
