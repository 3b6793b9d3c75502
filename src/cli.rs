//! The command line interface of the script runner.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use mpt3sas::device::pci::{address::PciAddress, mpt3sas::AdapterConfig};

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None
)]
pub struct Cli {
    /// Register access script to replay against the adapter.
    #[arg(long, value_name = "PATH")]
    pub script: PathBuf,

    /// The SAS address of the adapter in hexadecimal. If not given, one is
    /// derived from the PCI address.
    #[arg(long, value_name = "HEX", value_parser = parse_sas_address)]
    pub sas_address: Option<u64>,

    /// Signal interrupts through the legacy INTx pin instead of MSI-X.
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_msix: bool,

    /// The location of the adapter on the PCI bus.
    #[arg(long, value_name = "BB:SS.F", default_value = "00:00.0")]
    pub pci_address: PciAddress,

    /// Enable verbose output. Repeat for more detail.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// The adapter configuration selected on the command line.
    #[must_use]
    pub const fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig {
            sas_address: self.sas_address,
            use_msix: !self.no_msix,
            pci_address: self.pci_address,
        }
    }
}

fn parse_sas_address(text: &str) -> Result<u64, std::num::ParseIntError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u64::from_str_radix(digits, 16)
}
