#![deny(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::must_use_candidate
)]
// now allow a few rules which are denied by the above's statement
#![allow(clippy::multiple_crate_versions)]
#![deny(missing_debug_implementations)]
#![deny(rustdoc::all)]

//! mpt3sas
//!
//! Replays register access scripts against an emulated SAS3008.

mod cli;

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use mpt3sas::{
    access_script,
    device::{
        interrupt_line::DummyInterruptLine,
        pci::{doorbell::LoggingMessageHandler, mpt3sas::Mpt3SasController, traits::PciDevice},
        scsi::EmptyScsiBus,
    },
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let args = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(match args.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global tracing subscriber")?;

    // Log messages from the log crate as well.
    tracing_log::LogTracer::init()?;

    let script = std::fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read script {:?}", args.script))?;
    let steps = access_script::parse(&script)
        .with_context(|| format!("Failed to parse script {:?}", args.script))?;

    let mut controller = Mpt3SasController::new(
        &args.adapter_config(),
        Box::new(EmptyScsiBus::default()),
        Box::new(LoggingMessageHandler::default()),
    );
    controller.connect_irq(Arc::new(DummyInterruptLine::default()));
    let adapter = Mutex::new(controller);
    adapter.reset();

    info!("We're up!");

    access_script::replay(&adapter, &steps)
        .with_context(|| format!("Script {:?} failed", args.script))?;

    info!("Replayed {} steps", steps.len());
    Ok(())
}
