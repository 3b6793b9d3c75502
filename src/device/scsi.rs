//! The connection between the adapter and the generic SCSI layer.
//!
//! The SCSI layer owns the bus with its targets and the command queue. The
//! adapter tells it what it supports, resets the bus, and provides the hooks
//! the SCSI layer calls during the lifetime of a command. Request processing
//! is not implemented, so the hooks have nothing to do yet.

use std::fmt::Debug;

use tracing::{debug, trace};

use crate::device::pci::constants::mpt3sas::NUM_PORTS;

/// The SCSI bus an adapter is attached to.
pub trait ScsiBus: Debug + Send {
    /// Reset the bus and every target on it.
    fn reset_all(&mut self);
}

/// A bus without targets.
#[derive(Debug, Default)]
pub struct EmptyScsiBus {}

impl ScsiBus for EmptyScsiBus {
    fn reset_all(&mut self) {
        debug!("resetting SCSI bus without targets");
    }
}

/// What the adapter offers to the targets on its bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScsiBusInfo {
    /// Tagged command queueing.
    pub tcq: bool,
    pub max_target: u32,
    pub max_lun: u32,
}

/// A command as tracked by the SCSI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScsiRequest {
    pub tag: u32,
    pub target: u32,
    pub lun: u32,
}

/// A guest memory area taking part in a data transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScatterGatherEntry {
    pub address: u64,
    pub length: u64,
}

/// Hooks the SCSI layer invokes while a command is in flight.
pub trait ScsiTransport: Debug {
    /// The memory the data of `req` is transferred from or to.
    fn sg_list(&self, req: &ScsiRequest) -> Option<Vec<ScatterGatherEntry>>;

    /// `req` finished with `status`, leaving `residual` bytes untransferred.
    fn complete(&mut self, req: &ScsiRequest, status: u32, residual: usize);

    /// `req` was cancelled before it finished.
    fn cancel(&mut self, req: &ScsiRequest);
}

/// The adapter as the SCSI layer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScsiTransportBridge {
    world_wide_name: u64,
    info: ScsiBusInfo,
}

impl ScsiTransportBridge {
    #[must_use]
    pub const fn new(world_wide_name: u64) -> Self {
        Self {
            world_wide_name,
            info: ScsiBusInfo {
                tcq: true,
                max_target: NUM_PORTS,
                max_lun: 1,
            },
        }
    }

    /// The SAS address of the adapter.
    #[must_use]
    pub const fn world_wide_name(&self) -> u64 {
        self.world_wide_name
    }

    #[must_use]
    pub const fn bus_info(&self) -> ScsiBusInfo {
        self.info
    }
}

impl ScsiTransport for ScsiTransportBridge {
    fn sg_list(&self, req: &ScsiRequest) -> Option<Vec<ScatterGatherEntry>> {
        trace!("no scatter-gather list for {req:?}");
        None
    }

    fn complete(&mut self, req: &ScsiRequest, status: u32, residual: usize) {
        trace!("{req:?} completed with status {status:#x}, {residual} bytes residual");
    }

    fn cancel(&mut self, req: &ScsiRequest) {
        trace!("{req:?} cancelled");
    }
}
