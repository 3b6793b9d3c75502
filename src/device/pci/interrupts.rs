//! Host interrupt status/mask arbitration.
//!
//! The controller has a single interrupt signal. It is asserted while any
//! status bit is pending that is neither masked by the guest nor the
//! system-to-IOC doorbell bit, which never interrupts the host. The signal is
//! recomputed whenever status or mask change and handed to the fabric right
//! away.

use std::sync::Arc;

use tracing::trace;

use crate::device::interrupt_line::{DummyInterruptLine, InterruptLine};

use super::constants::mpi2::his;

/// How the interrupt signal reaches the guest. Chosen when the device is
/// attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptDelivery {
    /// Level-triggered legacy interrupt pin.
    Intx,
    /// A message on the given MSI-X vector whenever the signal asserts.
    Msix { vector: u16 },
}

#[derive(Debug)]
pub struct InterruptArbiter {
    status: u32,
    mask: u32,
    asserted: bool,
    delivery: InterruptDelivery,
    line: Arc<dyn InterruptLine>,
}

impl InterruptArbiter {
    #[must_use]
    pub fn new(delivery: InterruptDelivery) -> Self {
        Self {
            status: 0,
            mask: 0,
            asserted: false,
            delivery,
            line: Arc::new(DummyInterruptLine::default()),
        }
    }

    /// The signal for a given status and mask.
    #[must_use]
    pub const fn signal(status: u32, mask: u32) -> bool {
        status & !(mask | his::IOP_DOORBELL_STATUS) != 0
    }

    /// Replace the interrupt line and bring it up to date.
    pub fn connect(&mut self, line: Arc<dyn InterruptLine>) {
        self.line = line;
        self.asserted = false;
        self.reevaluate();
    }

    #[must_use]
    pub const fn status(&self) -> u32 {
        self.status
    }

    #[must_use]
    pub const fn mask(&self) -> u32 {
        self.mask
    }

    #[must_use]
    pub const fn asserted(&self) -> bool {
        self.asserted
    }

    #[must_use]
    pub const fn delivery(&self) -> InterruptDelivery {
        self.delivery
    }

    /// Set status bits.
    pub fn raise(&mut self, bits: u32) {
        self.status |= bits;
        self.reevaluate();
    }

    /// Clear status bits.
    pub fn clear(&mut self, bits: u32) {
        self.status &= !bits;
        self.reevaluate();
    }

    pub fn set_mask(&mut self, mask: u32) {
        self.mask = mask;
        self.reevaluate();
    }

    /// Recompute the signal and deliver it.
    pub fn reevaluate(&mut self) {
        let asserted = Self::signal(self.status, self.mask);
        trace!(
            "interrupt state {:#x} (status {:#x}, mask {:#x})",
            self.status & !(self.mask | his::IOP_DOORBELL_STATUS),
            self.status,
            self.mask
        );

        match self.delivery {
            InterruptDelivery::Intx => self.line.set_level(asserted),
            InterruptDelivery::Msix { vector } => {
                if asserted && !self.asserted {
                    trace!("signalling MSI-X vector {vector}");
                    self.line.interrupt();
                }
            }
        }
        self.asserted = asserted;
    }
}
