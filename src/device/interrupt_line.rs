//! The connection between an emulated device and the interrupt controller
//! of the fabric.

use std::fmt::Debug;

use tracing::trace;

/// An interrupt source as provided by the fabric.
///
/// Legacy INTx lines are level triggered and are driven with
/// [`InterruptLine::set_level`]. MSI-X vectors carry messages and are
/// signalled with [`InterruptLine::interrupt`].
pub trait InterruptLine: Debug + Send + Sync {
    /// Send a single interrupt message.
    fn interrupt(&self);

    /// Drive a level-triggered line.
    fn set_level(&self, asserted: bool);
}

/// An interrupt line that goes nowhere.
///
/// Used until the fabric connects a real line.
#[derive(Debug, Default)]
pub struct DummyInterruptLine {}

impl InterruptLine for DummyInterruptLine {
    fn interrupt(&self) {
        trace!("dropping interrupt message, no interrupt line connected");
    }

    fn set_level(&self, asserted: bool) {
        trace!("dropping interrupt level {asserted}, no interrupt line connected");
    }
}
