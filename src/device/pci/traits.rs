//! # PCI Core Traits
//!
//! This module contains the core traits for PCI emulation. See [`PciDevice`].

use std::fmt::Debug;

use crate::device::bus::Request;

use super::config_space::BarInfo;

/// The interface a device has to implement to be added to a PCI bus.
///
/// PCI devices respond to requests in their PCI Configuration Space and in
/// the I/O regions their Base Address Registers (BARs) describe. Regions are
/// identified by BAR number and requests carry offsets relative to the start
/// of the region, so devices never have to care where the guest placed
/// them.
pub trait PciDevice: Debug {
    /// Write to the PCI Configuration Space of the device.
    ///
    /// # Parameters
    ///
    /// `req`: The address and size of the request.
    /// `value`: The value to be written.
    fn write_cfg(&self, req: Request, value: u64);

    /// Read from the PCI Configuration Space of the device.
    ///
    /// # Parameters
    ///
    /// `req`: The address and size of the request.
    #[must_use]
    fn read_cfg(&self, req: Request) -> u64;

    /// Write a value to an I/O region.
    ///
    /// # Parameters
    ///
    /// - `region`: Identifies the targeted I/O region (BAR).
    /// - `req`: The offset and size of the request. Offsets are relative to the beginning of each
    ///   I/O region.
    /// - `value`: The value to be written.
    fn write_io(&self, region: u32, req: Request, value: u64);

    /// Read a value from an I/O region.
    ///
    /// # Parameters
    ///
    /// - `region`: Identifies the targeted I/O region (BAR).
    /// - `req`: The offset and size of the request. Offsets are relative to the beginning of each
    ///   I/O region.
    #[must_use]
    fn read_io(&self, region: u32, req: Request) -> u64;

    /// Describe a BAR of the device.
    #[must_use]
    fn bar(&self, bar_no: u8) -> Option<BarInfo>;

    /// Reset the device as a PCI function-level reset would.
    fn reset(&self);
}
