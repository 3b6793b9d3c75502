//! Register decoding for the three I/O windows of the SAS3008.
//!
//! The legacy port I/O window and the memory window expose the same
//! Fusion-MPT system interface registers. The memory window additionally
//! hosts the MSI-X table and PBA, which belong to the fabric. The diagnostic
//! window has no registers we implement.

use std::fmt;

use crate::device::bus::{Request, RequestSize};

use super::{
    constants::{
        mpi2::offset,
        mpt3sas::{bar, msix, DIAGNOSTIC_WINDOW_SIZE, IO_WINDOW_SIZE, MEMORY_WINDOW_SIZE},
    },
    error::ProtocolViolation,
};

/// One of the address-space windows of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// The 256 byte legacy port I/O window (BAR 0).
    PortIo,
    /// The 64 KiB memory window (BAR 1).
    Memory,
    /// The 64 KiB diagnostic window (BAR 3).
    Diagnostic,
}

impl Window {
    /// The window a BAR maps.
    #[must_use]
    pub const fn from_bar(bar_no: u8) -> Option<Self> {
        match bar_no {
            bar::IO => Some(Self::PortIo),
            bar::MEMORY => Some(Self::Memory),
            bar::DIAGNOSTIC => Some(Self::Diagnostic),
            _ => None,
        }
    }

    #[must_use]
    pub const fn bar(self) -> u8 {
        match self {
            Self::PortIo => bar::IO,
            Self::Memory => bar::MEMORY,
            Self::Diagnostic => bar::DIAGNOSTIC,
        }
    }

    #[must_use]
    pub const fn size(self) -> u64 {
        match self {
            Self::PortIo => IO_WINDOW_SIZE,
            Self::Memory => MEMORY_WINDOW_SIZE,
            Self::Diagnostic => DIAGNOSTIC_WINDOW_SIZE,
        }
    }

    /// The register table decoding requests to this window.
    #[must_use]
    pub fn registers(self) -> &'static [(u64, Register)] {
        match self {
            Self::PortIo => &SYSTEM_INTERFACE[..IO_WINDOW_REGISTERS],
            Self::Memory => SYSTEM_INTERFACE,
            Self::Diagnostic => &[],
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PortIo => "io",
            Self::Memory => "mem",
            Self::Diagnostic => "diag",
        };
        write!(f, "{name}")
    }
}

/// A register of the controller as identified by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Doorbell,
    WriteSequence,
    HostDiagnostic,
    DiagRwData,
    DiagRwAddressLow,
    DiagRwAddressHigh,
    HostInterruptStatus,
    HostInterruptMask,
    DcrData,
    DcrAddress,
    ReplyFreeHostIndex,
    ReplyPostHostIndex,
    SupReplyPostHostIndex,
    HcbSize,
    HcbAddressLow,
    HcbAddressHigh,
    Scratchpad(u8),
    RequestDescriptorPostLow,
    RequestDescriptorPostHigh,
    AtomicRequestDescriptorPost,
    /// An entry of the MSI-X table. Owned by the fabric.
    MsixTable,
    /// The MSI-X pending bit array. Owned by the fabric.
    MsixPba,
    /// Anything in the diagnostic window.
    Diagnostic,
}

impl Register {
    /// Whether the controller gives this register behavior beyond reading
    /// zero and ignoring writes.
    #[must_use]
    pub const fn is_implemented(self) -> bool {
        matches!(
            self,
            Self::Doorbell
                | Self::WriteSequence
                | Self::HostDiagnostic
                | Self::HostInterruptStatus
                | Self::HostInterruptMask
                | Self::HcbSize
        )
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Doorbell => "DOORBELL",
            Self::WriteSequence => "WRITE SEQUENCE",
            Self::HostDiagnostic => "HOST DIAGNOSTIC",
            Self::DiagRwData => "DIAG RW DATA",
            Self::DiagRwAddressLow => "DIAG RW ADDRESS LOW",
            Self::DiagRwAddressHigh => "DIAG RW ADDRESS HIGH",
            Self::HostInterruptStatus => "HOST INTERRUPT STATUS",
            Self::HostInterruptMask => "HOST INTERRUPT MASK",
            Self::DcrData => "DCR DATA",
            Self::DcrAddress => "DCR ADDRESS",
            Self::ReplyFreeHostIndex => "REPLY FREE HOST INDEX",
            Self::ReplyPostHostIndex => "REPLY POST HOST INDEX",
            Self::SupReplyPostHostIndex => "SUP REPLY POST HOST INDEX",
            Self::HcbSize => "HCB SIZE",
            Self::HcbAddressLow => "HCB ADDRESS LOW",
            Self::HcbAddressHigh => "HCB ADDRESS HIGH",
            Self::Scratchpad(n) => return write!(f, "SCRATCHPAD{n}"),
            Self::RequestDescriptorPostLow => "REQUEST DESCRIPTOR POST LOW",
            Self::RequestDescriptorPostHigh => "REQUEST DESCRIPTOR POST HIGH",
            Self::AtomicRequestDescriptorPost => "ATOMIC REQUEST DESCRIPTOR POST",
            Self::MsixTable => "MSI-X TABLE",
            Self::MsixPba => "MSI-X PBA",
            Self::Diagnostic => "DIAGNOSTIC",
        };
        write!(f, "{name}")
    }
}

/// The Fusion-MPT system interface registers, sorted by offset.
///
/// The first [`IO_WINDOW_REGISTERS`] entries fit into the port I/O window.
const SYSTEM_INTERFACE: &[(u64, Register)] = &[
    (offset::DOORBELL, Register::Doorbell),
    (offset::WRITE_SEQUENCE, Register::WriteSequence),
    (offset::HOST_DIAGNOSTIC, Register::HostDiagnostic),
    (offset::DIAG_RW_DATA, Register::DiagRwData),
    (offset::DIAG_RW_ADDRESS_LOW, Register::DiagRwAddressLow),
    (offset::DIAG_RW_ADDRESS_HIGH, Register::DiagRwAddressHigh),
    (offset::HOST_INTERRUPT_STATUS, Register::HostInterruptStatus),
    (offset::HOST_INTERRUPT_MASK, Register::HostInterruptMask),
    (offset::DCR_DATA, Register::DcrData),
    (offset::DCR_ADDRESS, Register::DcrAddress),
    (offset::REPLY_FREE_HOST_INDEX, Register::ReplyFreeHostIndex),
    (offset::REPLY_POST_HOST_INDEX, Register::ReplyPostHostIndex),
    (offset::HCB_SIZE, Register::HcbSize),
    (offset::HCB_ADDRESS_LOW, Register::HcbAddressLow),
    (offset::HCB_ADDRESS_HIGH, Register::HcbAddressHigh),
    (offset::SCRATCHPAD0, Register::Scratchpad(0)),
    (offset::SCRATCHPAD1, Register::Scratchpad(1)),
    (offset::SCRATCHPAD2, Register::Scratchpad(2)),
    (offset::SCRATCHPAD3, Register::Scratchpad(3)),
    (offset::REQUEST_DESCRIPTOR_POST_LOW, Register::RequestDescriptorPostLow),
    (offset::REQUEST_DESCRIPTOR_POST_HIGH, Register::RequestDescriptorPostHigh),
    (offset::ATOMIC_REQUEST_DESCRIPTOR_POST, Register::AtomicRequestDescriptorPost),
    (offset::SUP_REPLY_POST_HOST_INDEX, Register::SupReplyPostHostIndex),
];

const IO_WINDOW_REGISTERS: usize = SYSTEM_INTERFACE.len() - 1;

/// Resolve a request to a register.
///
/// Only naturally aligned 32-bit accesses inside the window are accepted.
/// `Ok(None)` means the access is well-formed but hits no register.
pub fn decode(window: Window, req: Request) -> Result<Option<Register>, ProtocolViolation> {
    if req.size != RequestSize::Size4 {
        return Err(ProtocolViolation::AccessWidth {
            window,
            addr: req.addr,
            size: u64::from(req.size),
        });
    }
    if !req.is_aligned() {
        return Err(ProtocolViolation::UnalignedAccess {
            window,
            addr: req.addr,
        });
    }
    if req.addr >= window.size() {
        return Err(ProtocolViolation::OutOfWindow {
            window,
            addr: req.addr,
        });
    }

    let register = match window {
        Window::Diagnostic => Some(Register::Diagnostic),
        Window::Memory if msix_table().contains(&req.addr) => Some(Register::MsixTable),
        Window::Memory if msix_pba().contains(&req.addr) => Some(Register::MsixPba),
        window => window
            .registers()
            .iter()
            .find(|(offset, _)| *offset == req.addr)
            .map(|(_, register)| *register),
    };
    Ok(register)
}

const fn msix_table() -> std::ops::Range<u64> {
    msix::TABLE_OFFSET..msix::TABLE_OFFSET + msix::VECTORS as u64 * msix::TABLE_ENTRY_SIZE
}

const fn msix_pba() -> std::ops::Range<u64> {
    msix::PBA_OFFSET..msix::PBA_OFFSET + msix::PBA_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_map_to_bars() {
        for window in [Window::PortIo, Window::Memory, Window::Diagnostic] {
            assert_eq!(Window::from_bar(window.bar()), Some(window));
        }
        assert_eq!(Window::from_bar(2), None);
        assert_eq!(Window::from_bar(4), None);
    }

    #[test]
    fn system_interface_is_sorted() {
        assert!(SYSTEM_INTERFACE.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn io_window_holds_everything_below_its_size() {
        for (offset, register) in Window::Memory.registers() {
            let in_io_window = Window::PortIo
                .registers()
                .iter()
                .any(|(o, r)| o == offset && r == register);
            assert_eq!(
                in_io_window,
                *offset < IO_WINDOW_SIZE,
                "{register} at {offset:#x} misplaced"
            );
        }
    }

    #[test]
    fn decodes_every_register_in_both_windows() {
        for window in [Window::PortIo, Window::Memory] {
            for (offset, register) in window.registers() {
                assert_eq!(decode(window, Request::dword(*offset)), Ok(Some(*register)));
            }
        }
    }

    #[test]
    fn doorbell_at_offset_zero() {
        assert_eq!(
            decode(Window::PortIo, Request::dword(0)),
            Ok(Some(Register::Doorbell))
        );
        assert_eq!(
            decode(Window::Memory, Request::dword(0x30)),
            Ok(Some(Register::HostInterruptStatus))
        );
    }

    #[test]
    fn sup_reply_post_only_in_memory_window() {
        assert_eq!(
            decode(Window::Memory, Request::dword(0x30c)),
            Ok(Some(Register::SupReplyPostHostIndex))
        );
        assert!(matches!(
            decode(Window::PortIo, Request::dword(0x30c)),
            Err(ProtocolViolation::OutOfWindow { .. })
        ));
    }

    #[test]
    fn msix_structures() {
        assert_eq!(
            decode(Window::Memory, Request::dword(0x2000)),
            Ok(Some(Register::MsixTable))
        );
        assert_eq!(
            decode(Window::Memory, Request::dword(0x20ec)),
            Ok(Some(Register::MsixTable))
        );
        assert_eq!(decode(Window::Memory, Request::dword(0x20f0)), Ok(None));
        assert_eq!(
            decode(Window::Memory, Request::dword(0x3804)),
            Ok(Some(Register::MsixPba))
        );
    }

    #[test]
    fn diagnostic_window_is_all_stub() {
        for addr in [0, 0x4, 0x30, 0xfffc] {
            assert_eq!(
                decode(Window::Diagnostic, Request::dword(addr)),
                Ok(Some(Register::Diagnostic))
            );
        }
    }

    #[test]
    fn unknown_offsets() {
        assert_eq!(decode(Window::Memory, Request::dword(0x0c)), Ok(None));
        assert_eq!(decode(Window::PortIo, Request::dword(0xfc)), Ok(None));
    }

    #[test]
    fn rejects_other_widths_and_misalignment() {
        for size in [RequestSize::Size1, RequestSize::Size2, RequestSize::Size8] {
            assert!(matches!(
                decode(Window::Memory, Request::new(0, size)),
                Err(ProtocolViolation::AccessWidth { .. })
            ));
        }
        assert!(matches!(
            decode(Window::Memory, Request::dword(0x2)),
            Err(ProtocolViolation::UnalignedAccess { .. })
        ));
    }
}
