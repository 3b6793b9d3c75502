//! # PCI Configuration Space
//!
//! A byte-addressed model of the 256-byte configuration header together with
//! a per-byte write mask. Everything a guest may change is described by the
//! mask; everything else is read-only. BAR sizing falls out of the masked
//! write: writing all ones to a BAR reads back the size mask plus the
//! read-only type bits.

use tracing::trace;

use crate::device::bus::Request;

use super::constants::config_space::{
    bar, capability, command, offset, status, INTERRUPT_PIN_INTA, SIZE,
};

/// The kind of address space a BAR maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarKind {
    /// Port I/O space.
    Io,
    /// 64-bit, non-prefetchable memory space. Occupies two BAR slots.
    Memory64,
}

/// The current programming of a Base Address Register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarInfo {
    pub kind: BarKind,
    /// The guest-programmed start address.
    pub start: u64,
    /// The size of the region in bytes.
    pub size: u64,
}

#[derive(Debug, Clone, Copy)]
struct BarLayout {
    kind: BarKind,
    size: u64,
}

#[derive(Debug, Clone)]
pub struct ConfigSpace {
    data: [u8; SIZE],
    write_mask: [u8; SIZE],
    bars: [Option<BarLayout>; 6],
    msix_capability: Option<usize>,
}

impl ConfigSpace {
    /// Read from the configuration space. Reads beyond the emulated header
    /// return zero.
    #[must_use]
    pub fn read(&self, req: Request) -> u64 {
        let value = (0..u64::from(req.size))
            .filter_map(|i| {
                let addr = usize::try_from(req.addr + i).ok()?;
                self.data.get(addr).map(|&byte| u64::from(byte) << (8 * i))
            })
            .fold(0, |acc, byte| acc | byte);
        trace!("config space read {:#x} -> {value:#x}", req.addr);
        value
    }

    /// Write to the configuration space, honoring the write mask.
    pub fn write(&mut self, req: Request, value: u64) {
        trace!("config space write {:#x} <- {value:#x}", req.addr);
        for i in 0..u64::from(req.size) {
            let Ok(addr) = usize::try_from(req.addr + i) else {
                break;
            };
            if addr >= SIZE {
                break;
            }
            let byte = (value >> (8 * i)) as u8;
            let mask = self.write_mask[addr];
            self.data[addr] = (self.data[addr] & !mask) | (byte & mask);
        }
    }

    /// Describe the current programming of a BAR.
    ///
    /// Returns `None` for BAR slots that are unused or that hold the upper
    /// half of a 64-bit BAR.
    #[must_use]
    pub fn bar(&self, bar_no: u8) -> Option<BarInfo> {
        let layout = (*self.bars.get(usize::from(bar_no))?)?;
        let low = u64::from(self.dword(offset::BAR0 + 4 * usize::from(bar_no)));
        let start = match layout.kind {
            BarKind::Io => low & u64::from(bar::IO_ADDRESS_MASK),
            BarKind::Memory64 => {
                let high = u64::from(self.dword(offset::BAR0 + 4 * (usize::from(bar_no) + 1)));
                (high << 32) | (low & u64::from(bar::MEM_ADDRESS_MASK))
            }
        };

        Some(BarInfo {
            kind: layout.kind,
            start,
            size: layout.size,
        })
    }

    /// Whether the guest enabled MSI-X in the MSI-X capability.
    #[must_use]
    pub fn msix_enabled(&self) -> bool {
        self.msix_capability
            .is_some_and(|cap| self.word(cap + 2) & capability::msix::CONTROL_ENABLE != 0)
    }

    fn word(&self, at: usize) -> u16 {
        u16::from_le_bytes([self.data[at], self.data[at + 1]])
    }

    fn dword(&self, at: usize) -> u32 {
        u32::from_le_bytes([
            self.data[at],
            self.data[at + 1],
            self.data[at + 2],
            self.data[at + 3],
        ])
    }
}

/// Assemble a [`ConfigSpace`] for a device.
#[derive(Debug, Clone)]
pub struct ConfigSpaceBuilder {
    config_space: ConfigSpace,
    last_capability: Option<usize>,
}

impl ConfigSpaceBuilder {
    /// Start a type 0 configuration header for the given device.
    #[must_use]
    pub fn new(vendor: u16, device: u16) -> Self {
        let mut builder = Self {
            config_space: ConfigSpace {
                data: [0; SIZE],
                write_mask: [0; SIZE],
                bars: [None; 6],
                msix_capability: None,
            },
            last_capability: None,
        };

        builder.set_word(offset::VENDOR, vendor);
        builder.set_word(offset::DEVICE, device);
        builder.set_word_mask(
            offset::COMMAND,
            command::IO_SPACE | command::MEMORY_SPACE | command::BUS_MASTER | command::INTX_DISABLE,
        );
        builder.config_space.write_mask[offset::INTERRUPT_LINE] = 0xff;
        builder.config_space.data[offset::HEADER_TYPE] = 0;
        builder.config_space.data[offset::LATENCY_TIMER] = 0;
        builder.config_space.data[offset::INTERRUPT_PIN] = INTERRUPT_PIN_INTA;
        builder
    }

    #[must_use]
    pub fn class(mut self, class: u8, subclass: u8, progif: u8) -> Self {
        self.config_space.data[offset::CLASS] = class;
        self.config_space.data[offset::SUBCLASS] = subclass;
        self.config_space.data[offset::PROG_IF] = progif;
        self
    }

    #[must_use]
    pub fn subsystem(mut self, vendor: u16, id: u16) -> Self {
        self.set_word(offset::SUBSYSTEM_VENDOR, vendor);
        self.set_word(offset::SUBSYSTEM, id);
        self
    }

    /// Add a port I/O BAR. `size` must be a power of two.
    #[must_use]
    pub fn io_bar(mut self, bar_no: u8, size: u64) -> Self {
        let at = Self::bar_offset(bar_no);
        let address_mask = !(size as u32 - 1) & bar::IO_ADDRESS_MASK;
        self.set_dword(at, bar::IO_SPACE);
        self.set_dword_mask(at, address_mask);
        self.config_space.bars[usize::from(bar_no)] = Some(BarLayout {
            kind: BarKind::Io,
            size,
        });
        self
    }

    /// Add a 64-bit memory BAR occupying `bar_no` and `bar_no + 1`. `size`
    /// must be a power of two below 4 GiB.
    #[must_use]
    pub fn mem64_bar(mut self, bar_no: u8, size: u64) -> Self {
        let at = Self::bar_offset(bar_no);
        let address_mask = !(size as u32 - 1) & bar::MEM_ADDRESS_MASK;
        self.set_dword(at, bar::MEM_TYPE_64);
        self.set_dword_mask(at, address_mask);
        self.set_dword_mask(at + 4, u32::MAX);
        self.config_space.bars[usize::from(bar_no)] = Some(BarLayout {
            kind: BarKind::Memory64,
            size,
        });
        self
    }

    /// Add an MSI-X capability at `cap_offset`.
    ///
    /// Table and PBA locations are given as BAR number and offset into that
    /// BAR.
    #[must_use]
    pub fn msix_capability(
        mut self,
        cap_offset: usize,
        vectors: u16,
        table_bar: u8,
        table_offset: u32,
        pba_bar: u8,
        pba_offset: u32,
    ) -> Self {
        self.link_capability(cap_offset, capability::ID_MSIX);
        self.set_word(cap_offset + 2, vectors - 1);
        self.set_word_mask(
            cap_offset + 2,
            capability::msix::CONTROL_ENABLE | capability::msix::CONTROL_FUNCTION_MASK,
        );
        self.set_dword(cap_offset + 4, table_offset | u32::from(table_bar));
        self.set_dword(cap_offset + 8, pba_offset | u32::from(pba_bar));
        self.config_space.msix_capability = Some(cap_offset);
        self
    }

    /// Add a PCI Express endpoint capability at `cap_offset`.
    #[must_use]
    pub fn pci_express_capability(mut self, cap_offset: usize) -> Self {
        self.link_capability(cap_offset, capability::ID_PCI_EXPRESS);
        self.set_word(cap_offset + 2, capability::pci_express::CAPABILITIES);
        self
    }

    #[must_use]
    pub fn config_space(self) -> ConfigSpace {
        self.config_space
    }

    const fn bar_offset(bar_no: u8) -> usize {
        assert!(bar_no < 6, "there are only six BARs");
        offset::BAR0 + 4 * bar_no as usize
    }

    fn link_capability(&mut self, cap_offset: usize, id: u8) {
        let pointer = self
            .last_capability
            .map_or(offset::CAPABILITIES, |previous| previous + 1);
        self.config_space.data[pointer] = cap_offset as u8;
        self.config_space.data[cap_offset] = id;
        self.config_space.data[cap_offset + 1] = 0;
        self.last_capability = Some(cap_offset);

        let status = self.config_space.word(offset::STATUS) | status::CAPABILITIES_LIST;
        self.set_word(offset::STATUS, status);
    }

    fn set_word(&mut self, at: usize, value: u16) {
        self.config_space.data[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn set_word_mask(&mut self, at: usize, mask: u16) {
        self.config_space.write_mask[at..at + 2].copy_from_slice(&mask.to_le_bytes());
    }

    fn set_dword(&mut self, at: usize, value: u32) {
        self.config_space.data[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn set_dword_mask(&mut self, at: usize, mask: u32) {
        self.config_space.write_mask[at..at + 4].copy_from_slice(&mask.to_le_bytes());
    }
}
