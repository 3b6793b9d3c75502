use std::{fmt, num::ParseIntError, str::FromStr};

use thiserror::Error;

/// The location of a function on the PCI bus.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PciAddress {
    pub bus: u8,
    pub slot: u8,
    pub function: u8,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PciAddressParseError {
    #[error("expected a PCI address of the form BB:SS.F, got {0:?}")]
    Malformed(String),
    #[error("invalid number in PCI address")]
    InvalidNumber(#[from] ParseIntError),
    #[error("slot {0:#x} is out of range, slots go up to 0x1f")]
    SlotOutOfRange(u8),
    #[error("function {0} is out of range, functions go up to 7")]
    FunctionOutOfRange(u8),
}

impl FromStr for PciAddress {
    type Err = PciAddressParseError;

    /// Parse the `BB:SS.F` notation with hexadecimal numbers, as `lspci`
    /// prints it.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || PciAddressParseError::Malformed(s.to_string());
        let (bus, rest) = s.split_once(':').ok_or_else(malformed)?;
        let (slot, function) = rest.split_once('.').ok_or_else(malformed)?;

        let bus = u8::from_str_radix(bus, 16)?;
        let slot = u8::from_str_radix(slot, 16)?;
        let function = u8::from_str_radix(function, 16)?;

        if slot > 0x1f {
            return Err(PciAddressParseError::SlotOutOfRange(slot));
        }
        if function > 7 {
            return Err(PciAddressParseError::FunctionOutOfRange(function));
        }

        Ok(Self {
            bus,
            slot,
            function,
        })
    }
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}.{:x}", self.bus, self.slot, self.function)
    }
}
