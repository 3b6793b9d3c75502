//! Requests as they arrive from the bus fabric.
//!
//! The fabric describes every access with an address (relative to the
//! targeted region) and an access width. Devices decide themselves which
//! widths they accept.

use thiserror::Error;

/// The width of a single bus access.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSize {
    Size1 = 1,
    Size2 = 2,
    Size4 = 4,
    Size8 = 8,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unsupported access width of {0} bytes")]
pub struct InvalidRequestSize(pub u64);

impl TryFrom<u64> for RequestSize {
    type Error = InvalidRequestSize;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::Size1,
            2 => Self::Size2,
            4 => Self::Size4,
            8 => Self::Size8,
            other => return Err(InvalidRequestSize(other)),
        })
    }
}

impl From<RequestSize> for u64 {
    fn from(size: RequestSize) -> Self {
        size as Self
    }
}

/// A read or write request targeting a device region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    /// Offset relative to the start of the region.
    pub addr: u64,
    pub size: RequestSize,
}

impl Request {
    #[must_use]
    pub const fn new(addr: u64, size: RequestSize) -> Self {
        Self { addr, size }
    }

    /// A naturally aligned 32-bit access, the only kind most registers accept.
    #[must_use]
    pub const fn dword(addr: u64) -> Self {
        Self::new(addr, RequestSize::Size4)
    }

    /// Whether the access is aligned to its own width.
    #[must_use]
    pub const fn is_aligned(&self) -> bool {
        self.addr % (self.size as u64) == 0
    }
}
