//! Guest misbehavior the controller tolerates.
//!
//! None of these are fatal. They are reported through `tracing` where the
//! fabric hands the access to the controller, and the affected state is put
//! back into a defined shape.

use thiserror::Error;

use super::registers::{Register, Window};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("{size}-byte access to {window} window at {addr:#x}, only 4-byte accesses are supported")]
    AccessWidth { window: Window, addr: u64, size: u64 },
    #[error("unaligned access to {window} window at {addr:#x}")]
    UnalignedAccess { window: Window, addr: u64 },
    #[error("access to {window} window at {addr:#x} is beyond the end of the window")]
    OutOfWindow { window: Window, addr: u64 },
    #[error("region {0} is not an I/O window of this device")]
    UnknownRegion(u32),
    #[error("wrong diagnostic unlock key {value:#x}, expected {expected:?} after {progress} keys")]
    UnexpectedResetKey {
        value: u32,
        /// `None` if the sequence was already complete.
        expected: Option<u32>,
        progress: usize,
    },
    #[error("unsupported doorbell function {0:#x}")]
    UnsupportedDoorbellFunction(u8),
    #[error("read of write-only register {0}")]
    WriteOnlyRegister(Register),
}
