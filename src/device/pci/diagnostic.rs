//! Diagnostic write-unlock.
//!
//! The host diagnostic register only accepts a reset request after the
//! guest wrote six magic keys to the write sequence register in order. The
//! flush key starts over at any time.

use tracing::debug;

use super::{
    constants::mpi2::{diag, wrseq},
    error::ProtocolViolation,
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiagnosticUnlock {
    /// Number of correctly ordered keys received so far.
    progress: usize,
    host_diagnostic: u32,
}

impl DiagnosticUnlock {
    #[must_use]
    pub const fn progress(&self) -> usize {
        self.progress
    }

    /// The value of the host diagnostic register.
    #[must_use]
    pub const fn host_diagnostic(&self) -> u32 {
        self.host_diagnostic
    }

    #[must_use]
    pub const fn write_enabled(&self) -> bool {
        self.host_diagnostic & diag::DIAG_WRITE_ENABLE != 0
    }

    /// Handle a write to the write sequence register.
    ///
    /// A wrong key restarts the sequence and withdraws write access.
    pub fn write_sequence(&mut self, value: u32) -> Result<(), ProtocolViolation> {
        if value == wrseq::FLUSH_KEY {
            debug!("write sequence flushed");
            self.clear();
            return Ok(());
        }

        let expected = wrseq::KEYS.get(self.progress).copied();
        if expected != Some(value) {
            let progress = self.progress;
            self.clear();
            return Err(ProtocolViolation::UnexpectedResetKey {
                value,
                expected,
                progress,
            });
        }

        self.progress += 1;
        if self.progress == wrseq::KEYS.len() {
            debug!("diagnostic register unlocked");
            self.host_diagnostic = diag::DIAG_WRITE_ENABLE;
        }
        Ok(())
    }

    /// Handle a write to the host diagnostic register.
    ///
    /// Returns whether the write requests an adapter reset. Without write
    /// access the register ignores writes.
    pub fn write_host_diagnostic(&mut self, value: u32) -> bool {
        if self.write_enabled() && value & diag::RESET_ADAPTER != 0 {
            self.host_diagnostic |= diag::RESET_ADAPTER;
            true
        } else {
            debug!("ignoring host diagnostic write {value:#x}");
            false
        }
    }

    /// Lock the diagnostic register again.
    pub fn clear(&mut self) {
        self.progress = 0;
        self.host_diagnostic = 0;
    }
}
