//! The doorbell handshake.
//!
//! Before the request/reply queues are set up, a Fusion-MPT driver talks to
//! the IOC through the doorbell register alone: it announces a message of
//! `n` dwords with a HANDSHAKE doorbell write, writes the `n` dwords one by
//! one and then reads the reply back in 16-bit pieces.
//!
//! ```text
//!            HANDSHAKE                n-th dword, reply
//!   None ---------------> Write ------------------------> Read
//!    ^                      |                               |
//!    |   n-th dword, no reply                               |
//!    +------------------------------------------------------+
//!                        status write with reply drained
//! ```

use std::fmt::Debug;

use tracing::{debug, error};

use super::{
    constants::mpi2::{doorbell, function},
    error::ProtocolViolation,
};

/// A complete outbound handshake message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeMessage {
    words: Vec<u32>,
}

impl HandshakeMessage {
    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// The MPI function of the request, stored in the highest byte of the
    /// first dword.
    #[must_use]
    pub fn function(&self) -> Option<u8> {
        self.words.first().map(|word| (word >> 24) as u8)
    }

    /// The message frame as it would appear in memory.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|word| word.to_le_bytes()).collect()
    }
}

/// Produces replies for handshake messages.
///
/// This is the place where IOC requests such as IOC Facts or IOC Init get
/// their meaning.
pub trait MessageHandler: Debug + Send {
    /// Handle a complete message. A returned reply is streamed back to the
    /// guest through the doorbell register.
    fn handle(&mut self, message: &HandshakeMessage) -> Option<Vec<u16>>;
}

/// Logs every message and never replies.
#[derive(Debug, Default)]
pub struct LoggingMessageHandler {}

impl MessageHandler for LoggingMessageHandler {
    fn handle(&mut self, message: &HandshakeMessage) -> Option<Vec<u16>> {
        debug!(
            "doorbell message with function {:?}, {} dwords",
            message.function(),
            message.words().len()
        );
        for chunk in message.words().chunks(4) {
            let line = chunk
                .iter()
                .map(|word| format!("{word:#010x}"))
                .collect::<Vec<_>>()
                .join(" ");
            debug!("    {line}");
        }
        None
    }
}

/// The state of the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoorbellState {
    /// No handshake in progress.
    None,
    /// Collecting the dwords of an outbound message.
    Write { message: Vec<u32>, capacity: usize },
    /// Handing out the reply, one word per doorbell read.
    Read { reply: Vec<u16>, index: usize },
}

/// What the rest of the controller has to do after a doorbell write.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorbellEvent {
    None,
    /// Set the doorbell interrupt status bit.
    RaiseInterrupt,
    /// The guest asked for a message unit reset.
    MessageUnitReset,
}

#[derive(Debug)]
pub struct Doorbell {
    state: DoorbellState,
    handler: Box<dyn MessageHandler>,
}

impl Doorbell {
    #[must_use]
    pub fn new(handler: Box<dyn MessageHandler>) -> Self {
        Self {
            state: DoorbellState::None,
            handler,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &DoorbellState {
        &self.state
    }

    /// The handshake-related bits of a doorbell read.
    ///
    /// In the `Read` state every call consumes one reply word.
    pub fn read(&mut self) -> u32 {
        match &mut self.state {
            DoorbellState::None => 0,
            DoorbellState::Write { .. } => doorbell::USED,
            DoorbellState::Read { reply, index } => {
                let word = reply.get(*index).copied();
                if word.is_some() {
                    *index += 1;
                }
                doorbell::USED | (u32::from(word.unwrap_or(0)) & doorbell::DATA_MASK)
            }
        }
    }

    /// Handle a doorbell write.
    ///
    /// While a message is being collected every write is message payload,
    /// except for a message unit reset, which is reported in any state. The
    /// reset itself abandons the message.
    pub fn write(&mut self, value: u32) -> Result<DoorbellEvent, ProtocolViolation> {
        let func = ((value & doorbell::FUNCTION_MASK) >> doorbell::FUNCTION_SHIFT) as u8;
        if func == function::IOC_MESSAGE_UNIT_RESET {
            return Ok(DoorbellEvent::MessageUnitReset);
        }

        if let DoorbellState::Write { message, capacity } = &mut self.state {
            message.push(value);
            let full = message.len() == *capacity;
            return Ok(if full && self.complete() {
                DoorbellEvent::RaiseInterrupt
            } else {
                DoorbellEvent::None
            });
        }

        match func {
            function::HANDSHAKE => {
                let capacity =
                    ((value & doorbell::ADD_DWORDS_MASK) >> doorbell::ADD_DWORDS_SHIFT) as usize;
                debug!("handshake started, expecting {capacity} dwords");
                self.state = DoorbellState::Write {
                    message: Vec::with_capacity(capacity),
                    capacity,
                };
                if capacity == 0 {
                    // The interrupt raised for the start of the handshake
                    // also announces the reply, if there is one.
                    self.complete();
                }
                Ok(DoorbellEvent::RaiseInterrupt)
            }
            other => Err(ProtocolViolation::UnsupportedDoorbellFunction(other)),
        }
    }

    /// Hand the collected message to the handler. Returns whether a reply is
    /// ready to be read.
    fn complete(&mut self) -> bool {
        let DoorbellState::Write { message, .. } =
            std::mem::replace(&mut self.state, DoorbellState::None)
        else {
            unreachable!("only a message in progress can complete");
        };

        let message = HandshakeMessage { words: message };
        match self.handler.handle(&message) {
            Some(reply) => {
                debug!("replying with {} words", reply.len());
                self.state = DoorbellState::Read { reply, index: 0 };
                true
            }
            None => false,
        }
    }

    /// The guest acknowledged the doorbell interrupt.
    ///
    /// Returns whether the doorbell interrupt status bit may be cleared. A
    /// reply that was not read completely keeps it set.
    pub fn acknowledge(&mut self) -> bool {
        match &self.state {
            DoorbellState::None | DoorbellState::Write { .. } => true,
            DoorbellState::Read { reply, index } if *index == reply.len() => {
                debug!("handshake complete");
                self.state = DoorbellState::None;
                true
            }
            DoorbellState::Read { reply, index } => {
                debug!(
                    "handshake acknowledged with {} of {} reply words outstanding",
                    reply.len() - index,
                    reply.len()
                );
                false
            }
        }
    }

    /// Drop whatever handshake is in progress.
    pub fn abandon(&mut self) {
        if self.state != DoorbellState::None {
            debug!("abandoning handshake in state {:?}", self.state);
        }
        self.state = DoorbellState::None;
    }

    /// Check the handshake bookkeeping and force the state back to `None` if
    /// it is inconsistent.
    pub fn check_invariants(&mut self, interrupt_pending: bool) {
        let consistent = match &self.state {
            DoorbellState::None => true,
            DoorbellState::Write { message, capacity } => message.len() < *capacity,
            DoorbellState::Read { reply, index } => *index <= reply.len() && interrupt_pending,
        };

        debug_assert!(consistent, "inconsistent doorbell state {:?}", self.state);
        if !consistent {
            error!("inconsistent doorbell state {:?}, resetting", self.state);
            self.state = DoorbellState::None;
        }
    }
}
