//! Register access scripts.
//!
//! A script is a list of guest accesses that is replayed against an adapter,
//! with optional checks of the values read and the interrupt signal:
//!
//! ```text
//! # Bring the IOC out of reset and start a handshake.
//! reset
//! write mem 0x34 0x0
//! write mem 0x00 0x42010000
//! irq 1
//! read mem 0x00 expect 0x18000000
//! ```

use std::{str::SplitWhitespace, sync::Mutex};

use thiserror::Error;
use tracing::{debug, info};

use crate::device::{
    bus::{Request, RequestSize},
    pci::{mpt3sas::Mpt3SasController, registers::Window, traits::PciDevice},
};

/// A single step of a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Read {
        window: Window,
        offset: u64,
        size: RequestSize,
        expect: Option<u64>,
    },
    Write {
        window: Window,
        offset: u64,
        value: u64,
        size: RequestSize,
    },
    /// Reset the whole device.
    Reset,
    /// Check whether the interrupt signal is asserted.
    Irq(bool),
}

/// A command together with the line it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub line: usize,
    pub command: Command,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: unknown command {command:?}")]
    UnknownCommand { line: usize, command: String },
    #[error("line {line}: missing {what}")]
    Missing { line: usize, what: &'static str },
    #[error("line {line}: unknown window {window:?}, expected io, mem or diag")]
    UnknownWindow { line: usize, window: String },
    #[error("line {line}: invalid number {text:?}")]
    InvalidNumber { line: usize, text: String },
    #[error("line {line}: invalid access size {size}")]
    InvalidSize { line: usize, size: u64 },
    #[error("line {line}: unexpected {token:?}")]
    Unexpected { line: usize, token: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("line {line}: read of {window} offset {offset:#x} returned {actual:#x}, expected {expected:#x}")]
    Value {
        line: usize,
        window: Window,
        offset: u64,
        actual: u64,
        expected: u64,
    },
    #[error("line {line}: interrupt asserted is {actual}, expected {expected}")]
    Interrupt {
        line: usize,
        actual: bool,
        expected: bool,
    },
}

/// Parse a complete script.
pub fn parse(script: &str) -> Result<Vec<Step>, ParseError> {
    script
        .lines()
        .enumerate()
        .filter_map(|(index, text)| parse_line(index + 1, text).transpose())
        .collect()
}

/// Parse one line of a script. Blank lines and comments yield `None`.
pub fn parse_line(line: usize, text: &str) -> Result<Option<Step>, ParseError> {
    let text = text.split_once('#').map_or(text, |(code, _comment)| code);
    let mut tokens = Tokens {
        line,
        inner: text.split_whitespace(),
    };

    let Some(keyword) = tokens.inner.next() else {
        return Ok(None);
    };

    let command = match keyword {
        "read" => {
            let window = tokens.window()?;
            let offset = tokens.number("offset")?;
            let mut size = RequestSize::Size4;
            let mut expect = None;
            while let Some(option) = tokens.inner.next() {
                match option {
                    "size" => size = tokens.size()?,
                    "expect" => expect = Some(tokens.number("expected value")?),
                    other => return Err(tokens.unexpected(other)),
                }
            }
            Command::Read {
                window,
                offset,
                size,
                expect,
            }
        }
        "write" => {
            let window = tokens.window()?;
            let offset = tokens.number("offset")?;
            let value = tokens.number("value")?;
            let mut size = RequestSize::Size4;
            while let Some(option) = tokens.inner.next() {
                match option {
                    "size" => size = tokens.size()?,
                    other => return Err(tokens.unexpected(other)),
                }
            }
            Command::Write {
                window,
                offset,
                value,
                size,
            }
        }
        "reset" => Command::Reset,
        "irq" => match tokens.number("interrupt level")? {
            0 => Command::Irq(false),
            1 => Command::Irq(true),
            other => return Err(tokens.unexpected(&other.to_string())),
        },
        other => {
            return Err(ParseError::UnknownCommand {
                line,
                command: other.to_string(),
            });
        }
    };

    if let Some(extra) = tokens.inner.next() {
        return Err(tokens.unexpected(extra));
    }

    Ok(Some(Step { line, command }))
}

/// Parse a number in `0x` hexadecimal or decimal notation.
#[must_use]
pub fn parse_number(text: &str) -> Option<u64> {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .map_or_else(|| text.parse().ok(), |hex| u64::from_str_radix(hex, 16).ok())
}

#[derive(Debug)]
struct Tokens<'a> {
    line: usize,
    inner: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn take(&mut self, what: &'static str) -> Result<&'a str, ParseError> {
        self.inner.next().ok_or(ParseError::Missing {
            line: self.line,
            what,
        })
    }

    fn number(&mut self, what: &'static str) -> Result<u64, ParseError> {
        let line = self.line;
        let text = self.take(what)?;
        parse_number(text).ok_or_else(|| ParseError::InvalidNumber {
            line,
            text: text.to_string(),
        })
    }

    fn size(&mut self) -> Result<RequestSize, ParseError> {
        let size = self.number("access size")?;
        RequestSize::try_from(size).map_err(|_| ParseError::InvalidSize {
            line: self.line,
            size,
        })
    }

    fn window(&mut self) -> Result<Window, ParseError> {
        let line = self.line;
        match self.take("window")? {
            "io" => Ok(Window::PortIo),
            "mem" => Ok(Window::Memory),
            "diag" => Ok(Window::Diagnostic),
            other => Err(ParseError::UnknownWindow {
                line,
                window: other.to_string(),
            }),
        }
    }

    fn unexpected(&self, token: &str) -> ParseError {
        ParseError::Unexpected {
            line: self.line,
            token: token.to_string(),
        }
    }
}

/// Replay parsed steps against an adapter. Stops at the first failed check.
pub fn replay(adapter: &Mutex<Mpt3SasController>, steps: &[Step]) -> Result<(), CheckError> {
    for &Step { line, command } in steps {
        match command {
            Command::Read {
                window,
                offset,
                size,
                expect,
            } => {
                let value = adapter.read_io(window.bar().into(), Request::new(offset, size));
                info!("{line}: read {window} {offset:#x} -> {value:#x}");
                if let Some(expected) = expect {
                    if value != expected {
                        return Err(CheckError::Value {
                            line,
                            window,
                            offset,
                            actual: value,
                            expected,
                        });
                    }
                }
            }
            Command::Write {
                window,
                offset,
                value,
                size,
            } => {
                info!("{line}: write {window} {offset:#x} <- {value:#x}");
                adapter.write_io(window.bar().into(), Request::new(offset, size), value);
            }
            Command::Reset => {
                info!("{line}: reset");
                adapter.reset();
            }
            Command::Irq(expected) => {
                let actual = adapter.lock().unwrap().interrupt_asserted();
                debug!("{line}: interrupt asserted is {actual}");
                if actual != expected {
                    return Err(CheckError::Interrupt {
                        line,
                        actual,
                        expected,
                    });
                }
            }
        }
    }
    Ok(())
}
