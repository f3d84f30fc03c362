//! Command parser
//!
//! Byte-at-a-time request parser, as run by the bridge firmware.

use crate::protocol::{Command, Opcode, HEADER};

/// Parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for the first header byte
    Idle,

    /// Matched `header[..n]`
    Header(usize),

    /// Header complete, next byte is the opcode
    Opcode,

    /// Set-type opcode read, next byte is its argument
    Argument(Opcode),
}

/// Incremental request parser
///
/// Garbage between frames (including the client's liveness probe byte) is
/// skipped. A mismatch inside the header consumes the offending byte and
/// returns to `Idle`, so a `04` arriving there does not start a new frame.
/// Unknown opcodes are consumed and dropped the same way.
#[derive(Debug)]
pub struct CommandParser {
    state: State,
}

impl CommandParser {
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    /// Feed one byte; returns a command once a frame completes
    pub fn feed(&mut self, byte: u8) -> Option<Command> {
        match self.state {
            State::Idle => {
                if byte == HEADER[0] {
                    self.state = State::Header(1);
                }
                None
            }
            State::Header(matched) => {
                if byte == HEADER[matched] {
                    self.state = if matched + 1 == HEADER.len() {
                        State::Opcode
                    } else {
                        State::Header(matched + 1)
                    };
                } else {
                    self.state = State::Idle;
                }
                None
            }
            State::Opcode => match Opcode::try_from(byte) {
                Ok(opcode) if opcode.has_argument() => {
                    self.state = State::Argument(opcode);
                    None
                }
                Ok(opcode) => {
                    self.state = State::Idle;
                    Some(Command::new(opcode))
                }
                Err(_) => {
                    tracing::debug!("Received unknown command: {:#04x}", byte);
                    self.state = State::Idle;
                    None
                }
            },
            State::Argument(opcode) => {
                self.state = State::Idle;
                Some(Command::with_argument(opcode, byte))
            }
        }
    }

    /// Feed a slice, collecting every completed command
    pub fn feed_all(&mut self, bytes: &[u8]) -> Vec<Command> {
        bytes.iter().filter_map(|&b| self.feed(b)).collect()
    }

    /// True when no frame is partially parsed
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}
