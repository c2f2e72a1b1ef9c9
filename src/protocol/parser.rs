// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Message parser for the rover command protocol.
//!
//! Bytes are pushed one at a time (typically straight from the USART receive path). Frames with an
//! unknown id or a bad checksum are dropped and the parser waits for the next start byte.

use crate::protocol::messages::*;

enum State {
    WaitStart,
    WaitId,
    WaitArg { id: u8 },
    WaitChecksum { id: u8, arg: u8 },
}

pub struct Parser {
    state: State,
    checksum: u8,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            state: State::WaitStart,
            checksum: 0,
        }
    }

    /// Process a single incoming byte. Returns `Some(Command)` if a complete packet is received.
    pub fn push(&mut self, byte: u8) -> Option<Command> {
        match self.state {
            State::WaitStart => {
                if byte == START_BYTE {
                    self.state = State::WaitId;
                    self.checksum = 0;
                }
            }
            State::WaitId => {
                if Command::decode(byte, 0).is_some() {
                    self.checksum = byte;
                    self.state = State::WaitArg { id: byte };
                } else if byte != START_BYTE {
                    // Unknown message ID, reset state
                    self.state = State::WaitStart;
                }
            }
            State::WaitArg { id } => {
                self.checksum = self.checksum.wrapping_add(byte);
                self.state = State::WaitChecksum { id, arg: byte };
            }
            State::WaitChecksum { id, arg } => {
                // Verify checksum
                let valid = byte == self.checksum;
                self.state = State::WaitStart; // Reset for next message

                if valid {
                    return Command::decode(id, arg);
                }
            }
        }
        None
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
