// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Command message protocol used to drive the rover over serial.
//!
//! Every frame is four bytes: `[START_BYTE, id, arg, checksum]`, where `checksum` is the wrapping
//! sum of `id` and `arg`.

use crate::wheel::Wheel;

/// Sync byte for the protocol.
pub const START_BYTE: u8 = 0xA5;

// Message IDs
pub const MSG_SET_LEFT: u8 = 0x10;
pub const MSG_SET_RIGHT: u8 = 0x11;
pub const MSG_SET_BOTH: u8 = 0x12;
pub const MSG_FORWARD: u8 = 0x20;
pub const MSG_BACKWARD: u8 = 0x21;
pub const MSG_STOP: u8 = 0x22;
pub const MSG_SPIN_LEFT: u8 = 0x23;
pub const MSG_SPIN_RIGHT: u8 = 0x24;
pub const MSG_SPEED_UP: u8 = 0x30;
pub const MSG_SLOW_DOWN: u8 = 0x31;

/// Commands decoded from the serial link. Speeds are in vanes per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Setpoint for one wheel, direction unchanged.
    SetSpeed(Wheel, u8),
    /// Setpoint for both wheels, direction unchanged.
    SetSpeedBoth(u8),
    Forward(u8),
    Backward(u8),
    Stop,
    SpinLeft(u8),
    SpinRight(u8),
    SpeedUp,
    SlowDown,
}

impl Command {
    /// Decode a message id and argument. Returns `None` for unknown ids.
    pub fn decode(id: u8, arg: u8) -> Option<Self> {
        let cmd = match id {
            MSG_SET_LEFT => Command::SetSpeed(Wheel::Left, arg),
            MSG_SET_RIGHT => Command::SetSpeed(Wheel::Right, arg),
            MSG_SET_BOTH => Command::SetSpeedBoth(arg),
            MSG_FORWARD => Command::Forward(arg),
            MSG_BACKWARD => Command::Backward(arg),
            MSG_STOP => Command::Stop,
            MSG_SPIN_LEFT => Command::SpinLeft(arg),
            MSG_SPIN_RIGHT => Command::SpinRight(arg),
            MSG_SPEED_UP => Command::SpeedUp,
            MSG_SLOW_DOWN => Command::SlowDown,
            _ => return None,
        };
        Some(cmd)
    }

    /// Encode into a complete frame.
    pub fn encode(self) -> [u8; 4] {
        let (id, arg) = match self {
            Command::SetSpeed(Wheel::Left, s) => (MSG_SET_LEFT, s),
            Command::SetSpeed(Wheel::Right, s) => (MSG_SET_RIGHT, s),
            Command::SetSpeedBoth(s) => (MSG_SET_BOTH, s),
            Command::Forward(s) => (MSG_FORWARD, s),
            Command::Backward(s) => (MSG_BACKWARD, s),
            Command::Stop => (MSG_STOP, 0),
            Command::SpinLeft(s) => (MSG_SPIN_LEFT, s),
            Command::SpinRight(s) => (MSG_SPIN_RIGHT, s),
            Command::SpeedUp => (MSG_SPEED_UP, 0),
            Command::SlowDown => (MSG_SLOW_DOWN, 0),
        };
        [START_BYTE, id, arg, id.wrapping_add(arg)]
    }
}
