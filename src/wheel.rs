// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Wheel identifiers shared by every per-wheel table in the crate.

/// Number of driven wheels.
pub const WHEEL_COUNT: usize = 2;

/// One of the two driven wheels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Wheel {
    Left,
    Right,
}

impl Wheel {
    /// Both wheels, in table order.
    pub const ALL: [Wheel; WHEEL_COUNT] = [Wheel::Left, Wheel::Right];

    /// Index into per-wheel arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Wheel::Left => 0,
            Wheel::Right => 1,
        }
    }
}
