// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Two-line H-bridge motor drive with a PWM enable.
//!
//! Direction truth table (line A, line B):
//!
//! | Direction  | A | B |
//! | ---------- | - | - |
//! | `Stop`     | 0 | 0 |
//! | `Forward`  | 1 | 0 |
//! | `Backward` | 0 | 1 |
//!
//! Both lines high is never driven. Any change of direction first pulls both lines low and holds
//! them there for a settle time before the new pattern is applied. The hold is a deadline polled
//! with [`WheelDrive::poll`], not a busy-wait, so it never stalls the control tick.

use embedded_hal::digital::v2::OutputPin;
use embedded_hal::PwmPin;

use crate::config::{DRIVE_FULL_SCALE, MAX_DRIVE, MIN_DRIVE, SETTLE_US};

/// Logical drive direction for a wheel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    #[default]
    Stop = 0,
    Forward = 1,
    Backward = 2,
}

impl Direction {
    /// Decode a raw direction code. Codes outside {0, 1, 2} are rejected.
    #[inline]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Direction::Stop),
            1 => Some(Direction::Forward),
            2 => Some(Direction::Backward),
            _ => None,
        }
    }

    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Levels of (line A, line B) for this direction.
    #[inline]
    pub const fn lines(self) -> (bool, bool) {
        match self {
            Direction::Stop => (false, false),
            Direction::Forward => (true, false),
            Direction::Backward => (false, true),
        }
    }
}

/// Sequencing state of a bridge.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DriveState {
    /// Lines match this direction.
    Applied(Direction),
    /// Lines are held low until `deadline` (µs, wrapping), then `target` is applied.
    PendingSettle { target: Direction, deadline: u32 },
}

/// Motor output contract used by the control loop.
pub trait WheelDrive {
    /// Request a direction. Repeating the current (or pending) direction does nothing.
    fn set_direction(&mut self, dir: Direction, now_us: u32);

    /// Request a direction from a raw code; unknown codes are ignored.
    fn set_direction_code(&mut self, code: u8, now_us: u32) {
        if let Some(dir) = Direction::from_code(code) {
            self.set_direction(dir, now_us);
        }
    }

    /// Write a drive level in percent, clamped to the configured drive range.
    fn set_pwm(&mut self, magnitude: u16);

    /// Complete a pending direction change once its settle deadline has passed.
    fn poll(&mut self, now_us: u32);

    /// Direction currently on the lines.
    fn direction(&self) -> Direction;

    /// Last drive level written, after clamping.
    fn pwm_level(&self) -> u16;
}

/// H-bridge built from two direction pins and a PWM channel.
pub struct HBridge<A, B, P> {
    in_a: A,
    in_b: B,
    pwm: P,
    state: DriveState,
    pwm_level: u16,
    min_drive: u16,
    max_drive: u16,
    settle_us: u32,
}

impl<A, B, P> HBridge<A, B, P>
where
    A: OutputPin,
    B: OutputPin,
    P: PwmPin<Duty = u16>,
{
    /// Take ownership of the pins, drive both lines low and enable PWM at zero duty.
    pub fn new(mut in_a: A, mut in_b: B, mut pwm: P) -> Self {
        let _ = in_a.set_low();
        let _ = in_b.set_low();
        pwm.set_duty(0);
        pwm.enable();

        Self {
            in_a,
            in_b,
            pwm,
            state: DriveState::Applied(Direction::Stop),
            pwm_level: 0,
            min_drive: MIN_DRIVE,
            max_drive: MAX_DRIVE,
            settle_us: SETTLE_US,
        }
    }

    /// Override the drive clamp range (percent).
    pub fn with_drive_range(mut self, min: u16, max: u16) -> Self {
        let (lo, hi) = (min.min(max), max.max(min));
        self.max_drive = hi.min(DRIVE_FULL_SCALE);
        self.min_drive = lo.min(self.max_drive);
        self
    }

    /// Override the direction-change settle time.
    pub fn with_settle_us(mut self, settle_us: u32) -> Self {
        self.settle_us = settle_us;
        self
    }

    #[inline]
    pub fn state(&self) -> DriveState {
        self.state
    }

    /// Direction the bridge is heading to, including a pending change.
    #[inline]
    pub fn target(&self) -> Direction {
        match self.state {
            DriveState::Applied(dir) => dir,
            DriveState::PendingSettle { target, .. } => target,
        }
    }

    /// Hardware duty value for a drive level in percent.
    #[inline]
    pub fn duty_for(&self, magnitude: u16) -> u16 {
        let level = magnitude.clamp(self.min_drive, self.max_drive);
        ((level as u32 * self.pwm.get_max_duty() as u32) / DRIVE_FULL_SCALE as u32) as u16
    }

    fn drive_lines(&mut self, dir: Direction) {
        // Release before asserting so both lines are never high together.
        match dir.lines() {
            (true, false) => {
                let _ = self.in_b.set_low();
                let _ = self.in_a.set_high();
            }
            (false, true) => {
                let _ = self.in_a.set_low();
                let _ = self.in_b.set_high();
            }
            _ => {
                let _ = self.in_a.set_low();
                let _ = self.in_b.set_low();
            }
        }
    }
}

impl<A, B, P> WheelDrive for HBridge<A, B, P>
where
    A: OutputPin,
    B: OutputPin,
    P: PwmPin<Duty = u16>,
{
    fn set_direction(&mut self, dir: Direction, now_us: u32) {
        if dir == self.target() {
            return;
        }

        self.drive_lines(Direction::Stop);

        self.state = match dir {
            Direction::Stop => DriveState::Applied(Direction::Stop),
            target => DriveState::PendingSettle {
                target,
                deadline: now_us.wrapping_add(self.settle_us),
            },
        };
    }

    fn set_pwm(&mut self, magnitude: u16) {
        let duty = self.duty_for(magnitude);
        self.pwm_level = magnitude.clamp(self.min_drive, self.max_drive);
        self.pwm.set_duty(duty);
    }

    fn poll(&mut self, now_us: u32) {
        if let DriveState::PendingSettle { target, deadline } = self.state {
            if now_us.wrapping_sub(deadline) as i32 >= 0 {
                self.drive_lines(target);
                self.state = DriveState::Applied(target);
            }
        }
    }

    fn direction(&self) -> Direction {
        match self.state {
            DriveState::Applied(dir) => dir,
            DriveState::PendingSettle { .. } => Direction::Stop,
        }
    }

    fn pwm_level(&self) -> u16 {
        self.pwm_level
    }
}
