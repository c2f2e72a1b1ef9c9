// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Command surface: per-wheel setpoints and direction intents.
//!
//! Written from the main loop (or a serial interrupt) and read by the control tick. Every field is
//! a single word-sized atomic, so the tick never observes a half-written value and no critical
//! section is needed.

use core::sync::atomic::{AtomicI32, AtomicU8, Ordering};

use crate::config::SPEED_STEP;
use crate::drivers::Direction;
use crate::protocol::Command;
use crate::wheel::{Wheel, WHEEL_COUNT};

pub struct Commands {
    setpoints: [AtomicI32; WHEEL_COUNT],
    directions: [AtomicU8; WHEEL_COUNT],
}

impl Commands {
    /// Both wheels stopped with a zero setpoint.
    pub const fn new() -> Self {
        Self {
            setpoints: [AtomicI32::new(0), AtomicI32::new(0)],
            directions: [
                AtomicU8::new(Direction::Stop as u8),
                AtomicU8::new(Direction::Stop as u8),
            ],
        }
    }

    /// Set the desired speed of `wheel` in vanes per second. Negative values are clamped to 0;
    /// reversing is done through the direction intent.
    #[inline]
    pub fn set_setpoint(&self, wheel: Wheel, speed: i32) {
        self.setpoints[wheel.index()].store(speed.max(0), Ordering::Relaxed);
    }

    #[inline]
    pub fn setpoint(&self, wheel: Wheel) -> i32 {
        self.setpoints[wheel.index()].load(Ordering::Relaxed)
    }

    /// Raise or lower the setpoint of `wheel` by `delta`, saturating at 0.
    pub fn nudge_setpoint(&self, wheel: Wheel, delta: i32) {
        let _ = self.setpoints[wheel.index()].fetch_update(
            Ordering::Relaxed,
            Ordering::Relaxed,
            |speed| Some(speed.saturating_add(delta).max(0)),
        );
    }

    /// Raise both setpoints by one speed step.
    pub fn speed_up(&self) {
        for wheel in Wheel::ALL {
            self.nudge_setpoint(wheel, SPEED_STEP);
        }
    }

    /// Lower both setpoints by one speed step.
    pub fn slow_down(&self) {
        for wheel in Wheel::ALL {
            self.nudge_setpoint(wheel, -SPEED_STEP);
        }
    }

    #[inline]
    pub fn set_direction(&self, wheel: Wheel, dir: Direction) {
        self.directions[wheel.index()].store(dir.code(), Ordering::Relaxed);
    }

    /// Raw direction intent. The drive ignores codes it does not know.
    #[inline]
    pub fn direction_code(&self, wheel: Wheel) -> u8 {
        self.directions[wheel.index()].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn direction(&self, wheel: Wheel) -> Option<Direction> {
        Direction::from_code(self.direction_code(wheel))
    }

    /// Direction and speed of one wheel.
    pub fn set_motor(&self, wheel: Wheel, dir: Direction, speed: i32) {
        self.set_direction(wheel, dir);
        self.set_setpoint(wheel, speed);
    }

    /// Direction and speed of both wheels.
    pub fn set_motors(&self, left_dir: Direction, left: i32, right_dir: Direction, right: i32) {
        self.set_motor(Wheel::Left, left_dir, left);
        self.set_motor(Wheel::Right, right_dir, right);
    }

    pub fn forward(&self, speed: i32) {
        self.set_motors(Direction::Forward, speed, Direction::Forward, speed);
    }

    pub fn backward(&self, speed: i32) {
        self.set_motors(Direction::Backward, speed, Direction::Backward, speed);
    }

    /// Turn in place to the left: left wheel backward, right wheel forward.
    pub fn spin_left(&self, speed: i32) {
        self.set_motors(Direction::Backward, speed, Direction::Forward, speed);
    }

    /// Turn in place to the right.
    pub fn spin_right(&self, speed: i32) {
        self.set_motors(Direction::Forward, speed, Direction::Backward, speed);
    }

    pub fn stop(&self) {
        self.set_motors(Direction::Stop, 0, Direction::Stop, 0);
    }

    /// Apply a command decoded from the serial link.
    pub fn apply(&self, cmd: Command) {
        match cmd {
            Command::SetSpeed(wheel, speed) => self.set_setpoint(wheel, speed as i32),
            Command::SetSpeedBoth(speed) => {
                for wheel in Wheel::ALL {
                    self.set_setpoint(wheel, speed as i32);
                }
            }
            Command::Forward(speed) => self.forward(speed as i32),
            Command::Backward(speed) => self.backward(speed as i32),
            Command::Stop => self.stop(),
            Command::SpinLeft(speed) => self.spin_left(speed as i32),
            Command::SpinRight(speed) => self.spin_right(speed as i32),
            Command::SpeedUp => self.speed_up(),
            Command::SlowDown => self.slow_down(),
        }
    }
}

impl Default for Commands {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_stopped() {
        let commands = Commands::new();
        for wheel in Wheel::ALL {
            assert_eq!(commands.setpoint(wheel), 0);
            assert_eq!(commands.direction(wheel), Some(Direction::Stop));
        }
    }

    #[test]
    fn drive_helpers_set_both_wheels() {
        let commands = Commands::new();

        commands.spin_left(40);
        assert_eq!(commands.direction(Wheel::Left), Some(Direction::Backward));
        assert_eq!(commands.direction(Wheel::Right), Some(Direction::Forward));
        assert_eq!(commands.setpoint(Wheel::Left), 40);
        assert_eq!(commands.setpoint(Wheel::Right), 40);

        commands.backward(25);
        assert_eq!(commands.direction(Wheel::Right), Some(Direction::Backward));
        assert_eq!(commands.setpoint(Wheel::Right), 25);

        commands.stop();
        assert_eq!(commands.direction(Wheel::Left), Some(Direction::Stop));
        assert_eq!(commands.setpoint(Wheel::Left), 0);
    }

    #[test]
    fn serial_commands_update_intents() {
        let commands = Commands::new();

        commands.apply(Command::Forward(60));
        commands.apply(Command::SetSpeed(Wheel::Right, 45));
        assert_eq!(commands.setpoint(Wheel::Left), 60);
        assert_eq!(commands.setpoint(Wheel::Right), 45);
        assert_eq!(commands.direction(Wheel::Right), Some(Direction::Forward));

        commands.apply(Command::SpeedUp);
        assert_eq!(commands.setpoint(Wheel::Right), 45 + SPEED_STEP);

        commands.apply(Command::SpinRight(20));
        assert_eq!(commands.direction(Wheel::Left), Some(Direction::Forward));
        assert_eq!(commands.direction(Wheel::Right), Some(Direction::Backward));

        commands.apply(Command::SetSpeedBoth(90));
        assert_eq!(commands.setpoint(Wheel::Left), 90);
        assert_eq!(commands.direction(Wheel::Right), Some(Direction::Backward));

        commands.apply(Command::Stop);
        assert_eq!(commands.direction(Wheel::Left), Some(Direction::Stop));
    }

    #[test]
    fn nudges_saturate_at_zero() {
        let commands = Commands::new();
        commands.set_setpoint(Wheel::Left, 7);
        commands.slow_down();
        assert_eq!(commands.setpoint(Wheel::Left), 2);
        commands.slow_down();
        assert_eq!(commands.setpoint(Wheel::Left), 0);
        assert_eq!(commands.setpoint(Wheel::Right), 0);

        commands.speed_up();
        assert_eq!(commands.setpoint(Wheel::Right), SPEED_STEP);

        commands.set_setpoint(Wheel::Right, -30);
        assert_eq!(commands.setpoint(Wheel::Right), 0);
    }
}
