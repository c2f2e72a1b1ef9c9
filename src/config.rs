// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Compile-time tuning for the rover.
//!
//! All values are integers. Speeds are in vanes per second, time in microseconds, drive levels
//! in percent of full PWM duty.

use crate::control::PiController;

// ================================
// Control tick
// ================================

/// Period of the control-loop timer interrupt.
#[cfg(not(feature = "fast-tick"))]
pub const TICK_PERIOD_US: u32 = 33_333;

/// Period of the control-loop timer interrupt.
#[cfg(feature = "fast-tick")]
pub const TICK_PERIOD_US: u32 = 1_000;

/// Consecutive stale encoder readings tolerated before a wheel is treated as stopped.
pub const STALE_TICK_LIMIT: u8 = stale_tick_limit(TICK_PERIOD_US);

/// Slowest wheel speed (vanes per second) the encoder can report at the configured tick.
///
/// About 30 at the default 33.333 ms tick, 15 with `fast-tick`. Below it every reading is stale and the
/// wheel is eventually treated as stopped.
pub const MIN_MEASURABLE_SPEED: u32 = min_measurable_speed(TICK_PERIOD_US);

// ================================
// Encoder
// ================================

/// Numerator of the period-to-speed conversion: one vane per microsecond of period.
pub const SPEED_SCALE: u32 = 1_000_000;

/// Span of the 16-bit capture counter.
pub const CAPTURE_WRAP_US: u32 = 65_536;

/// Number of control ticks that fit in one capture-counter wrap.
///
/// A lone edge may be paired with the last edge of an earlier read only while both provably lie
/// within one wrap, i.e. while the reads between them plus one span at most this many ticks.
pub const fn anchor_span(tick_us: u32) -> u8 {
    let tick = if tick_us == 0 { 1 } else { tick_us };
    let span = CAPTURE_WRAP_US / tick;
    if span > u8::MAX as u32 {
        u8::MAX
    } else {
        span as u8
    }
}

/// Stale ticks to hold before treating a wheel as stopped: long enough to wait out the slowest
/// period the encoder can still measure, and never fewer than 3.
pub const fn stale_tick_limit(tick_us: u32) -> u8 {
    let ticks = anchor_span(tick_us) as u32 + 1;
    if ticks < 3 {
        3
    } else if ticks > MAX_STALE_TICK_LIMIT as u32 {
        MAX_STALE_TICK_LIMIT
    } else {
        ticks as u8
    }
}

/// Largest usable stale limit; the stale counter saturates one above it.
pub const MAX_STALE_TICK_LIMIT: u8 = u8::MAX - 1;

/// Speed of the longest vane period measurable at `tick_us`.
pub const fn min_measurable_speed(tick_us: u32) -> u32 {
    let tick = if tick_us == 0 { 1 } else { tick_us };
    let span = anchor_span(tick) as u32;
    let longest = if span >= 2 { (span - 1) * tick } else { tick };
    SPEED_SCALE / longest
}

// ================================
// PI gains and limits
// ================================

pub const PI_LEFT_KP: i32 = 10;
pub const PI_LEFT_KI: i32 = 1;
pub const PI_RIGHT_KP: i32 = 10;
pub const PI_RIGHT_KI: i32 = 1;

/// Output clamp, in drive percent.
pub const PI_LIM_MIN: i32 = 0;
pub const PI_LIM_MAX: i32 = 100;

/// Integrator clamp.
pub const PI_LIM_MIN_INT: i32 = 0;
pub const PI_LIM_MAX_INT: i32 = 100;

/// Divisor applied to `error * delta_t` before it enters the integrator.
pub const PI_INTEGRAL_SCALE: i32 = 100_000;

// ================================
// Motor drive
// ================================

/// Lowest duty that overcomes static friction on the drive motors.
pub const MIN_DRIVE: u16 = 50;
/// Highest commanded duty.
pub const MAX_DRIVE: u16 = 100;
/// Drive value that maps to the full hardware duty range.
pub const DRIVE_FULL_SCALE: u16 = 100;

/// Dead time with both direction lines low before a new direction is applied.
pub const SETTLE_US: u32 = 5_000;

/// Setpoint increment used by the speed up / slow down commands.
pub const SPEED_STEP: i32 = 5;

// ================================
// Hardware clocks
// ================================

/// Timer kernel clock with the default (HSI) clock tree.
pub const TIMER_KERNEL_HZ: u32 = 16_000_000;
/// All timers in use count in microseconds.
pub const TIMER_COUNT_HZ: u32 = 1_000_000;
/// PWM carrier period (1 kHz).
pub const PWM_PERIOD_US: u32 = 1_000;

/// NVIC priorities; lower is more urgent. Capture must be able to preempt the control tick.
pub const CAPTURE_PRIORITY: u8 = 0x10;
pub const TICK_PRIORITY: u8 = 0x20;

// ================================
// Console
// ================================

pub const CONSOLE_BAUD: u32 = 115_200;

/// Interval between telemetry lines on the console.
pub const TELEMETRY_PERIOD_US: u32 = 500_000;

/// Left wheel PI controller with the tuned gains.
pub fn left_pi() -> PiController {
    PiController::new(PI_LEFT_KP, PI_LEFT_KI)
        .with_output_limits(PI_LIM_MIN, PI_LIM_MAX)
        .with_integral_limits(PI_LIM_MIN_INT, PI_LIM_MAX_INT)
        .with_integral_scale(PI_INTEGRAL_SCALE)
}

/// Right wheel PI controller with the tuned gains.
pub fn right_pi() -> PiController {
    PiController::new(PI_RIGHT_KP, PI_RIGHT_KI)
        .with_output_limits(PI_LIM_MIN, PI_LIM_MAX)
        .with_integral_limits(PI_LIM_MIN_INT, PI_LIM_MAX_INT)
        .with_integral_scale(PI_INTEGRAL_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measurable_range_follows_tick() {
        assert_eq!(anchor_span(33_333), 1);
        assert_eq!(anchor_span(1_000), 65);
        assert_eq!(anchor_span(0), u8::MAX);

        // Two edges inside one 33.333 ms tick, or one edge paired across up to 64 ms of 1 ms ticks.
        assert_eq!(min_measurable_speed(33_333), 30);
        assert_eq!(min_measurable_speed(1_000), 15);
        assert!(MIN_MEASURABLE_SPEED <= 30);
    }
}
