// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Fixed-period control loop.
//!
//! [`ControlLoop::fire`] is the body of the control-tick interrupt. Once per firing it, for each
//! wheel:
//!
//! 1. applies the commanded direction intent and completes any settled direction change,
//! 2. reads the encoder period (which resets the encoder baseline),
//! 3. runs the PI law on `(setpoint, speed, elapsed µs)`,
//! 4. writes `|output|` to the wheel's PWM.
//!
//! and then clears the timer's pending flag, exactly once, armed or not.
//!
//! Stale readings (no new vane period) hold the previous output and freeze the integrator. After
//! more than `stale_limit` consecutive stale ticks the wheel is taken to be stopped and a speed of
//! zero is fed through, so a wheel at rest still receives drive.
//!
//! Typical usage from the timer interrupt:
//!
//! ```ignore
//! #[interrupt]
//! fn TIM6_DAC() {
//!     static mut CONTROL: Option<(Rover, TickTimer)> = None;
//!     // ... moved in once from the startup hand-off
//!     if let Some((ctl, tick)) = CONTROL.as_mut() {
//!         ctl.fire(tick, &ENCODERS, &COMMANDS);
//!     }
//! }
//! ```

use crate::config::{stale_tick_limit, MAX_STALE_TICK_LIMIT, STALE_TICK_LIMIT, TICK_PERIOD_US};
use crate::control::{Commands, PiController};
use crate::drivers::{Direction, EncoderReading, Encoders, WheelDrive};
use crate::wheel::{Wheel, WHEEL_COUNT};

/// Timer behind the control tick.
pub trait TickSource {
    /// Free-running microsecond clock, wrapping at 2^32.
    fn now_us(&self) -> u32;

    /// Clear the update-pending flag that triggered this firing.
    fn clear_pending(&mut self);
}

/// Whether firings run the control law.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoopState {
    Disarmed,
    Armed,
}

/// Timing of armed firings.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub firings: u32,
    /// Firings whose body took at least one tick period.
    pub overruns: u32,
    pub last_body_us: u32,
    pub max_body_us: u32,
}

impl LoopStats {
    fn record(&mut self, body_us: u32, period_us: u32) {
        self.firings = self.firings.wrapping_add(1);
        self.last_body_us = body_us;
        self.max_body_us = self.max_body_us.max(body_us);
        if body_us >= period_us {
            self.overruns = self.overruns.saturating_add(1);
        }
    }
}

/// What one wheel did during a tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WheelReport {
    pub setpoint: i32,
    /// Raw encoder period in µs; 0 when stale.
    pub period: u16,
    /// Speed fed to the controller, `None` when the output was held.
    pub speed: Option<i32>,
    pub output: i32,
    pub integrator: i32,
    pub pwm: u16,
    pub direction: Direction,
}

/// Snapshot of the latest tick, for telemetry.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub now_us: u32,
    pub delta_t: u32,
    pub wheels: [WheelReport; WHEEL_COUNT],
}

struct WheelLoop<D> {
    pi: PiController,
    drive: D,
    stale_ticks: u8,
}

impl<D: WheelDrive> WheelLoop<D> {
    fn new(pi: PiController, drive: D) -> Self {
        Self {
            pi,
            drive,
            stale_ticks: 0,
        }
    }

    fn step(
        &mut self,
        wheel: Wheel,
        now_us: u32,
        delta_t: u32,
        stale_limit: u8,
        encoders: &Encoders,
        commands: &Commands,
    ) -> WheelReport {
        self.drive
            .set_direction_code(commands.direction_code(wheel), now_us);
        self.drive.poll(now_us);

        let period = encoders.calculate_speed(wheel);
        let speed = match EncoderReading::from_period(period).speed() {
            Some(speed) => {
                self.stale_ticks = 0;
                Some(speed)
            }
            None => {
                self.stale_ticks = self.stale_ticks.saturating_add(1);
                if self.stale_ticks > stale_limit {
                    Some(0)
                } else {
                    None
                }
            }
        };

        let setpoint = commands.setpoint(wheel);
        let output = match speed {
            Some(speed) => self.pi.update(setpoint, speed, delta_t),
            None => self.pi.output(),
        };

        let magnitude = output.unsigned_abs().min(u16::MAX as u32) as u16;
        self.drive.set_pwm(magnitude);

        WheelReport {
            setpoint,
            period,
            speed,
            output,
            integrator: self.pi.integrator(),
            pwm: self.drive.pwm_level(),
            direction: self.drive.direction(),
        }
    }
}

/// Closed-loop speed control of both wheels.
pub struct ControlLoop<L, R> {
    left: WheelLoop<L>,
    right: WheelLoop<R>,
    state: LoopState,
    period_us: u32,
    stale_limit: u8,
    last_fire_us: Option<u32>,
    stats: LoopStats,
}

impl<L: WheelDrive, R: WheelDrive> ControlLoop<L, R> {
    /// Create a disarmed loop from each wheel's controller and drive.
    pub fn new(left_pi: PiController, left: L, right_pi: PiController, right: R) -> Self {
        Self {
            left: WheelLoop::new(left_pi, left),
            right: WheelLoop::new(right_pi, right),
            state: LoopState::Disarmed,
            period_us: TICK_PERIOD_US,
            stale_limit: STALE_TICK_LIMIT,
            last_fire_us: None,
            stats: LoopStats::default(),
        }
    }

    /// Nominal tick period; used for the first `delta_t` and for overrun detection.
    ///
    /// Also resets the stale limit to the one matching this period.
    pub fn with_period_us(mut self, period_us: u32) -> Self {
        self.period_us = period_us;
        self.stale_limit = stale_tick_limit(period_us);
        self
    }

    /// Stale ticks tolerated before a wheel is treated as stopped, at most
    /// [`MAX_STALE_TICK_LIMIT`].
    pub fn with_stale_limit(mut self, ticks: u8) -> Self {
        self.stale_limit = ticks.min(MAX_STALE_TICK_LIMIT);
        self
    }

    pub fn arm(&mut self) {
        self.state = LoopState::Armed;
    }

    pub fn disarm(&mut self) {
        self.state = LoopState::Disarmed;
        self.last_fire_us = None;
    }

    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Interrupt body. Runs one tick when armed and always clears the pending flag once.
    pub fn fire<T: TickSource>(
        &mut self,
        timer: &mut T,
        encoders: &Encoders,
        commands: &Commands,
    ) -> Option<TickReport> {
        let report = match self.state {
            LoopState::Armed => {
                let start = timer.now_us();
                let report = self.tick(start, encoders, commands);
                let body = timer.now_us().wrapping_sub(start);
                self.stats.record(body, self.period_us);
                Some(report)
            }
            LoopState::Disarmed => None,
        };

        timer.clear_pending();
        report
    }

    /// Run the control law for both wheels at time `now_us`.
    pub fn tick(&mut self, now_us: u32, encoders: &Encoders, commands: &Commands) -> TickReport {
        let delta_t = match self.last_fire_us {
            Some(prev) => now_us.wrapping_sub(prev),
            None => self.period_us,
        };
        self.last_fire_us = Some(now_us);

        let left = self.left.step(
            Wheel::Left,
            now_us,
            delta_t,
            self.stale_limit,
            encoders,
            commands,
        );
        let right = self.right.step(
            Wheel::Right,
            now_us,
            delta_t,
            self.stale_limit,
            encoders,
            commands,
        );

        TickReport {
            now_us,
            delta_t,
            wheels: [left, right],
        }
    }

    #[inline]
    pub fn stats(&self) -> LoopStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;

    use crate::config::{self, MIN_DRIVE, SETTLE_US};
    use crate::drivers::hbridge::tests::{fake_bridge, FakeBridge, FakePin, FakePwm};

    struct FakeTimer {
        now: Cell<u32>,
        /// Added to the clock on every read, to model body time.
        step: u32,
        clears: u32,
    }

    impl FakeTimer {
        fn new() -> Self {
            Self {
                now: Cell::new(0),
                step: 0,
                clears: 0,
            }
        }

        fn at(&self, now: u32) {
            self.now.set(now);
        }
    }

    impl TickSource for FakeTimer {
        fn now_us(&self) -> u32 {
            let now = self.now.get();
            self.now.set(now.wrapping_add(self.step));
            now
        }

        fn clear_pending(&mut self) {
            self.clears += 1;
        }
    }

    struct Rig {
        ctl: ControlLoop<FakeBridge, FakeBridge>,
        left_pins: (FakePin, FakePin, FakePwm),
        right_pins: (FakePin, FakePin, FakePwm),
    }

    fn rig(left_pi: PiController, right_pi: PiController) -> Rig {
        let (left, la, lb, lpwm) = fake_bridge();
        let (right, ra, rb, rpwm) = fake_bridge();
        let mut ctl = ControlLoop::new(left_pi, left, right_pi, right).with_period_us(1_000);
        ctl.arm();
        Rig {
            ctl,
            left_pins: (la, lb, lpwm),
            right_pins: (ra, rb, rpwm),
        }
    }

    fn unit_pi() -> PiController {
        PiController::new(1, 1)
            .with_output_limits(0, 100)
            .with_integral_limits(0, 100)
            .with_integral_scale(1_000)
    }

    #[test]
    fn pending_flag_cleared_once_per_firing() {
        let encoders = Encoders::new();
        let commands = Commands::new();
        let mut rig = rig(unit_pi(), unit_pi());
        let mut timer = FakeTimer::new();

        assert!(rig.ctl.fire(&mut timer, &encoders, &commands).is_some());
        assert_eq!(timer.clears, 1);

        rig.ctl.disarm();
        assert_eq!(rig.ctl.state(), LoopState::Disarmed);
        assert!(rig.ctl.fire(&mut timer, &encoders, &commands).is_none());
        assert_eq!(timer.clears, 2);
        assert_eq!(rig.ctl.stats().firings, 1);
    }

    #[test]
    fn disarmed_loop_leaves_encoders_and_pwm_alone() {
        let encoders = Encoders::new();
        let commands = Commands::new();
        let (left, _, _, lpwm) = fake_bridge();
        let (right, _, _, _) = fake_bridge();
        let mut ctl = ControlLoop::new(unit_pi(), left, unit_pi(), right);
        let mut timer = FakeTimer::new();

        encoders.on_edge_captured(Wheel::Left, 100);
        encoders.on_edge_captured(Wheel::Left, 600);
        ctl.fire(&mut timer, &encoders, &commands);

        assert_eq!(encoders.snapshot(Wheel::Left).edges(), 2);
        assert_eq!(lpwm.duty.get(), 0);
        assert_eq!(timer.clears, 1);
    }

    #[test]
    fn slow_wheel_is_driven_harder() {
        let encoders = Encoders::new();
        let commands = Commands::new();
        let mut rig = rig(config::left_pi(), config::right_pi());
        let mut timer = FakeTimer::new();

        commands.forward(100);
        // 20 ms per vane = 50 vanes/s, half the setpoint.
        encoders.on_edge_captured(Wheel::Left, 0);
        encoders.on_edge_captured(Wheel::Left, 20_000);

        let report = rig.ctl.fire(&mut timer, &encoders, &commands).unwrap();
        let left = report.wheels[0];
        assert_eq!(left.period, 20_000);
        assert_eq!(left.speed, Some(50));
        assert_eq!(left.setpoint, 100);
        assert_eq!(left.output, 100);
        assert_eq!(left.pwm, 100);
        assert_eq!(rig.left_pins.2.duty.get(), 1_000);

        // Encoder baseline was consumed by the tick.
        assert_eq!(encoders.calculate_speed(Wheel::Left), 0);
    }

    #[test]
    fn stale_readings_hold_then_count_as_stopped() {
        let encoders = Encoders::new();
        let commands = Commands::new();
        let mut rig = rig(unit_pi(), unit_pi());
        let limit = u32::from(config::stale_tick_limit(1_000));
        let timer = FakeTimer::new();

        commands.set_motor(Wheel::Left, Direction::Forward, 60);
        encoders.on_edge_captured(Wheel::Left, 1_000);
        encoders.on_edge_captured(Wheel::Left, 51_000);

        // 50 ms per vane = 20 vanes/s: error 40.
        timer.at(0);
        let first = rig.ctl.tick(timer.now_us(), &encoders, &commands).wheels[0];
        assert_eq!(first.speed, Some(20));
        assert_eq!(first.integrator, 40);
        assert_eq!(first.output, 80);

        for k in 1..=limit {
            let held = rig.ctl.tick(k * 1_000, &encoders, &commands).wheels[0];
            assert_eq!(held.period, 0);
            assert_eq!(held.speed, None);
            assert_eq!(held.output, 80);
            assert_eq!(held.integrator, 40);
            assert_eq!(held.pwm, 80);
        }

        let stopped = rig
            .ctl
            .tick((limit + 1) * 1_000, &encoders, &commands)
            .wheels[0];
        assert_eq!(stopped.speed, Some(0));
        assert_eq!(stopped.integrator, 100);
        assert_eq!(stopped.output, 100);

        // A fresh period resets the stale count.
        encoders.on_edge_captured(Wheel::Left, 0);
        encoders.on_edge_captured(Wheel::Left, 10_000);
        let fresh = rig
            .ctl
            .tick((limit + 2) * 1_000, &encoders, &commands)
            .wheels[0];
        assert_eq!(fresh.speed, Some(100));
        let held = rig
            .ctl
            .tick((limit + 3) * 1_000, &encoders, &commands)
            .wheels[0];
        assert_eq!(held.speed, None);
    }

    #[test]
    fn vane_period_longer_than_tick_is_measured() {
        // 1 ms ticks, one vane every 5 ms: a steady 200 vanes/s on target.
        let encoders = Encoders::with_tick_period(1_000);
        let commands = Commands::new();
        let mut rig = rig(config::left_pi(), config::right_pi());
        commands.forward(200);

        let mut measured = 0;
        for t in 0u32..200 {
            if t % 5 == 0 {
                encoders.on_edge_captured(Wheel::Left, (t * 1_000) as u16);
            }
            let left = rig.ctl.tick(t * 1_000, &encoders, &commands).wheels[0];
            match left.speed {
                Some(speed) => {
                    assert_eq!(speed, 200, "tick {t}");
                    measured += 1;
                }
                None => assert!(t % 5 != 0 || t == 0, "tick {t}"),
            }
        }

        assert_eq!(measured, 39);
    }

    #[test]
    fn stale_limit_is_capped_so_stopped_is_reachable() {
        let encoders = Encoders::new();
        let commands = Commands::new();
        let (left, _, _, _) = fake_bridge();
        let (right, _, _, _) = fake_bridge();
        let mut ctl = ControlLoop::new(unit_pi(), left, unit_pi(), right)
            .with_period_us(1_000)
            .with_stale_limit(u8::MAX);

        let mut stopped_at = None;
        for t in 0u32..300 {
            let report = ctl.tick(t * 1_000, &encoders, &commands);
            if report.wheels[0].speed == Some(0) {
                stopped_at = Some(t);
                break;
            }
        }
        assert_eq!(stopped_at, Some(u32::from(MAX_STALE_TICK_LIMIT)));
    }

    #[test]
    fn stale_limit_follows_tick_period() {
        assert_eq!(config::stale_tick_limit(33_333), 3);
        assert_eq!(config::stale_tick_limit(1_000), 66);
        assert_eq!(config::stale_tick_limit(1), MAX_STALE_TICK_LIMIT);
    }

    #[test]
    fn delta_t_is_time_between_firings() {
        let encoders = Encoders::new();
        let commands = Commands::new();
        let mut rig = rig(
            PiController::new(0, 1)
                .with_integral_limits(0, 10_000)
                .with_output_limits(0, 10_000),
            unit_pi(),
        );

        commands.set_setpoint(Wheel::Left, 10);
        let mut report = TickReport::default();
        for now in [0u32, 1_000, 3_500] {
            encoders.on_edge_captured(Wheel::Left, 0);
            encoders.on_edge_captured(Wheel::Left, 50_000);
            report = rig.ctl.tick(now, &encoders, &commands);
        }

        // Measured 20 against a setpoint of 10 keeps the integrator pinned at 0.
        assert_eq!(report.delta_t, 2_500);
        commands.set_setpoint(Wheel::Left, 21);
        encoders.on_edge_captured(Wheel::Left, 0);
        encoders.on_edge_captured(Wheel::Left, 50_000);
        let report = rig.ctl.tick(5_500, &encoders, &commands);
        assert_eq!(report.delta_t, 2_000);
        assert_eq!(report.wheels[0].integrator, 2_000);
    }

    #[test]
    fn direction_intent_applied_after_settle() {
        let encoders = Encoders::new();
        let commands = Commands::new();
        let mut rig = rig(unit_pi(), unit_pi());

        commands.forward(30);
        let report = rig.ctl.tick(0, &encoders, &commands);
        assert_eq!(report.wheels[0].direction, Direction::Stop);
        assert!(!rig.left_pins.0.level.get());

        let report = rig.ctl.tick(SETTLE_US, &encoders, &commands);
        assert_eq!(report.wheels[0].direction, Direction::Forward);
        assert_eq!(report.wheels[1].direction, Direction::Forward);
        assert_eq!(
            (rig.left_pins.0.level.get(), rig.left_pins.1.level.get()),
            (true, false)
        );
        assert_eq!(
            (rig.right_pins.0.level.get(), rig.right_pins.1.level.get()),
            (true, false)
        );
    }

    #[test]
    fn zero_output_still_writes_drive_floor() {
        let encoders = Encoders::new();
        let commands = Commands::new();
        let mut rig = rig(unit_pi(), unit_pi());

        let report = rig.ctl.tick(0, &encoders, &commands);
        assert_eq!(report.wheels[1].output, 0);
        assert_eq!(report.wheels[1].pwm, MIN_DRIVE);
        assert_eq!(rig.right_pins.2.duty.get(), MIN_DRIVE * 10);
    }

    #[test]
    fn zero_stale_limit_feeds_stopped_at_once() {
        let encoders = Encoders::new();
        let commands = Commands::new();
        let (left, _, _, _) = fake_bridge();
        let (right, _, _, _) = fake_bridge();
        let mut ctl = ControlLoop::new(unit_pi(), left, unit_pi(), right)
            .with_period_us(1_000)
            .with_stale_limit(0);

        commands.set_setpoint(Wheel::Left, 10);
        let report = ctl.tick(0, &encoders, &commands);
        assert_eq!(report.wheels[0].speed, Some(0));
        assert_eq!(report.wheels[0].integrator, 10);
        assert_eq!(report.wheels[0].output, 20);
    }

    #[test]
    fn overruns_are_counted() {
        let encoders = Encoders::new();
        let commands = Commands::new();
        let mut rig = rig(unit_pi(), unit_pi());
        let mut timer = FakeTimer::new();

        rig.ctl.fire(&mut timer, &encoders, &commands);
        assert_eq!(rig.ctl.stats().overruns, 0);

        timer.step = 1_500;
        rig.ctl.fire(&mut timer, &encoders, &commands);
        let stats = rig.ctl.stats();
        assert_eq!(stats.firings, 2);
        assert_eq!(stats.overruns, 1);
        assert_eq!(stats.last_body_us, 1_500);
        assert_eq!(stats.max_body_us, 1_500);
        assert_eq!(timer.clears, 2);
    }
}
