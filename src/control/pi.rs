// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Integer PI controller for closed-loop wheel-speed control.
//!
//! Works in `no_std`, does not allocate, and uses no floating point. There is no derivative term.

/// PI controller with tunable gains, output clamping and integrator clamping (anti-windup).
#[derive(Clone, Debug)]
pub struct PiController {
    /// Proportional gain
    kp: i32,
    /// Integral gain
    ki: i32,

    /// Integrator state
    integrator: i32,
    /// Last computed output
    out: i32,

    /// Output clamp
    out_min: i32,
    out_max: i32,

    /// Integral anti-windup clamp
    int_min: i32,
    int_max: i32,

    /// Divisor applied to `error * delta_t` before accumulation
    integral_scale: i32,
}

impl PiController {
    /// Create a new PI controller.
    ///
    /// `kp`, `ki` are the gain constants. Limits default to `[-100, 100]` for both the output and
    /// the integrator, and the integral scale defaults to 1.
    pub fn new(kp: i32, ki: i32) -> Self {
        Self {
            kp,
            ki,

            integrator: 0,
            out: 0,

            out_min: -100,
            out_max: 100,

            int_min: -100,
            int_max: 100,

            integral_scale: 1,
        }
    }

    /// Set output limits.
    pub fn with_output_limits(mut self, min: i32, max: i32) -> Self {
        self.out_min = min.min(max);
        self.out_max = max.max(min);
        self.out = self.out.clamp(self.out_min, self.out_max);
        self
    }

    /// Set integral limits for anti-windup.
    pub fn with_integral_limits(mut self, min: i32, max: i32) -> Self {
        self.int_min = min.min(max);
        self.int_max = max.max(min);
        self.integrator = self.integrator.clamp(self.int_min, self.int_max);
        self
    }

    /// Set the divisor applied to `error * delta_t` before it is added to the integrator.
    ///
    /// Values below 1 are treated as 1.
    pub fn with_integral_scale(mut self, scale: i32) -> Self {
        self.integral_scale = scale.max(1);
        self
    }

    /// Reset integrator and output.
    pub fn reset(&mut self) {
        self.integrator = 0.clamp(self.int_min, self.int_max);
        self.out = 0.clamp(self.out_min, self.out_max);
    }

    /// Update the controller.
    ///
    /// `setpoint`: desired speed
    /// `measurement`: measured speed, in the same units
    /// `delta_t`: elapsed time since the previous update
    ///
    /// Returns the command clamped to [`out_min`, `out_max`]. A `delta_t` of zero leaves the
    /// integrator untouched.
    pub fn update(&mut self, setpoint: i32, measurement: i32, delta_t: u32) -> i32 {
        let error = setpoint as i64 - measurement as i64;

        // ----- I term -----
        let step = error.saturating_mul(delta_t as i64) / self.integral_scale as i64;
        self.integrator = clamp_to(
            (self.integrator as i64).saturating_add(step),
            self.int_min,
            self.int_max,
        );

        // ----- Output clamp -----
        let p = (self.kp as i64).saturating_mul(error);
        let i = (self.ki as i64).saturating_mul(self.integrator as i64);
        self.out = clamp_to(p.saturating_add(i), self.out_min, self.out_max);

        self.out
    }

    /// Output of the most recent update.
    #[inline]
    pub fn output(&self) -> i32 {
        self.out
    }

    /// Current integrator value.
    #[inline]
    pub fn integrator(&self) -> i32 {
        self.integrator
    }
}

#[inline]
fn clamp_to(value: i64, min: i32, max: i32) -> i32 {
    value.clamp(min as i64, max as i64) as i32
}
