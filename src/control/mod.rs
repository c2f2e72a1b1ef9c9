// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Control Algorithms
//!
//! Closed-loop wheel-speed control.
//!
//! ## Modules
//!
//! - [`pi`] - Integer PI controller with output and integrator clamping.
//! - [`control_loop`] - Per-tick scheduler tying encoder periods to motor PWM.
//! - [`commands`] - Setpoints and direction intents written by the command context.

pub mod commands;
pub mod control_loop;
pub mod pi;

pub use commands::Commands;
pub use control_loop::{ControlLoop, LoopState, LoopStats, TickReport, TickSource, WheelReport};
pub use pi::PiController;
