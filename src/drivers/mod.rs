// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Device-Specific Drivers
//!
//! This module contains device-level logic that sits above the raw `hw/` layer and below the
//! control loop. Nothing here touches registers directly, so it runs unchanged in host tests.
//!
//! ## Existing drivers
//!
//! - [`encoder`] – single-edge optical wheel encoders fed by timer input capture
//! - [`hbridge`] – two-line H-bridge with PWM enable and direction-change dead time

pub mod encoder;
pub mod hbridge;

pub use encoder::{EncoderChannel, EncoderReading, Encoders};
pub use hbridge::{Direction, DriveState, HBridge, WheelDrive};
