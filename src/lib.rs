// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Rover Firmware
//!
//! Wheel-speed control core for the two-wheeled rover, written in Rust, targeting an STM32F777
//! MCU. Each wheel carries a single-edge optical encoder, an H-bridge with two direction lines,
//! and a PWM enable. A fixed-rate timer interrupt closes an integer PI loop around the encoder
//! period and writes the result to the PWM duty register.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`config`] | Compile-time tuning: gains, limits, tick period, drive range |
//! | [`drivers`] | Encoder capture bookkeeping and H-bridge motor drive |
//! | [`control`] | PI law, control-loop scheduler, setpoint/direction command surface |
//! | [`protocol`] | Framed serial commands that feed the command surface |
//! | `hw` | MCU-level wrappers around timers, PWM and USART (`firmware` feature only) |
//!
//! Everything outside `hw` is hardware-agnostic and is unit tested on the host:
//!
//! ```bash
//! cargo test
//! ```
//!
//! ## Getting Started
//!
//! Build docs:
//!
//! ```bash
//! cargo doc --no-deps --open
//! ```
//!
//! Flash the board:
//!
//! ```bash
//! cargo run --release --features firmware --target thumbv7em-none-eabihf
//! ```
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//! See the `LICENSE` file in the repository root for full terms.
//!
//! © 2025–2026 Christopher Liu

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod control;
pub mod drivers;
#[cfg(feature = "firmware")]
pub mod hw;
pub mod protocol;
pub mod wheel;

pub use wheel::Wheel;
