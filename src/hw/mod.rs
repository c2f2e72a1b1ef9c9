// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! MCU-level wrappers for the STM32F777: timers, PWM, USART and pin assignments.

pub mod capture;
pub mod pins;
pub mod pwm;
pub mod tick;
pub mod usart;

pub use capture::EdgeCapture;
pub use pins::BoardPins;
pub use pwm::PwmChannel;
pub use tick::{Clock, TickTimer};
pub use usart::Usart;
