// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Pin definitions for the rover on the STM32F777.

use stm32f7xx_hal::{
    gpio::{gpioa, gpiod, gpioe, Alternate, Output, PushPull},
    pac,
    prelude::*,
};

/// All board pins. Construct this once at startup using:
///
/// ```ignore
/// let pins = BoardPins::new(dp.GPIOA, dp.GPIOD, dp.GPIOE);
/// ```
pub struct BoardPins {
    pub status_led: gpiod::PD10<Output<PushPull>>,
    pub usart1: Usart1Pins,
    pub encoder: EncoderPins,
    pub left: WheelPins<gpioe::PE7<Output<PushPull>>, gpioe::PE8<Output<PushPull>>>,
    pub right: WheelPins<gpioe::PE9<Output<PushPull>>, gpioe::PE10<Output<PushPull>>>,
    pub pwm: PwmPins,
}

pub struct Usart1Pins {
    pub tx: gpioa::PA9<Alternate<7>>,
    pub rx: gpioa::PA10<Alternate<7>>,
}

/// TIM2 input capture, one optical vane sensor per wheel
pub struct EncoderPins {
    pub left: gpioa::PA0<Alternate<1>>,  // TIM2_CH1
    pub right: gpioa::PA1<Alternate<1>>, // TIM2_CH2
}

/// H-bridge direction lines for one wheel
pub struct WheelPins<A, B> {
    pub in_a: A,
    pub in_b: B,
}

pub struct PwmPins {
    pub left: gpiod::PD12<Alternate<2>>,  // TIM4_CH1
    pub right: gpiod::PD13<Alternate<2>>, // TIM4_CH2
}

impl BoardPins {
    /// Create all named pins from raw GPIO peripherals.
    ///
    /// Direction lines come up low so both bridges start in the stop pattern.
    pub fn new(gpioa: pac::GPIOA, gpiod: pac::GPIOD, gpioe: pac::GPIOE) -> Self {
        let gpioa = gpioa.split();
        let gpiod = gpiod.split();
        let gpioe = gpioe.split();

        let mut status_led = gpiod.pd10.into_push_pull_output();
        // Active low
        status_led.set_high();

        let mut left_a = gpioe.pe7.into_push_pull_output();
        let mut left_b = gpioe.pe8.into_push_pull_output();
        let mut right_a = gpioe.pe9.into_push_pull_output();
        let mut right_b = gpioe.pe10.into_push_pull_output();
        left_a.set_low();
        left_b.set_low();
        right_a.set_low();
        right_b.set_low();

        Self {
            status_led,

            usart1: Usart1Pins {
                tx: gpioa.pa9.into_alternate::<7>(),
                rx: gpioa.pa10.into_alternate::<7>(),
            },

            encoder: EncoderPins {
                left: gpioa.pa0.into_alternate::<1>(),
                right: gpioa.pa1.into_alternate::<1>(),
            },

            left: WheelPins {
                in_a: left_a,
                in_b: left_b,
            },

            right: WheelPins {
                in_a: right_a,
                in_b: right_b,
            },

            pwm: PwmPins {
                left: gpiod.pd12.into_alternate::<2>(),
                right: gpiod.pd13.into_alternate::<2>(),
            },
        }
    }
}
