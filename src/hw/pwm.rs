// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Wheel PWM on TIM4 CH1 (PD12, left) and CH2 (PD13, right).
//!
//! Edge-aligned PWM mode 1 with preload. The duty unit is one timer count, so `get_max_duty()` is
//! `ARR + 1` and a compare value equal to it holds the output high for the whole period.

use embedded_hal::PwmPin;
use stm32f7xx_hal::pac;

use crate::config::{TIMER_COUNT_HZ, TIMER_KERNEL_HZ};

type Tim4Regs = <pac::TIM4 as core::ops::Deref>::Target;

// CCMR1 output-compare fields
const OC1PE: u32 = 1 << 3;
const OC1M_SHIFT: u32 = 4;
const OC2PE: u32 = 1 << 11;
const OC2M_SHIFT: u32 = 12;
const OCM_MASK: u32 = 0b111;
const OCM_PWM1: u32 = 0b110;

// CCER enables
const CC1E: u32 = 1 << 0;
const CC2E: u32 = 1 << 4;

/// One TIM4 compare channel. `C` is the channel number (1 or 2).
pub struct PwmChannel<const C: u8> {
    max_duty: u16,
}

/// Configure TIM4 for PWM with a carrier of `period_us` and return its two wheel channels.
///
/// Both channels start disabled with zero duty.
pub fn tim4(tim4: pac::TIM4, period_us: u32) -> (PwmChannel<1>, PwmChannel<2>) {
    let rcc = unsafe { &*pac::RCC::ptr() };
    rcc.apb1enr.modify(|_, w| w.tim4en().set_bit());

    let tim = tim4;
    tim.cr1.modify(|_, w| w.cen().clear_bit());

    let psc = TIMER_KERNEL_HZ / TIMER_COUNT_HZ - 1;
    let period = period_us.clamp(2, 0x1_0000);
    tim.psc.write(|w| unsafe { w.bits(psc) });
    tim.arr.write(|w| unsafe { w.bits(period - 1) });

    tim.ccr1.write(|w| unsafe { w.bits(0) });
    tim.ccr2.write(|w| unsafe { w.bits(0) });

    tim.ccmr1_output().modify(|r, w| {
        let mut bits = r.bits();
        bits &= !((OCM_MASK << OC1M_SHIFT) | (OCM_MASK << OC2M_SHIFT));
        bits |= (OCM_PWM1 << OC1M_SHIFT) | OC1PE | (OCM_PWM1 << OC2M_SHIFT) | OC2PE;
        unsafe { w.bits(bits) }
    });

    // Auto-reload preload, load registers, run
    tim.cr1.modify(|_, w| w.arpe().set_bit());
    tim.egr.write(|w| w.ug().set_bit());
    tim.cr1.modify(|_, w| w.cen().set_bit());

    // Both channels share the timer through its register block from here on.
    drop(tim);

    let max_duty = period.min(u16::MAX as u32) as u16;
    (PwmChannel { max_duty }, PwmChannel { max_duty })
}

impl<const C: u8> PwmChannel<C> {
    #[inline]
    fn regs() -> &'static Tim4Regs {
        // SAFETY: each channel only touches its own CCR and CCER enable bit.
        unsafe { &*pac::TIM4::ptr() }
    }

    #[inline]
    fn enable_mask() -> u32 {
        if C == 1 {
            CC1E
        } else {
            CC2E
        }
    }
}

impl<const C: u8> PwmPin for PwmChannel<C> {
    type Duty = u16;

    fn disable(&mut self) {
        let mask = Self::enable_mask();
        cortex_m::interrupt::free(|_| {
            Self::regs()
                .ccer
                .modify(|r, w| unsafe { w.bits(r.bits() & !mask) })
        });
    }

    fn enable(&mut self) {
        let mask = Self::enable_mask();
        cortex_m::interrupt::free(|_| {
            Self::regs()
                .ccer
                .modify(|r, w| unsafe { w.bits(r.bits() | mask) })
        });
    }

    fn get_duty(&self) -> u16 {
        let tim = Self::regs();
        let bits = if C == 1 {
            tim.ccr1.read().bits()
        } else {
            tim.ccr2.read().bits()
        };
        bits as u16
    }

    fn get_max_duty(&self) -> u16 {
        self.max_duty
    }

    fn set_duty(&mut self, duty: u16) {
        let duty = duty.min(self.max_duty) as u32;
        let tim = Self::regs();
        if C == 1 {
            tim.ccr1.write(|w| unsafe { w.bits(duty) });
        } else {
            tim.ccr2.write(|w| unsafe { w.bits(duty) });
        }
    }
}
