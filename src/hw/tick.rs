// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Control tick and microsecond clock.
//!
//! TIM6 raises an update interrupt once per control period. TIM5 free-runs as a 32-bit
//! microsecond counter and is the time base for `delta_t`, the settle deadlines and overrun
//! measurement.

use stm32f7xx_hal::pac;

use crate::config::{TIMER_COUNT_HZ, TIMER_KERNEL_HZ};
use crate::control::TickSource;

const PRESCALER: u32 = TIMER_KERNEL_HZ / TIMER_COUNT_HZ - 1;

/// Free-running 32-bit microsecond clock on TIM5.
///
/// Copies are cheap handles onto the same counter, so the main loop and the tick interrupt can
/// both read it.
#[derive(Clone, Copy)]
pub struct Clock {
    _private: (),
}

impl Clock {
    /// Start TIM5 counting up in microseconds over the full 32-bit range.
    pub fn tim5(tim5: pac::TIM5) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim5en().set_bit());

        tim5.cr1.modify(|_, w| w.cen().clear_bit());
        tim5.psc.write(|w| unsafe { w.bits(PRESCALER) });
        tim5.arr.write(|w| unsafe { w.bits(u32::MAX) });
        tim5.egr.write(|w| w.ug().set_bit());
        tim5.cnt.write(|w| unsafe { w.bits(0) });
        tim5.cr1.modify(|_, w| w.cen().set_bit());

        // The counter is only ever read from here on.
        drop(tim5);
        Self { _private: () }
    }

    #[inline]
    pub fn now_us(&self) -> u32 {
        // SAFETY: read-only access to a counter owned by this handle since `tim5()`.
        let tim = unsafe { &*pac::TIM5::ptr() };
        tim.cnt.read().bits()
    }
}

/// Periodic control tick on TIM6.
pub struct TickTimer {
    tim: pac::TIM6,
    clock: Clock,
}

impl TickTimer {
    /// Configure TIM6 to overflow every `period_us` and enable its update interrupt.
    ///
    /// The counter is left stopped; call [`TickTimer::start`] once the control loop is armed.
    pub fn tim6(tim6: pac::TIM6, clock: Clock, period_us: u32) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim6en().set_bit());

        let tim = tim6;
        tim.cr1.modify(|_, w| w.cen().clear_bit());
        tim.psc.write(|w| unsafe { w.bits(PRESCALER) });

        // TIM6 is 16 bits wide
        let arr = period_us.clamp(1, 0x1_0000) - 1;
        tim.arr.write(|w| unsafe { w.bits(arr) });

        // Load PSC/ARR, then drop the update flag the load just raised
        tim.egr.write(|w| w.ug().set_bit());
        tim.sr.modify(|_, w| w.uif().clear_bit());
        tim.dier.modify(|_, w| w.uie().set_bit());

        Self { tim, clock }
    }

    #[inline]
    pub fn start(&mut self) {
        self.tim.cnt.write(|w| unsafe { w.bits(0) });
        self.tim.cr1.modify(|_, w| w.cen().set_bit());
    }

    /// Clear the update flag without owning the timer. Used if the interrupt fires before the
    /// control loop has been handed to it.
    #[inline]
    pub fn clear_unowned() {
        // SAFETY: single write-zero to the flag bit, same as `clear_pending`.
        let tim = unsafe { &*pac::TIM6::ptr() };
        tim.sr.modify(|_, w| w.uif().clear_bit());
    }
}

impl TickSource for TickTimer {
    #[inline]
    fn now_us(&self) -> u32 {
        self.clock.now_us()
    }

    #[inline]
    fn clear_pending(&mut self) {
        self.tim.sr.modify(|_, w| w.uif().clear_bit());
    }
}
