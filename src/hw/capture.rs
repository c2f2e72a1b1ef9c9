// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Encoder edge capture via TIM2 input capture.
//!
//! TIM2 counts in microseconds and is wrapped at 16 bits so captured timestamps share the 65536 µs
//! period the encoder bookkeeping expects. CH1 (PA0) latches the left wheel, CH2 (PA1) the right.

use stm32f7xx_hal::pac;

use crate::config::{TIMER_COUNT_HZ, TIMER_KERNEL_HZ};
use crate::wheel::Wheel;

// SR over-capture flags (rc_w0)
const CC1OF: u32 = 1 << 9;
const CC2OF: u32 = 1 << 10;

pub struct EdgeCapture {
    tim: pac::TIM2,
}

impl EdgeCapture {
    /// Configure TIM2 CH1/CH2 for rising-edge input capture with interrupts enabled.
    pub fn tim2(tim2: pac::TIM2) -> Self {
        let tim = tim2;

        // Enable the peripheral clock
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim2en().set_bit());

        // Disable counter while configuring
        tim.cr1.modify(|_, w| w.cen().clear_bit());

        // 1 µs per count, wrap at 16 bits
        let psc = TIMER_KERNEL_HZ / TIMER_COUNT_HZ - 1;
        tim.psc.write(|w| unsafe { w.bits(psc) });
        tim.arr.write(|w| unsafe { w.bits(0xFFFF) });

        // Configure CH1/CH2 as inputs from TI1/TI2
        tim.ccmr1_input().modify(|_, w| w.cc1s().ti1().cc2s().ti2());

        // Rising edge only, capture enabled on both channels.
        tim.ccer.modify(|_, w| {
            w.cc1p()
                .clear_bit()
                .cc1np()
                .clear_bit()
                .cc2p()
                .clear_bit()
                .cc2np()
                .clear_bit()
                .cc1e()
                .set_bit()
                .cc2e()
                .set_bit()
        });

        // Capture interrupts
        tim.dier.modify(|_, w| w.cc1ie().set_bit().cc2ie().set_bit());

        // Preload, clear stale flags, start counting
        tim.egr.write(|w| w.ug().set_bit());
        tim.sr.write(|w| unsafe { w.bits(0) });
        tim.cr1.modify(|_, w| w.cen().set_bit());

        Self { tim }
    }

    /// Read the latched timestamps of any channel that captured an edge.
    ///
    /// Reading a capture register clears its flag. Call from the TIM2 interrupt.
    #[inline]
    pub fn take_edges(&mut self) -> [Option<(Wheel, u16)>; 2] {
        let sr = self.tim.sr.read();

        let left = if sr.cc1if().bit_is_set() {
            Some((Wheel::Left, self.tim.ccr1.read().bits() as u16))
        } else {
            None
        };

        let right = if sr.cc2if().bit_is_set() {
            Some((Wheel::Right, self.tim.ccr2.read().bits() as u16))
        } else {
            None
        };

        // Over-capture only means an edge was lost; the latest timestamp is still valid.
        // Write-zero clears only the over-capture bits, so a capture flag raised since the read
        // above stays pending.
        self.tim.sr.write(|w| unsafe { w.bits(!(CC1OF | CC2OF)) });

        [left, right]
    }
}
