// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Single-edge optical wheel encoders.
//!
//! Each wheel has one encoder channel wired to a timer input-capture input. The capture interrupt
//! hands the latched 16-bit microsecond timestamp to [`Encoders::on_edge_captured`]; the control
//! tick calls [`Encoders::calculate_speed`] to turn the two latest timestamps into an encoder
//! period and start a fresh measurement.
//!
//! The timestamp pair of each wheel sits behind a `critical_section::Mutex`, so a capture that
//! fires in the middle of a read-and-reset can never tear the pair.
//!
//! A read-and-reset keeps the last edge it consumed as an anchor. When a vane period is longer
//! than the control tick, only one edge lands between reads; it is paired with the anchor as long
//! as both fit inside one wrap of the capture counter (see [`anchor_span`]).

use core::cell::Cell;

use critical_section::Mutex;

use crate::config::{anchor_span, SPEED_SCALE, TICK_PERIOD_US};
use crate::wheel::{Wheel, WHEEL_COUNT};

/// Capture state of one wheel encoder.
///
/// Timestamps are microseconds modulo 2^16, matching the 16-bit capture counter.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EncoderChannel {
    current: u16,
    previous: u16,
    /// Edges latched since the last reset, saturating.
    edges: u8,
    /// Last edge consumed by a read, kept across the reset.
    anchor: Option<u16>,
    /// Reads without a new edge since the anchor was taken.
    idle_reads: u8,
}

impl EncoderChannel {
    pub const fn new() -> Self {
        Self {
            current: 0,
            previous: 0,
            edges: 0,
            anchor: None,
            idle_reads: 0,
        }
    }

    /// Latch a new edge timestamp, shifting the current one to previous.
    #[inline]
    pub fn capture(&mut self, timestamp: u16) {
        self.previous = self.current;
        self.current = timestamp;
        self.edges = self.edges.saturating_add(1);
    }

    /// Elapsed time between the two latest edges, modulo the counter width.
    ///
    /// With two edges since the last reset this is their difference. With one, it is measured
    /// from the anchor, provided the anchor is recent enough for `span` (see [`anchor_span`]).
    /// Otherwise 0: a difference against the zeroed baseline is not a vane period.
    #[inline]
    pub fn period(&self, span: u8) -> u16 {
        match (self.edges, self.anchor) {
            (0, _) => 0,
            (1, Some(anchor)) if self.anchor_usable(span) => self.current.wrapping_sub(anchor),
            (1, _) => 0,
            _ => self.current.wrapping_sub(self.previous),
        }
    }

    /// Return the period and zero both timestamps, keeping the latest edge as the anchor.
    #[inline]
    pub fn take_period(&mut self, span: u8) -> u16 {
        let period = self.period(span);

        if self.edges > 0 {
            self.anchor = Some(self.current);
            self.idle_reads = 0;
        } else if self.anchor.is_some() {
            self.idle_reads = self.idle_reads.saturating_add(1);
            if !self.anchor_usable(span) {
                self.anchor = None;
            }
        }

        self.current = 0;
        self.previous = 0;
        self.edges = 0;
        period
    }

    // The anchor edge precedes its read by up to a tick and the new edge lands up to a tick
    // before this read, so the pair spans fewer than `idle_reads + 2` ticks.
    #[inline]
    fn anchor_usable(&self, span: u8) -> bool {
        u16::from(self.idle_reads) + 2 <= u16::from(span)
    }

    #[inline]
    pub fn current(&self) -> u16 {
        self.current
    }

    #[inline]
    pub fn previous(&self) -> u16 {
        self.previous
    }

    #[inline]
    pub fn edges(&self) -> u8 {
        self.edges
    }

    #[inline]
    pub fn anchor(&self) -> Option<u16> {
        self.anchor
    }
}

/// Interpretation of an encoder period.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EncoderReading {
    /// No vane period since the previous read.
    Stale,
    /// Microseconds between two consecutive vanes.
    Period(u16),
}

impl EncoderReading {
    #[inline]
    pub fn from_period(period: u16) -> Self {
        if period == 0 {
            EncoderReading::Stale
        } else {
            EncoderReading::Period(period)
        }
    }

    /// Wheel speed in vanes per second, or `None` when stale.
    #[inline]
    pub fn speed(self) -> Option<i32> {
        match self {
            EncoderReading::Stale => None,
            EncoderReading::Period(period) => Some(period_to_speed(period)),
        }
    }
}

/// Convert a nonzero encoder period (µs) into vanes per second. Larger means faster.
///
/// A zero period maps to zero speed; callers should treat it as stale before getting here.
#[inline]
pub fn period_to_speed(period: u16) -> i32 {
    match period {
        0 => 0,
        p => (SPEED_SCALE / p as u32) as i32,
    }
}

/// Encoder state for both wheels, shared between the capture and control-tick interrupts.
pub struct Encoders {
    channels: [Mutex<Cell<EncoderChannel>>; WHEEL_COUNT],
    span: u8,
}

impl Encoders {
    /// Encoders read once per configured control tick.
    pub const fn new() -> Self {
        Self::with_tick_period(TICK_PERIOD_US)
    }

    /// Encoders read every `tick_us`; bounds how long an anchor edge stays usable.
    pub const fn with_tick_period(tick_us: u32) -> Self {
        Self {
            channels: [
                Mutex::new(Cell::new(EncoderChannel::new())),
                Mutex::new(Cell::new(EncoderChannel::new())),
            ],
            span: anchor_span(tick_us),
        }
    }

    /// Capture-interrupt entry point: latch `timestamp` for `wheel`.
    ///
    /// O(1); no I/O and no calls into the controller.
    #[inline]
    pub fn on_edge_captured(&self, wheel: Wheel, timestamp: u16) {
        critical_section::with(|cs| {
            let cell = self.channels[wheel.index()].borrow(cs);
            let mut channel = cell.get();
            channel.capture(timestamp);
            cell.set(channel);
        });
    }

    /// Return the encoder period of `wheel` and reset its timestamps to zero.
    ///
    /// A result of 0 means no new period since the previous call.
    pub fn calculate_speed(&self, wheel: Wheel) -> u16 {
        critical_section::with(|cs| {
            let cell = self.channels[wheel.index()].borrow(cs);
            let mut channel = cell.get();
            let period = channel.take_period(self.span);
            cell.set(channel);
            period
        })
    }

    /// [`calculate_speed`](Self::calculate_speed), classified.
    #[inline]
    pub fn read(&self, wheel: Wheel) -> EncoderReading {
        EncoderReading::from_period(self.calculate_speed(wheel))
    }

    /// Copy of the capture state without resetting it.
    pub fn snapshot(&self, wheel: Wheel) -> EncoderChannel {
        critical_section::with(|cs| self.channels[wheel.index()].borrow(cs).get())
    }
}

impl Default for Encoders {
    fn default() -> Self {
        Self::new()
    }
}
