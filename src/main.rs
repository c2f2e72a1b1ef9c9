// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

#![no_main]
#![no_std]

use core::cell::Cell;
use core::fmt::Write;

use cortex_m::peripheral::NVIC;
use cortex_m_rt::entry;
use critical_section::Mutex;
use panic_halt as _;

use hal::{
    gpio::{gpioe, Output, PushPull},
    pac::{self, interrupt, Interrupt},
    prelude::*,
    serial::{Config, Serial},
};
use stm32f7xx_hal as hal;

use rover::config::{
    self, CAPTURE_PRIORITY, CONSOLE_BAUD, MAX_DRIVE, MIN_DRIVE, PWM_PERIOD_US, SETTLE_US,
    TELEMETRY_PERIOD_US, TICK_PERIOD_US, TICK_PRIORITY,
};
use rover::control::{Commands, ControlLoop, LoopStats, TickReport};
use rover::drivers::{Encoders, HBridge};
use rover::hw::{self, BoardPins, Clock, EdgeCapture, PwmChannel, TickTimer, Usart};
use rover::protocol::Parser;
use rover::Wheel;

type LeftDrive =
    HBridge<gpioe::PE7<Output<PushPull>>, gpioe::PE8<Output<PushPull>>, PwmChannel<1>>;
type RightDrive =
    HBridge<gpioe::PE9<Output<PushPull>>, gpioe::PE10<Output<PushPull>>, PwmChannel<2>>;
type Rover = ControlLoop<LeftDrive, RightDrive>;

static ENCODERS: Encoders = Encoders::new();
static COMMANDS: Commands = Commands::new();

// Handed from `main` to the interrupt that owns them, once.
static CAPTURE: Mutex<Cell<Option<EdgeCapture>>> = Mutex::new(Cell::new(None));
static CONTROL: Mutex<Cell<Option<(Rover, TickTimer)>>> = Mutex::new(Cell::new(None));

// Published by the tick for the console.
static TELEMETRY: Mutex<Cell<Option<(TickReport, LoopStats)>>> = Mutex::new(Cell::new(None));

#[entry]
fn main() -> ! {
    // Peripherals
    let dp = pac::Peripherals::take().unwrap();
    let mut cp = cortex_m::Peripherals::take().unwrap();

    // Clocks (HSI, timer kernel clock = config::TIMER_KERNEL_HZ)
    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.freeze();

    // GPIO
    let BoardPins {
        mut status_led,
        usart1,
        left,
        right,
        ..
    } = BoardPins::new(dp.GPIOA, dp.GPIOD, dp.GPIOE);

    // USART1 (DBG + commands)
    let usart_cfg = Config {
        baud_rate: CONSOLE_BAUD.bps(),
        ..Default::default()
    };
    let serial = Serial::new(dp.USART1, (usart1.tx, usart1.rx), &clocks, usart_cfg);
    let mut usart = Usart::new(serial);

    let _ = write!(
        usart,
        "rover: tick {} us, settle {} us, drive {}..{}%\r\n",
        TICK_PERIOD_US, SETTLE_US, MIN_DRIVE, MAX_DRIVE
    );

    // Timers
    let clock = Clock::tim5(dp.TIM5);
    let (pwm_left, pwm_right) = hw::pwm::tim4(dp.TIM4, PWM_PERIOD_US);

    let left_drive = HBridge::new(left.in_a, left.in_b, pwm_left);
    let right_drive = HBridge::new(right.in_a, right.in_b, pwm_right);

    let mut control: Rover = ControlLoop::new(
        config::left_pi(),
        left_drive,
        config::right_pi(),
        right_drive,
    )
    .with_period_us(TICK_PERIOD_US);
    control.arm();

    let mut tick = TickTimer::tim6(dp.TIM6, clock, TICK_PERIOD_US);
    let capture = EdgeCapture::tim2(dp.TIM2);
    tick.start();

    critical_section::with(|cs| {
        CAPTURE.borrow(cs).set(Some(capture));
        CONTROL.borrow(cs).set(Some((control, tick)));
    });

    // Capture must preempt the tick so edges are never held off by the control law.
    unsafe {
        cp.NVIC.set_priority(Interrupt::TIM2, CAPTURE_PRIORITY);
        cp.NVIC.set_priority(Interrupt::TIM6_DAC, TICK_PRIORITY);
        NVIC::unmask(Interrupt::TIM2);
        NVIC::unmask(Interrupt::TIM6_DAC);
    }

    usart.println("rover: armed");

    let mut parser = Parser::new();
    let mut last_print = clock.now_us();

    loop {
        while let Some(byte) = usart.try_read_byte() {
            if let Some(cmd) = parser.push(byte) {
                COMMANDS.apply(cmd);
            }
        }

        let now = clock.now_us();
        if now.wrapping_sub(last_print) >= TELEMETRY_PERIOD_US {
            last_print = now;
            let _ = status_led.toggle();

            if let Some((report, stats)) = critical_section::with(|cs| TELEMETRY.borrow(cs).get())
            {
                print_telemetry(&mut usart, &report, &stats);
            }
        }
    }
}

fn print_telemetry<U: hal::serial::Instance>(
    usart: &mut Usart<U>,
    report: &TickReport,
    stats: &LoopStats,
) {
    for wheel in Wheel::ALL {
        let w = &report.wheels[wheel.index()];
        let _ = write!(
            usart,
            "{:?}: sp={} period={} speed=",
            wheel, w.setpoint, w.period
        );
        match w.speed {
            Some(speed) => {
                let _ = write!(usart, "{}", speed);
            }
            None => usart.write_str("hold"),
        }
        let _ = write!(
            usart,
            " out={} int={} pwm={} dir={:?} | ",
            w.output, w.integrator, w.pwm, w.direction
        );
    }
    let _ = write!(
        usart,
        "dt={} ticks={} overruns={} max_body={}us\r\n",
        report.delta_t, stats.firings, stats.overruns, stats.max_body_us
    );
}

#[interrupt]
fn TIM2() {
    static mut CAPTURE_OWNED: Option<EdgeCapture> = None;

    if CAPTURE_OWNED.is_none() {
        *CAPTURE_OWNED = critical_section::with(|cs| CAPTURE.borrow(cs).take());
    }
    let Some(capture) = CAPTURE_OWNED.as_mut() else {
        return;
    };

    for (wheel, timestamp) in capture.take_edges().into_iter().flatten() {
        ENCODERS.on_edge_captured(wheel, timestamp);
    }
}

#[interrupt]
fn TIM6_DAC() {
    static mut CONTROL_OWNED: Option<(Rover, TickTimer)> = None;

    if CONTROL_OWNED.is_none() {
        *CONTROL_OWNED = critical_section::with(|cs| CONTROL.borrow(cs).take());
    }
    let Some((control, tick)) = CONTROL_OWNED.as_mut() else {
        TickTimer::clear_unowned();
        return;
    };

    if let Some(report) = control.fire(tick, &ENCODERS, &COMMANDS) {
        let stats = control.stats();
        critical_section::with(|cs| TELEMETRY.borrow(cs).set(Some((report, stats))));
    }
}
