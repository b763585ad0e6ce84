// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Peripheral initialization for the bootloader.
//!
//! Two UARTs: UART0 is the host link the update protocol runs over, UART1
//! is the out-of-band reset link whose RX interrupt restarts the device.
//! Debug output goes over RTT.

use rp2040_hal as hal;

use hal::fugit::RateExtU32;
use hal::pac::interrupt;
use hal::uart::{DataBits, StopBits, UartConfig, UartPeripheral};
use hal::Clock;

use ember_common::protocol::RESET_BYTE;

pub type HostUart = UartPeripheral<
    hal::uart::Enabled,
    hal::pac::UART0,
    (
        hal::gpio::Pin<hal::gpio::bank0::Gpio0, hal::gpio::FunctionUart, hal::gpio::PullDown>,
        hal::gpio::Pin<hal::gpio::bank0::Gpio1, hal::gpio::FunctionUart, hal::gpio::PullDown>,
    ),
>;

pub type ResetUart = UartPeripheral<
    hal::uart::Enabled,
    hal::pac::UART1,
    (
        hal::gpio::Pin<hal::gpio::bank0::Gpio8, hal::gpio::FunctionUart, hal::gpio::PullDown>,
        hal::gpio::Pin<hal::gpio::bank0::Gpio9, hal::gpio::FunctionUart, hal::gpio::PullDown>,
    ),
>;

pub struct Peripherals {
    pub host: HostUart,
    pub timer: hal::Timer,
    /// Kept alive for its RX interrupt; never read from thread context.
    _reset: ResetUart,
}

pub fn init() -> Peripherals {
    let mut pac = unsafe { hal::pac::Peripherals::steal() };

    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);
    let clocks = hal::clocks::init_clocks_and_plls(
        12_000_000u32,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .unwrap();

    let timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let host_pins = (
        pins.gpio0.into_function::<hal::gpio::FunctionUart>(),
        pins.gpio1.into_function::<hal::gpio::FunctionUart>(),
    );
    let host = UartPeripheral::new(pac.UART0, host_pins, &mut pac.RESETS)
        .enable(
            UartConfig::new(115_200.Hz(), DataBits::Eight, None, StopBits::One),
            clocks.peripheral_clock.freq(),
        )
        .unwrap();

    let reset_pins = (
        pins.gpio8.into_function::<hal::gpio::FunctionUart>(),
        pins.gpio9.into_function::<hal::gpio::FunctionUart>(),
    );
    let reset = UartPeripheral::new(pac.UART1, reset_pins, &mut pac.RESETS)
        .enable(
            UartConfig::new(115_200.Hz(), DataBits::Eight, None, StopBits::One),
            clocks.peripheral_clock.freq(),
        )
        .unwrap();
    reset.enable_rx_interrupt();
    unsafe { hal::pac::NVIC::unmask(hal::pac::Interrupt::UART1_IRQ) };

    Peripherals {
        host,
        timer,
        _reset: reset,
    }
}

#[interrupt]
fn UART1_IRQ() {
    // Reset link: 0x20 forces a hardware reset. Nothing else is serviced
    // from interrupt context and no shared state is touched.
    let uart = unsafe { &*hal::pac::UART1::ptr() };
    while !uart.uartfr().read().rxfe().bit_is_set() {
        if uart.uartdr().read().data().bits() == RESET_BYTE {
            cortex_m::peripheral::SCB::sys_reset();
        }
    }
}
