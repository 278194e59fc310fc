//! Reset and Clock Control
//!
//! Peripheral clock gating and the frozen bus frequencies. A peripheral's
//! registers ignore writes until its enable bit is set, so every driver
//! enables its clock before touching anything else.

use fugit::HertzU32 as Hertz;

use crate::bus::Bus;
use crate::device::{ClockBus, Port, TimerId};
use crate::map::{self, rcc};
use crate::regs::{Ahbenr, Apb1enr, Apb2enr};

/// Frozen clock frequencies
///
/// The startup code sets up the oscillators and the PLL before `main`; the PWM
/// bring-up only consumes the result. The AHB prescaler is taken to be 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Clocks {
    sysclk: Hertz,
    pclk: Hertz,
    ppre: u8,
}

impl Clocks {
    /// Reset state: 8 MHz HSI, no dividers
    pub const HSI_RESET: Clocks = Clocks::new(Hertz::from_raw(8_000_000), 1);

    /// 48 MHz system clock with an undivided APB, as left by `SystemInit`
    pub const SYSTEM_INIT_48MHZ: Clocks = Clocks::new(Hertz::from_raw(48_000_000), 1);

    /// `ppre` is the APB divider and must be 1, 2, 4, 8 or 16
    pub const fn new(sysclk: Hertz, ppre: u8) -> Self {
        assert!(matches!(ppre, 1 | 2 | 4 | 8 | 16));

        Clocks {
            sysclk,
            pclk: Hertz::from_raw(sysclk.raw() / ppre as u32),
            ppre,
        }
    }

    /// Returns the system (core) frequency
    pub const fn sysclk(&self) -> Hertz {
        self.sysclk
    }

    /// Returns the frequency of the APB
    pub const fn pclk(&self) -> Hertz {
        self.pclk
    }

    /// Returns the frequency the timers are clocked with
    ///
    /// The timer clock is doubled whenever the APB runs divided.
    pub const fn timclk(&self) -> Hertz {
        if self.ppre == 1 {
            self.pclk
        } else {
            Hertz::from_raw(self.pclk.raw() * 2)
        }
    }
}

/// Peripherals with a clock enable bit in the RCC
pub trait Enable {
    /// Sets the clock enable bit, leaving the other peripherals' bits alone
    fn enable<B: Bus>(&self, bus: &mut B);

    fn is_enabled<B: Bus>(&self, bus: &mut B) -> bool;
}

const fn addr(offset: u32) -> u32 {
    map::RCC_BASE + offset
}

impl Enable for Port {
    fn enable<B: Bus>(&self, bus: &mut B) {
        let bit = self.enable_bit();
        bus.modify(addr(rcc::AHBENR), |r| (Ahbenr::from_bits_retain(r) | bit).bits());
    }

    fn is_enabled<B: Bus>(&self, bus: &mut B) -> bool {
        Ahbenr::from_bits_retain(bus.read(addr(rcc::AHBENR))).contains(self.enable_bit())
    }
}

impl Enable for TimerId {
    fn enable<B: Bus>(&self, bus: &mut B) {
        match self.info().clock {
            ClockBus::Apb1(bit) => bus.modify(addr(rcc::APB1ENR), |r| {
                (Apb1enr::from_bits_retain(r) | bit).bits()
            }),
            ClockBus::Apb2(bit) => bus.modify(addr(rcc::APB2ENR), |r| {
                (Apb2enr::from_bits_retain(r) | bit).bits()
            }),
        }
    }

    fn is_enabled<B: Bus>(&self, bus: &mut B) -> bool {
        match self.info().clock {
            ClockBus::Apb1(bit) => {
                Apb1enr::from_bits_retain(bus.read(addr(rcc::APB1ENR))).contains(bit)
            }
            ClockBus::Apb2(bit) => {
                Apb2enr::from_bits_retain(bus.read(addr(rcc::APB2ENR))).contains(bit)
            }
        }
    }
}
