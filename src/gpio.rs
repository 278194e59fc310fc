//! General Purpose Input / Output
//!
//! Only what the PWM bring-up needs: pin mode, alternate function selection
//! and driving a plain output for the status LED.

use crate::bus::Bus;
use crate::device::Port;
use crate::map::gpio;
use crate::regs::{Afr, Moder, PinMode};

/// Register block of one GPIO port
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpioRegs {
    port: Port,
}

impl GpioRegs {
    pub const fn new(port: Port) -> Self {
        GpioRegs { port }
    }

    pub const fn port(&self) -> Port {
        self.port
    }

    const fn addr(&self, offset: u32) -> u32 {
        self.port.base() + offset
    }

    /// AFRL for pins 0-7, AFRH for pins 8-15
    const fn afr_addr(&self, pin: u8) -> u32 {
        if pin < 8 {
            self.addr(gpio::AFRL)
        } else {
            self.addr(gpio::AFRH)
        }
    }

    pub fn mode<B: Bus>(&self, bus: &mut B, pin: u8) -> PinMode {
        Moder(bus.read(self.addr(gpio::MODER))).mode(pin)
    }

    pub fn set_mode<B: Bus>(&self, bus: &mut B, pin: u8, mode: PinMode) {
        bus.modify(self.addr(gpio::MODER), |r| Moder(r).with_mode(pin, mode).bits());
    }

    pub fn alternate_function<B: Bus>(&self, bus: &mut B, pin: u8) -> u8 {
        Afr(bus.read(self.afr_addr(pin))).af(pin)
    }

    pub fn set_alternate_function<B: Bus>(&self, bus: &mut B, pin: u8, af: u8) {
        bus.modify(self.afr_addr(pin), |r| Afr(r).with_af(pin, af).bits());
    }

    /// Routes `pin` to the peripheral signal selected by `af`
    ///
    /// The index is written before the mode so the pin never connects to
    /// whatever function the stale index selects.
    pub fn into_alternate<B: Bus>(&self, bus: &mut B, pin: u8, af: u8) {
        self.set_alternate_function(bus, pin, af);
        self.set_mode(bus, pin, PinMode::Alternate);
    }

    /// Configures `pin` as a general purpose output
    pub fn into_output<B: Bus>(&self, bus: &mut B, pin: u8) {
        self.set_mode(bus, pin, PinMode::Output);
    }

    /// Drives `pin` high through BSRR, no read-modify-write involved
    pub fn set_high<B: Bus>(&self, bus: &mut B, pin: u8) {
        bus.write(self.addr(gpio::BSRR), 1 << (pin & 0xF));
    }

    /// Drives `pin` low through BSRR
    pub fn set_low<B: Bus>(&self, bus: &mut B, pin: u8) {
        bus.write(self.addr(gpio::BSRR), 1 << ((pin & 0xF) + 16));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rcc::Enable;
    use crate::sim::SimDevice;

    #[test]
    fn alternate_routing_uses_high_register_for_upper_pins() {
        let mut sim = SimDevice::new();
        Port::C.enable(&mut sim);
        let gpioc = GpioRegs::new(Port::C);

        gpioc.into_alternate(&mut sim, 8, 2);
        gpioc.into_alternate(&mut sim, 3, 5);

        assert_eq!(sim.read_raw(Port::C.base() + gpio::AFRH), 0x2);
        assert_eq!(sim.read_raw(Port::C.base() + gpio::AFRL), 0x5 << 12);
        assert_eq!(gpioc.mode(&mut sim, 8), PinMode::Alternate);
        assert_eq!(gpioc.alternate_function(&mut sim, 3), 5);
    }

    #[test]
    fn swd_pins_survive_reconfiguring_port_a() {
        let mut sim = SimDevice::new();
        Port::A.enable(&mut sim);
        let gpioa = GpioRegs::new(Port::A);

        gpioa.into_alternate(&mut sim, 8, 2);
        gpioa.into_alternate(&mut sim, 9, 2);

        assert_eq!(gpioa.mode(&mut sim, 13), PinMode::Alternate);
        assert_eq!(gpioa.mode(&mut sim, 14), PinMode::Alternate);
        assert_eq!(
            sim.read_raw(Port::A.base() + gpio::MODER),
            gpio::MODER_RESET_A | 0b10 << 16 | 0b10 << 18
        );
    }

    #[test]
    fn output_pin_follows_bsrr() {
        let mut sim = SimDevice::new();
        Port::C.enable(&mut sim);
        let gpioc = GpioRegs::new(Port::C);

        gpioc.into_output(&mut sim, 9);
        gpioc.set_high(&mut sim, 9);
        assert_eq!(sim.pin_level(Port::C, 9), Some(true));

        gpioc.set_low(&mut sim, 9);
        assert_eq!(sim.pin_level(Port::C, 9), Some(false));
    }
}
