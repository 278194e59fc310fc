//! Register access
//!
//! Every register read and write of the crate goes through [`Bus`]. On the
//! target [`Mmio`] turns them into volatile accesses to the peripheral address
//! space, in tests [`crate::sim::SimDevice`] decodes them against a model of
//! the same register map.

use core::ptr;

use crate::pac;

/// 32-bit access to the memory mapped peripheral space
pub trait Bus {
    /// Reads the word at `addr`
    fn read(&mut self, addr: u32) -> u32;

    /// Writes `value` to the word at `addr`
    fn write(&mut self, addr: u32, value: u32);

    /// Read-modify-write of the word at `addr`
    ///
    /// `f` receives the current contents and returns the new ones. Callers
    /// are expected to only touch the bits they own.
    fn modify<F>(&mut self, addr: u32, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read(addr);
        self.write(addr, f(value));
    }
}

impl<B: Bus> Bus for &mut B {
    fn read(&mut self, addr: u32) -> u32 {
        (**self).read(addr)
    }

    fn write(&mut self, addr: u32, value: u32) {
        (**self).write(addr, value)
    }

    fn modify<F>(&mut self, addr: u32, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        (**self).modify(addr, f)
    }
}

/// Memory mapped I/O on the device itself
///
/// Holding an `Mmio` stands for exclusive ownership of the peripheral
/// registers, so it can only be built from the PAC singleton.
pub struct Mmio {
    _0: (),
}

impl Mmio {
    /// Takes ownership of the device register space
    pub fn new(_dp: pac::Peripherals) -> Self {
        Mmio { _0: () }
    }

    /// Creates an `Mmio` without owning the peripherals
    ///
    /// # Safety
    ///
    /// The caller must make sure no other code accesses the registers the PWM
    /// bring-up touches while this value is in use.
    pub unsafe fn steal() -> Self {
        Mmio { _0: () }
    }
}

impl Bus for Mmio {
    fn read(&mut self, addr: u32) -> u32 {
        // NOTE(unsafe) `addr` comes from the register map and `self` owns the
        // peripheral space
        unsafe { ptr::read_volatile(addr as *const u32) }
    }

    fn write(&mut self, addr: u32, value: u32) {
        // NOTE(unsafe) see `read`
        unsafe { ptr::write_volatile(addr as *mut u32, value) }
    }

    fn modify<F>(&mut self, addr: u32, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        // RCC enable words are shared with every other driver, keep the
        // read-modify-write atomic with respect to interrupt handlers
        cortex_m::interrupt::free(|_| {
            let value = self.read(addr);
            self.write(addr, f(value));
        });
    }
}
