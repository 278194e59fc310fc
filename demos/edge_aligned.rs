//! Two channel edge-aligned PWM on TIM1
//!
//! PA8 (TIM1_CH1) and PA9 (TIM1_CH2) toggle in phase, high for the first half
//! of every one second period. The green LED on PC9 lights up once the timer
//! runs. Assumes the startup code left the system at 48 MHz.

#![deny(warnings)]
#![no_main]
#![no_std]

extern crate panic_halt;

use core::sync::atomic::{self, Ordering};

use cortex_m_rt::{entry, exception, ExceptionFrame};
use cortex_m_semihosting::hprintln;

use stm32f0xx_pwm::bus::Mmio;
use stm32f0xx_pwm::device::Port;
use stm32f0xx_pwm::gpio::GpioRegs;
use stm32f0xx_pwm::rcc::Clocks;
use stm32f0xx_pwm::{pac, prelude::*, PwmConfig};

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();
    let mut bus = Mmio::new(dp);
    let clocks = Clocks::SYSTEM_INIT_48MHZ;

    match stm32f0xx_pwm::configure_pwm(&mut bus, &PwmConfig::EDGE_ALIGNED_DEMO) {
        Ok(waveform) => {
            hprintln!(
                "{:?} running, {} Hz tick, {} ticks per period",
                waveform.timer(),
                waveform.tick_rate(&clocks).raw(),
                waveform.period_ticks()
            );

            let gpioc = GpioRegs::new(Port::C);
            Port::C.enable(&mut bus);
            gpioc.into_output(&mut bus, 9);
            gpioc.set_high(&mut bus, 9);
        }
        Err(e) => hprintln!("PWM configuration rejected: {:?}", e),
    }

    loop {
        cortex_m::asm::wfi();
    }
}

#[exception]
unsafe fn HardFault(_ef: &ExceptionFrame) -> ! {
    loop {
        atomic::compiler_fence(Ordering::SeqCst);
    }
}
