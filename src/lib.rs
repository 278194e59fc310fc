//! Edge-aligned timer PWM for the STM32F0xx family of microcontrollers
//!
//! The crate brings a general purpose or advanced control timer up as a two
//! channel, edge-aligned PWM generator by writing the RCC, GPIO and TIM
//! registers directly. All register traffic goes through the [`bus::Bus`]
//! trait so the same configuration sequence drives silicon ([`bus::Mmio`]) or
//! the register-level model in [`sim`].
//!
//! ## Usage
//!
//! ```ignore
//! let dp = pac::Peripherals::take().unwrap();
//! let mut bus = Mmio::new(dp);
//!
//! // TIM1_CH1 on PA8 and TIM1_CH2 on PA9, 1 kHz tick, 1 s period, 50 % duty
//! let waveform = pwm::configure_pwm(&mut bus, &PwmConfig::EDGE_ALIGNED_DEMO)?;
//! ```

#![no_std]

#[cfg(not(feature = "device-selected"))]
compile_error!(
    "This crate requires one of the following device features enabled:
        stm32f072
                "
);

#[cfg(feature = "stm32f072")]
pub use stm32f0::stm32f0x2 as pac;

// Enable use of interrupt macro
#[cfg(feature = "rt")]
pub use crate::pac::interrupt;

#[macro_use]
mod fmt;

pub mod bus;
pub mod config;
pub mod device;
pub mod gpio;
pub mod map;
pub mod prelude;
pub mod pwm;
pub mod rcc;
pub mod regs;
pub mod sim;
pub mod timer;

pub use crate::config::{Error, PwmConfig};
pub use crate::pwm::{configure_pwm, Waveform};
