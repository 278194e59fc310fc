pub use fugit::{ExtU32 as _, RateExtU32 as _};

pub use crate::bus::Bus as _stm32f0xx_pwm_bus_Bus;
pub use crate::rcc::Enable as _stm32f0xx_pwm_rcc_Enable;
