//! STM32F072 register map (RM0091)
//!
//! Absolute base addresses of the peripherals the PWM bring-up touches and the
//! byte offsets of the registers inside each block.

/// Reset and clock control
pub const RCC_BASE: u32 = 0x4002_1000;

pub const GPIOA_BASE: u32 = 0x4800_0000;
pub const GPIOB_BASE: u32 = 0x4800_0400;
pub const GPIOC_BASE: u32 = 0x4800_0800;
pub const GPIOD_BASE: u32 = 0x4800_0C00;
pub const GPIOE_BASE: u32 = 0x4800_1000;
pub const GPIOF_BASE: u32 = 0x4800_1400;

pub const TIM1_BASE: u32 = 0x4001_2C00;
pub const TIM2_BASE: u32 = 0x4000_0000;
pub const TIM3_BASE: u32 = 0x4000_0400;
pub const TIM14_BASE: u32 = 0x4000_2000;
pub const TIM15_BASE: u32 = 0x4001_4000;
pub const TIM16_BASE: u32 = 0x4001_4400;
pub const TIM17_BASE: u32 = 0x4001_4800;

/// Size of the address window decoded by one GPIO port or timer
pub const BLOCK_SIZE: u32 = 0x400;

/// RCC register offsets
pub mod rcc {
    pub const CR: u32 = 0x00;
    pub const CFGR: u32 = 0x04;
    pub const AHBENR: u32 = 0x14;
    pub const APB2ENR: u32 = 0x18;
    pub const APB1ENR: u32 = 0x1C;

    /// AHBENR after reset: SRAM and FLITF clocks running
    pub const AHBENR_RESET: u32 = 0x0000_0014;
}

/// GPIO register offsets
pub mod gpio {
    pub const MODER: u32 = 0x00;
    pub const OTYPER: u32 = 0x04;
    pub const OSPEEDR: u32 = 0x08;
    pub const PUPDR: u32 = 0x0C;
    pub const IDR: u32 = 0x10;
    pub const ODR: u32 = 0x14;
    pub const BSRR: u32 = 0x18;
    pub const AFRL: u32 = 0x20;
    pub const AFRH: u32 = 0x24;
    pub const BRR: u32 = 0x28;

    /// GPIOA MODER after reset: PA13/PA14 in alternate mode for SWD
    pub const MODER_RESET_A: u32 = 0x2800_0000;
}

/// Timer register offsets, shared by the advanced and general purpose timers
pub mod tim {
    pub const CR1: u32 = 0x00;
    pub const CR2: u32 = 0x04;
    pub const SMCR: u32 = 0x08;
    pub const DIER: u32 = 0x0C;
    pub const SR: u32 = 0x10;
    pub const EGR: u32 = 0x14;
    pub const CCMR1: u32 = 0x18;
    pub const CCMR2: u32 = 0x1C;
    pub const CCER: u32 = 0x20;
    pub const CNT: u32 = 0x24;
    pub const PSC: u32 = 0x28;
    pub const ARR: u32 = 0x2C;
    pub const RCR: u32 = 0x30;
    pub const CCR1: u32 = 0x34;
    pub const CCR2: u32 = 0x38;
    pub const CCR3: u32 = 0x3C;
    pub const CCR4: u32 = 0x40;
    pub const BDTR: u32 = 0x44;
}
