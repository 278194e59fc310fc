//! Timers, ports and the pin capability table of the STM32F072
//!
//! ## Timer outputs
//!
//! | Timer | Channels | Counter | Break (MOE) | Clock bus |
//! |-------|----------|---------|-------------|-----------|
//! | TIM1  | 4        | 16 bit  | yes         | APB2      |
//! | TIM2  | 4        | 32 bit  | no          | APB1      |
//! | TIM3  | 4        | 16 bit  | no          | APB1      |
//! | TIM14 | 1        | 16 bit  | no          | APB1      |
//! | TIM15 | 2        | 16 bit  | yes         | APB2      |
//! | TIM16 | 1        | 16 bit  | yes         | APB2      |
//! | TIM17 | 1        | 16 bit  | yes         | APB2      |
//!
//! Which pin carries which channel, and on which alternate function, is listed
//! in [`TIMER_OUTPUTS`].

use crate::map;
use crate::regs::{Ahbenr, Apb1enr, Apb2enr};

/// Timer instances able to drive output compare pins
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerId {
    TIM1,
    TIM2,
    TIM3,
    TIM14,
    TIM15,
    TIM16,
    TIM17,
}

/// Peripheral bus a timer hangs off, each with its own clock enable register
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockBus {
    Apb1(Apb1enr),
    Apb2(Apb2enr),
}

/// Static facts about a timer instance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerInfo {
    /// Base address of the register block
    pub base: u32,
    /// Clock enable bit
    pub clock: ClockBus,
    /// Largest value of the counter, auto-reload and compare registers
    pub counter_max: u32,
    /// Number of capture/compare channels
    pub channels: u8,
    /// Outputs are gated by BDTR.MOE
    pub has_break: bool,
}

impl TimerId {
    pub const ALL: [TimerId; 7] = [
        TimerId::TIM1,
        TimerId::TIM2,
        TimerId::TIM3,
        TimerId::TIM14,
        TimerId::TIM15,
        TimerId::TIM16,
        TimerId::TIM17,
    ];

    pub const fn info(self) -> TimerInfo {
        match self {
            TimerId::TIM1 => TimerInfo {
                base: map::TIM1_BASE,
                clock: ClockBus::Apb2(Apb2enr::TIM1EN),
                counter_max: 0xFFFF,
                channels: 4,
                has_break: true,
            },
            TimerId::TIM2 => TimerInfo {
                base: map::TIM2_BASE,
                clock: ClockBus::Apb1(Apb1enr::TIM2EN),
                counter_max: 0xFFFF_FFFF,
                channels: 4,
                has_break: false,
            },
            TimerId::TIM3 => TimerInfo {
                base: map::TIM3_BASE,
                clock: ClockBus::Apb1(Apb1enr::TIM3EN),
                counter_max: 0xFFFF,
                channels: 4,
                has_break: false,
            },
            TimerId::TIM14 => TimerInfo {
                base: map::TIM14_BASE,
                clock: ClockBus::Apb1(Apb1enr::TIM14EN),
                counter_max: 0xFFFF,
                channels: 1,
                has_break: false,
            },
            TimerId::TIM15 => TimerInfo {
                base: map::TIM15_BASE,
                clock: ClockBus::Apb2(Apb2enr::TIM15EN),
                counter_max: 0xFFFF,
                channels: 2,
                has_break: true,
            },
            TimerId::TIM16 => TimerInfo {
                base: map::TIM16_BASE,
                clock: ClockBus::Apb2(Apb2enr::TIM16EN),
                counter_max: 0xFFFF,
                channels: 1,
                has_break: true,
            },
            TimerId::TIM17 => TimerInfo {
                base: map::TIM17_BASE,
                clock: ClockBus::Apb2(Apb2enr::TIM17EN),
                counter_max: 0xFFFF,
                channels: 1,
                has_break: true,
            },
        }
    }

    pub const fn base(self) -> u32 {
        self.info().base
    }

    /// Position in [`TimerId::ALL`]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Finds the timer whose register block contains `addr`
    pub fn from_address(addr: u32) -> Option<Self> {
        TimerId::ALL
            .iter()
            .copied()
            .find(|tim| addr.wrapping_sub(tim.base()) < map::BLOCK_SIZE)
    }
}

/// GPIO ports
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Port {
    pub const ALL: [Port; 6] = [Port::A, Port::B, Port::C, Port::D, Port::E, Port::F];

    pub const fn base(self) -> u32 {
        match self {
            Port::A => map::GPIOA_BASE,
            Port::B => map::GPIOB_BASE,
            Port::C => map::GPIOC_BASE,
            Port::D => map::GPIOD_BASE,
            Port::E => map::GPIOE_BASE,
            Port::F => map::GPIOF_BASE,
        }
    }

    /// AHBENR bit gating the port clock
    pub const fn enable_bit(self) -> Ahbenr {
        match self {
            Port::A => Ahbenr::IOPAEN,
            Port::B => Ahbenr::IOPBEN,
            Port::C => Ahbenr::IOPCEN,
            Port::D => Ahbenr::IOPDEN,
            Port::E => Ahbenr::IOPEEN,
            Port::F => Ahbenr::IOPFEN,
        }
    }

    /// Position in [`Port::ALL`]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Finds the port whose register block contains `addr`
    pub fn from_address(addr: u32) -> Option<Self> {
        Port::ALL
            .iter()
            .copied()
            .find(|port| addr.wrapping_sub(port.base()) < map::BLOCK_SIZE)
    }
}

/// Capture/compare channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    C1,
    C2,
    C3,
    C4,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::C1, Channel::C2, Channel::C3, Channel::C4];

    /// Zero based channel index
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Channel number as printed in the reference manual
    pub const fn number(self) -> u8 {
        self as u8 + 1
    }

    /// Channels 1/2 live in CCMR1, 3/4 in CCMR2
    pub const fn ccmr_offset(self) -> u32 {
        match self {
            Channel::C1 | Channel::C2 => map::tim::CCMR1,
            Channel::C3 | Channel::C4 => map::tim::CCMR2,
        }
    }

    /// Half of the CCMR register owned by this channel
    pub const fn ccmr_slot(self) -> u8 {
        (self as u8) % 2
    }

    pub const fn ccr_offset(self) -> u32 {
        match self {
            Channel::C1 => map::tim::CCR1,
            Channel::C2 => map::tim::CCR2,
            Channel::C3 => map::tim::CCR3,
            Channel::C4 => map::tim::CCR4,
        }
    }
}

/// One row of the alternate function table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerOutput {
    pub timer: TimerId,
    pub channel: Channel,
    pub port: Port,
    pub pin: u8,
    pub af: u8,
}

const fn out(timer: TimerId, channel: Channel, port: Port, pin: u8, af: u8) -> TimerOutput {
    TimerOutput {
        timer,
        channel,
        port,
        pin,
        af,
    }
}

pub use self::table::TIMER_OUTPUTS;

mod table {
    use super::Channel::*;
    use super::Port::*;
    use super::TimerId::*;
    use super::{out, TimerOutput};

    /// Timer channel outputs routed to pins, STM32F072 datasheet tables 14-19
    ///
    /// Complementary (CHxN) and break inputs are not listed.
    pub static TIMER_OUTPUTS: &[TimerOutput] = &[
        out(TIM1, C1, A, 8, 2),
        out(TIM1, C2, A, 9, 2),
        out(TIM1, C3, A, 10, 2),
        out(TIM1, C4, A, 11, 2),
        out(TIM1, C1, E, 9, 0),
        out(TIM1, C2, E, 11, 0),
        out(TIM1, C3, E, 13, 0),
        out(TIM1, C4, E, 14, 0),
        out(TIM2, C1, A, 0, 2),
        out(TIM2, C1, A, 5, 2),
        out(TIM2, C1, A, 15, 2),
        out(TIM2, C2, A, 1, 2),
        out(TIM2, C2, B, 3, 2),
        out(TIM2, C3, A, 2, 2),
        out(TIM2, C3, B, 10, 2),
        out(TIM2, C4, A, 3, 2),
        out(TIM2, C4, B, 11, 2),
        out(TIM3, C1, A, 6, 1),
        out(TIM3, C1, B, 4, 1),
        out(TIM3, C1, C, 6, 0),
        out(TIM3, C1, E, 3, 0),
        out(TIM3, C2, A, 7, 1),
        out(TIM3, C2, B, 5, 1),
        out(TIM3, C2, C, 7, 0),
        out(TIM3, C2, E, 4, 0),
        out(TIM3, C3, B, 0, 1),
        out(TIM3, C3, C, 8, 0),
        out(TIM3, C3, E, 5, 0),
        out(TIM3, C4, B, 1, 1),
        out(TIM3, C4, C, 9, 0),
        out(TIM3, C4, E, 6, 0),
        out(TIM14, C1, A, 4, 4),
        out(TIM14, C1, A, 7, 4),
        out(TIM14, C1, B, 1, 0),
        out(TIM15, C1, A, 2, 0),
        out(TIM15, C1, B, 14, 1),
        out(TIM15, C1, F, 9, 0),
        out(TIM15, C2, A, 3, 0),
        out(TIM15, C2, B, 15, 1),
        out(TIM15, C2, F, 10, 0),
        out(TIM16, C1, A, 6, 5),
        out(TIM16, C1, B, 8, 2),
        out(TIM16, C1, E, 0, 0),
        out(TIM17, C1, A, 7, 5),
        out(TIM17, C1, B, 9, 2),
        out(TIM17, C1, E, 1, 0),
    ];
}

/// Looks up the channel `timer` drives on `port`/`pin`, whatever the AF index
pub fn find_output(timer: TimerId, port: Port, pin: u8) -> Option<&'static TimerOutput> {
    TIMER_OUTPUTS
        .iter()
        .find(|o| o.timer == timer && o.port == port && o.pin == pin)
}

/// All timer channels that can be routed to `port`/`pin` with `af`
pub fn outputs_on(port: Port, pin: u8, af: u8) -> impl Iterator<Item = &'static TimerOutput> {
    TIMER_OUTPUTS
        .iter()
        .filter(move |o| o.port == port && o.pin == pin && o.af == af)
}
