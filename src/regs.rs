//! Typed register values
//!
//! Each multi-field register gets a newtype whose accessors only ever touch
//! their own field: `with_*` methods mask the field, set the new value and
//! keep every other bit of the word as it was. Registers made of independent
//! single-bit flags are `bitflags` sets built with `from_bits_retain`, so
//! reserved or unnamed bits survive a read-modify-write as well.

use bitflags::bitflags;

/// MODER field values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    Input = 0b00,
    Output = 0b01,
    Alternate = 0b10,
    Analog = 0b11,
}

impl PinMode {
    const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => PinMode::Input,
            0b01 => PinMode::Output,
            0b10 => PinMode::Alternate,
            _ => PinMode::Analog,
        }
    }
}

/// GPIO port mode register, two bits per pin
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Moder(pub u32);

impl Moder {
    const fn shift(pin: u8) -> u32 {
        (pin as u32 & 0xF) * 2
    }

    pub const fn mode(self, pin: u8) -> PinMode {
        PinMode::from_bits(self.0 >> Self::shift(pin))
    }

    /// Sets the mode of `pin`, other pins keep theirs
    pub const fn with_mode(self, pin: u8, mode: PinMode) -> Self {
        let shift = Self::shift(pin);
        Moder((self.0 & !(0b11 << shift)) | ((mode as u32) << shift))
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

/// One half of the alternate function register pair, four bits per pin
///
/// AFRL holds pins 0-7 and AFRH pins 8-15; the accessors take the full pin
/// number and use its position within the half.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Afr(pub u32);

impl Afr {
    const fn shift(pin: u8) -> u32 {
        (pin as u32 % 8) * 4
    }

    pub const fn af(self, pin: u8) -> u8 {
        ((self.0 >> Self::shift(pin)) & 0xF) as u8
    }

    /// Selects alternate function `af` for `pin`, other pins keep theirs
    pub const fn with_af(self, pin: u8, af: u8) -> Self {
        let shift = Self::shift(pin);
        Afr((self.0 & !(0xF << shift)) | (((af & 0xF) as u32) << shift))
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

/// CCxS: direction of a capture/compare channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureSelection {
    Output = 0b00,
    InputTi1 = 0b01,
    InputTi2 = 0b10,
    InputTrc = 0b11,
}

impl CaptureSelection {
    const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => CaptureSelection::Output,
            0b01 => CaptureSelection::InputTi1,
            0b10 => CaptureSelection::InputTi2,
            _ => CaptureSelection::InputTrc,
        }
    }
}

/// OCxM: output compare mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputCompareMode {
    /// Compare matches have no effect on the output
    Frozen = 0b000,
    /// OCxREF goes high on a match
    ActiveOnMatch = 0b001,
    /// OCxREF goes low on a match
    InactiveOnMatch = 0b010,
    /// OCxREF toggles on a match
    Toggle = 0b011,
    ForceInactive = 0b100,
    ForceActive = 0b101,
    /// Upcounting: active while CNT < CCRx
    PwmMode1 = 0b110,
    /// Upcounting: inactive while CNT < CCRx
    PwmMode2 = 0b111,
}

impl OutputCompareMode {
    const fn from_bits(bits: u32) -> Self {
        match bits & 0b111 {
            0b000 => OutputCompareMode::Frozen,
            0b001 => OutputCompareMode::ActiveOnMatch,
            0b010 => OutputCompareMode::InactiveOnMatch,
            0b011 => OutputCompareMode::Toggle,
            0b100 => OutputCompareMode::ForceInactive,
            0b101 => OutputCompareMode::ForceActive,
            0b110 => OutputCompareMode::PwmMode1,
            _ => OutputCompareMode::PwmMode2,
        }
    }
}

/// Capture/compare mode register (CCMR1 or CCMR2), output compare layout
///
/// Each register carries two channels; `slot` 0 is the odd channel (CH1/CH3)
/// in bits 0-7, slot 1 the even channel (CH2/CH4) in bits 8-15.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ccmr(pub u32);

impl Ccmr {
    const CCS: u32 = 0b11;
    const OCFE: u32 = 1 << 2;
    const OCPE: u32 = 1 << 3;
    const OCM: u32 = 0b111 << 4;
    const OCCE: u32 = 1 << 7;

    const fn shift(slot: u8) -> u32 {
        (slot as u32 & 1) * 8
    }

    const fn with_field(self, slot: u8, mask: u32, value: u32) -> Self {
        let shift = Self::shift(slot);
        Ccmr((self.0 & !(mask << shift)) | ((value & mask) << shift))
    }

    const fn field(self, slot: u8, mask: u32) -> u32 {
        (self.0 >> Self::shift(slot)) & mask
    }

    pub const fn selection(self, slot: u8) -> CaptureSelection {
        CaptureSelection::from_bits(self.field(slot, Self::CCS))
    }

    pub const fn with_selection(self, slot: u8, selection: CaptureSelection) -> Self {
        self.with_field(slot, Self::CCS, selection as u32)
    }

    pub const fn output_compare(self, slot: u8) -> OutputCompareMode {
        OutputCompareMode::from_bits(self.field(slot, Self::OCM) >> 4)
    }

    pub const fn with_output_compare(self, slot: u8, mode: OutputCompareMode) -> Self {
        self.with_field(slot, Self::OCM, (mode as u32) << 4)
    }

    /// OCxPE: CCRx writes go to the preload register and are latched on the
    /// next update event
    pub const fn preload(self, slot: u8) -> bool {
        self.field(slot, Self::OCPE) != 0
    }

    pub const fn with_preload(self, slot: u8, enable: bool) -> Self {
        self.with_field(slot, Self::OCPE, if enable { Self::OCPE } else { 0 })
    }

    pub const fn fast(self, slot: u8) -> bool {
        self.field(slot, Self::OCFE) != 0
    }

    pub const fn with_fast(self, slot: u8, enable: bool) -> Self {
        self.with_field(slot, Self::OCFE, if enable { Self::OCFE } else { 0 })
    }

    pub const fn clear_enable(self, slot: u8) -> bool {
        self.field(slot, Self::OCCE) != 0
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

/// Output polarity of a compare channel (CCxP)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

/// Capture/compare enable register, four bits per channel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ccer(pub u32);

impl Ccer {
    const CCE: u32 = 1 << 0;
    const CCP: u32 = 1 << 1;
    const CCNE: u32 = 1 << 2;
    const CCNP: u32 = 1 << 3;

    const fn shift(index: usize) -> u32 {
        (index as u32 & 0b11) * 4
    }

    const fn with_bit(self, index: usize, bit: u32, set: bool) -> Self {
        let bit = bit << Self::shift(index);
        if set {
            Ccer(self.0 | bit)
        } else {
            Ccer(self.0 & !bit)
        }
    }

    const fn bit(self, index: usize, bit: u32) -> bool {
        self.0 & (bit << Self::shift(index)) != 0
    }

    /// CCxE of the channel with zero based `index`
    pub const fn enabled(self, index: usize) -> bool {
        self.bit(index, Self::CCE)
    }

    pub const fn with_enabled(self, index: usize, enable: bool) -> Self {
        self.with_bit(index, Self::CCE, enable)
    }

    pub const fn polarity(self, index: usize) -> Polarity {
        if self.bit(index, Self::CCP) {
            Polarity::ActiveLow
        } else {
            Polarity::ActiveHigh
        }
    }

    pub const fn with_polarity(self, index: usize, polarity: Polarity) -> Self {
        self.with_bit(index, Self::CCP, matches!(polarity, Polarity::ActiveLow))
    }

    pub const fn complementary_enabled(self, index: usize) -> bool {
        self.bit(index, Self::CCNE)
    }

    pub const fn complementary_polarity(self, index: usize) -> Polarity {
        if self.bit(index, Self::CCNP) {
            Polarity::ActiveLow
        } else {
            Polarity::ActiveHigh
        }
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

/// Counter alignment (CR1.CMS)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Alignment {
    /// Counts in one direction, set by CR1.DIR
    Edge = 0b00,
    Center1 = 0b01,
    Center2 = 0b10,
    Center3 = 0b11,
}

bitflags! {
    /// TIMx_CR1
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Cr1: u32 {
        /// Counter enable
        const CEN = 1 << 0;
        /// Update disable
        const UDIS = 1 << 1;
        /// Update request source
        const URS = 1 << 2;
        /// One pulse mode
        const OPM = 1 << 3;
        /// Downcounting
        const DIR = 1 << 4;
        const CMS_0 = 1 << 5;
        const CMS_1 = 1 << 6;
        /// ARR is buffered
        const ARPE = 1 << 7;
        const CKD_0 = 1 << 8;
        const CKD_1 = 1 << 9;
    }
}

impl Cr1 {
    const CMS_SHIFT: u32 = 5;

    pub fn alignment(self) -> Alignment {
        match (self.bits() >> Self::CMS_SHIFT) & 0b11 {
            0b00 => Alignment::Edge,
            0b01 => Alignment::Center1,
            0b10 => Alignment::Center2,
            _ => Alignment::Center3,
        }
    }

    pub fn with_alignment(self, alignment: Alignment) -> Self {
        let bits = (self.bits() & !(0b11 << Self::CMS_SHIFT))
            | ((alignment as u32) << Self::CMS_SHIFT);
        Cr1::from_bits_retain(bits)
    }
}

bitflags! {
    /// TIMx_SR, bits are cleared by writing 0
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Sr: u32 {
        /// Update interrupt flag
        const UIF = 1 << 0;
        const CC1IF = 1 << 1;
        const CC2IF = 1 << 2;
        const CC3IF = 1 << 3;
        const CC4IF = 1 << 4;
        const COMIF = 1 << 5;
        const TIF = 1 << 6;
        const BIF = 1 << 7;
    }
}

bitflags! {
    /// TIMx_EGR, write only
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Egr: u32 {
        /// Update generation: reinitializes the counter and latches the
        /// preload registers
        const UG = 1 << 0;
        const CC1G = 1 << 1;
        const CC2G = 1 << 2;
        const CC3G = 1 << 3;
        const CC4G = 1 << 4;
        const COMG = 1 << 5;
        const TG = 1 << 6;
        const BG = 1 << 7;
    }
}

bitflags! {
    /// TIMx_BDTR single-bit fields; DTG and LOCK are carried as unnamed bits
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Bdtr: u32 {
        const OSSI = 1 << 10;
        const OSSR = 1 << 11;
        const BKE = 1 << 12;
        const BKP = 1 << 13;
        const AOE = 1 << 14;
        /// Main output enable
        const MOE = 1 << 15;
    }
}

bitflags! {
    /// RCC_AHBENR
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Ahbenr: u32 {
        const DMAEN = 1 << 0;
        const DMA2EN = 1 << 1;
        const SRAMEN = 1 << 2;
        const FLITFEN = 1 << 4;
        const CRCEN = 1 << 6;
        const IOPAEN = 1 << 17;
        const IOPBEN = 1 << 18;
        const IOPCEN = 1 << 19;
        const IOPDEN = 1 << 20;
        const IOPEEN = 1 << 21;
        const IOPFEN = 1 << 22;
        const TSCEN = 1 << 24;
    }
}

bitflags! {
    /// RCC_APB1ENR, timer bits only
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Apb1enr: u32 {
        const TIM2EN = 1 << 0;
        const TIM3EN = 1 << 1;
        const TIM6EN = 1 << 4;
        const TIM7EN = 1 << 5;
        const TIM14EN = 1 << 8;
    }
}

bitflags! {
    /// RCC_APB2ENR
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Apb2enr: u32 {
        const SYSCFGCOMPEN = 1 << 0;
        const USART6EN = 1 << 5;
        const ADCEN = 1 << 9;
        const TIM1EN = 1 << 11;
        const SPI1EN = 1 << 12;
        const USART1EN = 1 << 14;
        const TIM15EN = 1 << 16;
        const TIM16EN = 1 << 17;
        const TIM17EN = 1 << 18;
        const DBGMCUEN = 1 << 22;
    }
}

#[cfg(feature = "defmt")]
macro_rules! format_bits {
    ($($name:ident),+) => {
        $(
            impl defmt::Format for $name {
                fn format(&self, f: defmt::Formatter) {
                    defmt::write!(f, "{=str}({=u32:#x})", stringify!($name), self.bits())
                }
            }
        )+
    };
}

#[cfg(feature = "defmt")]
format_bits!(Cr1, Sr, Egr, Bdtr, Ahbenr, Apb1enr, Apb2enr);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moder_only_touches_its_pin() {
        let before = Moder(0x2800_0000 | 0b01 << 14);
        let after = before.with_mode(8, PinMode::Alternate);

        assert_eq!(after.mode(8), PinMode::Alternate);
        assert_eq!(after.mode(7), PinMode::Output);
        assert_eq!(after.mode(13), PinMode::Alternate);
        assert_eq!(after.mode(14), PinMode::Alternate);
        assert_eq!(after.bits() & !(0b11 << 16), before.bits());
    }

    #[test]
    fn moder_overwrites_previous_mode() {
        let analog = Moder(0xFFFF_FFFF);
        let after = analog.with_mode(9, PinMode::Alternate);
        assert_eq!(after.mode(9), PinMode::Alternate);
        assert_eq!(after.bits(), 0xFFFF_FFFF & !(0b01 << 18));
    }

    #[test]
    fn afr_clears_stale_index() {
        // PC8 previously on AF7, an OR would produce AF7 again
        let stale = Afr(0x7 | 0x5 << 4);
        let after = stale.with_af(8, 2);
        assert_eq!(after.af(8), 2);
        assert_eq!(after.af(9), 5);
        assert_eq!(after.bits(), 0x2 | 0x5 << 4);
    }

    #[test]
    fn afr_uses_position_within_half() {
        let afr = Afr(0).with_af(3, 0xA).with_af(15, 0x1);
        assert_eq!(afr.bits(), 0xA << 12 | 0x1 << 28);
        assert_eq!(afr.af(11), 0xA);
    }

    #[test]
    fn ccmr_slots_are_independent() {
        let ch4_input = Ccmr(0).with_selection(1, CaptureSelection::InputTi1);
        let ccmr = ch4_input
            .with_selection(0, CaptureSelection::Output)
            .with_output_compare(0, OutputCompareMode::PwmMode1)
            .with_preload(0, true);

        assert_eq!(ccmr.output_compare(0), OutputCompareMode::PwmMode1);
        assert!(ccmr.preload(0));
        assert_eq!(ccmr.selection(1), CaptureSelection::InputTi1);
        assert!(!ccmr.preload(1));
        assert_eq!(ccmr.bits(), 0b0110_1000 | 0b01 << 8);
    }

    #[test]
    fn ccmr_mode_is_replaced_not_merged() {
        let pwm2 = Ccmr(0).with_output_compare(1, OutputCompareMode::PwmMode2);
        let ccmr = pwm2.with_output_compare(1, OutputCompareMode::ActiveOnMatch);
        assert_eq!(ccmr.output_compare(1), OutputCompareMode::ActiveOnMatch);
        assert_eq!(ccmr.bits(), 0b001 << 12);
    }

    #[test]
    fn ccer_channel_bits() {
        let ccer = Ccer(0)
            .with_enabled(2, true)
            .with_polarity(3, Polarity::ActiveLow)
            .with_enabled(3, true);
        assert_eq!(ccer.bits(), 1 << 8 | 1 << 12 | 1 << 13);
        assert!(ccer.enabled(2));
        assert_eq!(ccer.polarity(2), Polarity::ActiveHigh);
        assert_eq!(ccer.polarity(3), Polarity::ActiveLow);

        let cleared = ccer.with_polarity(3, Polarity::ActiveHigh);
        assert_eq!(cleared.bits(), 1 << 8 | 1 << 12);
    }

    #[test]
    fn cr1_alignment_keeps_flags() {
        let cr1 = (Cr1::ARPE | Cr1::CMS_1 | Cr1::CMS_0).with_alignment(Alignment::Edge);
        assert_eq!(cr1, Cr1::ARPE);
        assert_eq!(Cr1::CMS_0.alignment(), Alignment::Center1);
    }

    #[test]
    fn flags_retain_unknown_bits() {
        let raw = 0x00AB | Bdtr::BKE.bits();
        let bdtr = Bdtr::from_bits_retain(raw) | Bdtr::MOE;
        assert_eq!(bdtr.bits(), raw | 1 << 15);
    }
}
