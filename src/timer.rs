//! Timers
//!
//! Register level access to the output compare side of TIM1/2/3/14/15/16/17.
//! The helpers write one register each and leave ordering to the caller, see
//! [`crate::pwm::configure_pwm`] for the sequence that produces a clean
//! waveform.

use crate::bus::Bus;
use crate::device::{Channel, TimerId, TimerInfo};
use crate::map::tim;
use crate::regs::{
    Alignment, Bdtr, CaptureSelection, Ccer, Ccmr, Cr1, Egr, OutputCompareMode, Polarity, Sr,
};

/// Register block of one timer instance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerRegs {
    id: TimerId,
    info: TimerInfo,
}

impl TimerRegs {
    pub const fn new(id: TimerId) -> Self {
        TimerRegs {
            id,
            info: id.info(),
        }
    }

    pub const fn id(&self) -> TimerId {
        self.id
    }

    pub const fn info(&self) -> TimerInfo {
        self.info
    }

    const fn addr(&self, offset: u32) -> u32 {
        self.info.base + offset
    }

    /// Counter clock = timer clock / (`psc` + 1)
    ///
    /// PSC is always buffered; the value takes effect on the next update event.
    pub fn set_prescaler<B: Bus>(&self, bus: &mut B, psc: u16) {
        bus.write(self.addr(tim::PSC), u32::from(psc));
    }

    /// The counter wraps after reaching `arr`, one period is `arr + 1` ticks
    ///
    /// Raw register write: bits above the counter width are dropped, as the
    /// hardware does. [`PwmConfig::validate`](crate::config::PwmConfig::validate)
    /// rejects such values before they get here.
    pub fn set_auto_reload<B: Bus>(&self, bus: &mut B, arr: u32) {
        bus.write(self.addr(tim::ARR), arr & self.info.counter_max);
    }

    /// Writes the compare register of `channel`
    ///
    /// With preload enabled on the channel this only fills the shadow
    /// register, the running period keeps the old threshold. Like
    /// [`TimerRegs::set_auto_reload`] this is a raw write, bits above the
    /// counter width are dropped.
    pub fn set_compare<B: Bus>(&self, bus: &mut B, channel: Channel, value: u32) {
        bus.write(self.addr(channel.ccr_offset()), value & self.info.counter_max);
    }

    pub fn compare<B: Bus>(&self, bus: &mut B, channel: Channel) -> u32 {
        bus.read(self.addr(channel.ccr_offset()))
    }

    /// Makes `channel` an output in `mode` with the given preload setting
    pub fn configure_output<B: Bus>(
        &self,
        bus: &mut B,
        channel: Channel,
        mode: OutputCompareMode,
        preload: bool,
    ) {
        let slot = channel.ccmr_slot();
        bus.modify(self.addr(channel.ccmr_offset()), |r| {
            Ccmr(r)
                .with_selection(slot, CaptureSelection::Output)
                .with_output_compare(slot, mode)
                .with_preload(slot, preload)
                .bits()
        });
    }

    /// Drives the channel's pin with the given polarity
    pub fn enable_output<B: Bus>(&self, bus: &mut B, channel: Channel, polarity: Polarity) {
        let index = channel.index();
        bus.modify(self.addr(tim::CCER), |r| {
            Ccer(r)
                .with_polarity(index, polarity)
                .with_enabled(index, true)
                .bits()
        });
    }

    /// Sets BDTR.MOE, without it the outputs of a timer with a break
    /// function stay disabled
    ///
    /// Does nothing on timers without a break/dead-time register.
    pub fn enable_main_output<B: Bus>(&self, bus: &mut B) {
        if self.info.has_break {
            bus.modify(self.addr(tim::BDTR), |r| (Bdtr::from_bits_retain(r) | Bdtr::MOE).bits());
        }
    }

    /// Edge-aligned mode, counting up
    pub fn set_edge_aligned_upcounting<B: Bus>(&self, bus: &mut B) {
        bus.modify(self.addr(tim::CR1), |r| {
            let cr1 = Cr1::from_bits_retain(r).with_alignment(Alignment::Edge);
            (cr1 - Cr1::DIR).bits()
        });
    }

    /// Forces an update event, moving the preload registers into the active
    /// ones and restarting the counter
    pub fn generate_update<B: Bus>(&self, bus: &mut B) {
        bus.write(self.addr(tim::EGR), Egr::UG.bits());
        // The above line raises an update event which will indicate
        // that the timer has wrapped. Since this is not the case,
        // it should be cleared
        bus.write(self.addr(tim::SR), !Sr::UIF.bits());
    }

    /// Enables the counter
    pub fn start<B: Bus>(&self, bus: &mut B) {
        bus.modify(self.addr(tim::CR1), |r| (Cr1::from_bits_retain(r) | Cr1::CEN).bits());
    }

    /// Disables the counter
    pub fn stop<B: Bus>(&self, bus: &mut B) {
        bus.modify(self.addr(tim::CR1), |r| (Cr1::from_bits_retain(r) - Cr1::CEN).bits());
    }

    pub fn is_running<B: Bus>(&self, bus: &mut B) -> bool {
        Cr1::from_bits_retain(bus.read(self.addr(tim::CR1))).contains(Cr1::CEN)
    }

    pub fn counter<B: Bus>(&self, bus: &mut B) -> u32 {
        bus.read(self.addr(tim::CNT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rcc::Enable;
    use crate::sim::SimDevice;

    fn tim3() -> (SimDevice, TimerRegs) {
        let mut sim = SimDevice::new();
        TimerId::TIM3.enable(&mut sim);
        (sim, TimerRegs::new(TimerId::TIM3))
    }

    #[test]
    fn channel_setup_leaves_neighbour_alone() {
        let (mut sim, tim3) = tim3();
        // CH4 already used as an input capture on TI1
        let ccmr2 = tim3.info().base + tim::CCMR2;
        sim.write_raw(ccmr2, 0b01 << 8 | 0b1111 << 12);

        tim3.configure_output(&mut sim, Channel::C3, OutputCompareMode::PwmMode1, true);

        let ccmr = Ccmr(sim.read_raw(ccmr2));
        assert_eq!(ccmr.output_compare(0), OutputCompareMode::PwmMode1);
        assert!(ccmr.preload(0));
        assert_eq!(ccmr.bits() >> 8, 0b1111_0001);
    }

    #[test]
    fn ccer_enable_is_per_channel() {
        let (mut sim, tim3) = tim3();
        tim3.enable_output(&mut sim, Channel::C3, Polarity::ActiveHigh);
        tim3.enable_output(&mut sim, Channel::C4, Polarity::ActiveLow);

        let ccer = Ccer(sim.read_raw(tim3.info().base + tim::CCER));
        assert!(ccer.enabled(2));
        assert!(ccer.enabled(3));
        assert!(!ccer.enabled(0));
        assert_eq!(ccer.polarity(3), Polarity::ActiveLow);
    }

    #[test]
    fn main_output_only_on_break_timers() {
        let (mut sim, tim3) = tim3();
        tim3.enable_main_output(&mut sim);
        assert_eq!(sim.read_raw(tim3.info().base + tim::BDTR), 0);

        TimerId::TIM1.enable(&mut sim);
        let tim1 = TimerRegs::new(TimerId::TIM1);
        tim1.enable_main_output(&mut sim);
        assert_eq!(sim.read_raw(tim1.info().base + tim::BDTR), Bdtr::MOE.bits());
    }

    #[test]
    fn update_event_clears_its_flag() {
        let (mut sim, tim3) = tim3();
        tim3.set_prescaler(&mut sim, 99);
        tim3.generate_update(&mut sim);

        assert_eq!(sim.read_raw(tim3.info().base + tim::SR) & Sr::UIF.bits(), 0);
        assert_eq!(sim.active_prescaler(TimerId::TIM3), 99);
    }

    #[test]
    fn upcounting_clears_direction_and_alignment() {
        let (mut sim, tim3) = tim3();
        let cr1 = tim3.info().base + tim::CR1;
        sim.write_raw(cr1, (Cr1::DIR | Cr1::CMS_1 | Cr1::ARPE).bits());

        tim3.set_edge_aligned_upcounting(&mut sim);
        assert_eq!(sim.read_raw(cr1), Cr1::ARPE.bits());

        tim3.start(&mut sim);
        assert!(tim3.is_running(&mut sim));
        tim3.stop(&mut sim);
        assert!(!tim3.is_running(&mut sim));
    }

    #[test]
    fn sixteen_bit_registers_are_masked() {
        let (mut sim, tim3) = tim3();
        tim3.set_compare(&mut sim, Channel::C1, 0x1_2345);
        assert_eq!(tim3.compare(&mut sim, Channel::C1), 0x2345);
    }
}
