//! Edge-aligned PWM bring-up
//!
//! [`configure_pwm`] takes a timer from reset (or whatever state it was left
//! in) to a running two channel PWM generator. The register sequence is:
//!
//! 1. clock enables, GPIO port first, then the timer
//! 2. both pins to alternate function mode with the requested AF index
//! 3. `PSC`, `ARR` and the two `CCRx`
//! 4. `CCMRx`: output, PWM mode, compare preload
//! 5. `CCER` polarity and enable, `BDTR.MOE` on timers with a break input
//! 6. `CR1` edge-aligned upcounting, `EGR.UG`, `CR1.CEN`
//!
//! Only the fields belonging to the chosen pins and channels are written; the
//! rest of every shared register keeps its value.

use fugit::{HertzU32 as Hertz, MicrosDurationU64};

use crate::bus::Bus;
use crate::config::{Error, PwmConfig};
use crate::device::{Channel, TimerId};
use crate::gpio::GpioRegs;
use crate::rcc::{Clocks, Enable};
use crate::regs::{OutputCompareMode, Polarity};
use crate::timer::TimerRegs;

/// Configures `config.timer` for PWM output on `config.pins` and starts it
///
/// Nothing is written when the configuration is rejected.
pub fn configure_pwm<B: Bus>(bus: &mut B, config: &PwmConfig) -> Result<Waveform, Error> {
    let validated = config.validate().map_err(|e| {
        warn!("PWM configuration rejected: {}", e);
        e
    })?;

    let channels = validated.channels();
    let timer = TimerRegs::new(config.timer);
    let port = GpioRegs::new(config.port);

    debug!("enabling clocks of {} and {}", config.port, config.timer);
    config.port.enable(bus);
    config.timer.enable(bus);

    for &pin in &config.pins {
        trace!("routing P{}{} to AF{}", config.port, pin, config.af);
        port.into_alternate(bus, pin, config.af);
    }

    debug!(
        "timebase PSC={} ARR={}",
        validated.prescaler(),
        validated.auto_reload()
    );
    timer.set_prescaler(bus, validated.prescaler());
    timer.set_auto_reload(bus, validated.auto_reload());
    for (&channel, &duty) in channels.iter().zip(config.duty.iter()) {
        timer.set_compare(bus, channel, duty);
    }

    for (i, &channel) in channels.iter().enumerate() {
        debug!("CH{}: {}, {}", channel.number(), config.modes[i], config.polarity[i]);
        timer.configure_output(bus, channel, config.modes[i], true);
        timer.enable_output(bus, channel, config.polarity[i]);
    }
    timer.enable_main_output(bus);

    timer.set_edge_aligned_upcounting(bus);
    timer.generate_update(bus);
    timer.start(bus);
    info!("{} running", config.timer);

    Ok(Waveform {
        timer: config.timer,
        channels,
        prescaler: validated.prescaler(),
        period: config.period,
        duty: config.duty,
        modes: config.modes,
        polarity: config.polarity,
    })
}

/// The waveform a successful [`configure_pwm`] left running
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Waveform {
    timer: TimerId,
    channels: [Channel; 2],
    prescaler: u16,
    period: u32,
    duty: [u32; 2],
    modes: [OutputCompareMode; 2],
    polarity: [Polarity; 2],
}

impl Waveform {
    pub const fn timer(&self) -> TimerId {
        self.timer
    }

    /// Channels driving `pins[0]` and `pins[1]`
    pub const fn channels(&self) -> [Channel; 2] {
        self.channels
    }

    /// Counter ticks per period
    pub const fn period_ticks(&self) -> u32 {
        self.period
    }

    /// Timer clock cycles per period, `(PSC + 1) * (ARR + 1)`
    pub const fn period_cycles(&self) -> u64 {
        (self.prescaler as u64 + 1) * self.period as u64
    }

    /// Counter ticks per period during which output `index` is high
    ///
    /// `None` for an index other than 0 or 1, and for the compare-match
    /// modes, whose output does not repeat every period.
    pub fn high_ticks(&self, index: usize) -> Option<u32> {
        let active = (*self.duty.get(index)?).min(self.period);
        let active = match self.modes[index] {
            OutputCompareMode::PwmMode1 => active,
            OutputCompareMode::PwmMode2 => self.period - active,
            OutputCompareMode::ForceActive => self.period,
            OutputCompareMode::ForceInactive => 0,
            _ => return None,
        };

        Some(match self.polarity[index] {
            Polarity::ActiveHigh => active,
            Polarity::ActiveLow => self.period - active,
        })
    }

    /// Counter clock: timer clock / (PSC + 1)
    ///
    /// Rounded down to whole hertz when the timer clock is not a multiple of
    /// PSC + 1; [`Waveform::period_cycles`] stays exact.
    pub fn tick_rate(&self, clocks: &Clocks) -> Hertz {
        Hertz::from_raw(clocks.timclk().raw() / (u32::from(self.prescaler) + 1))
    }

    /// Length of one period, rounded down to whole microseconds
    ///
    /// `None` when the timer clock is 0 Hz or the period does not fit 64-bit
    /// microseconds.
    pub fn period_duration(&self, clocks: &Clocks) -> Option<MicrosDurationU64> {
        let timclk = u128::from(clocks.timclk().raw());
        let micros = (u128::from(self.period_cycles()) * 1_000_000).checked_div(timclk)?;
        u64::try_from(micros).ok().map(MicrosDurationU64::from_ticks)
    }
}
