//! PWM configuration
//!
//! A [`PwmConfig`] is plain data and can be built in a `const`. Nothing is
//! checked until [`PwmConfig::validate`], which the configurator runs before
//! it writes the first register: an impossible configuration is rejected as a
//! whole, never clamped or truncated to fit.

use fugit::HertzU32 as Hertz;

use crate::device::{self, Channel, Port, TimerId, TimerInfo};
use crate::regs::{OutputCompareMode, Polarity};

/// Largest prescaler, PSC is 16 bits wide on every timer
pub const PRESCALER_MAX: u32 = 0xFFFF;

/// Configuration errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The prescaler does not fit the 16-bit PSC register
    PrescalerOverflow { prescaler: u32 },
    /// A period must be at least one counter tick
    ZeroPeriod,
    /// `period - 1` does not fit the auto-reload register
    PeriodOverflow { period: u32, max: u32 },
    /// A compare value does not fit the compare register
    CompareOverflow { pin: u8, value: u32 },
    /// Pin numbers go from 0 to 15
    InvalidPin { pin: u8 },
    /// Both outputs were given the same pin
    DuplicatePin { pin: u8 },
    /// Alternate function indices are 4 bits
    InvalidAlternateFunction { af: u8 },
    /// The timer has no channel on this pin
    UnsupportedPin { timer: TimerId, port: Port, pin: u8 },
    /// The timer channel is on this pin, but under another alternate function
    AlternateFunctionMismatch {
        port: Port,
        pin: u8,
        requested: u8,
        expected: u8,
    },
    /// Both pins carry the same timer channel
    DuplicateChannel { channel: Channel },
    /// The timer has fewer than two compare channels
    NotPwmCapable { timer: TimerId },
    /// No exact prescaler/period pair produces the requested frequency
    UnreachableFrequency,
    /// Duty cycles go from 0 to 100 %
    DutyOutOfRange { percent: u8 },
    /// The duty cycle is not a whole number of counter ticks
    InexactDuty { percent: u8 },
}

/// Two channel, edge-aligned PWM on one timer
///
/// `period` is the length of one PWM period in counter ticks; the auto-reload
/// register is loaded with `period - 1`. One period therefore lasts
/// `(prescaler + 1) * period` timer clock cycles. `duty[i]` is the compare
/// value of the channel on `pins[i]`: in PWM mode 1 with active high polarity
/// that output is high for the first `duty[i]` ticks of every period. Values
/// of `period` or more keep the output high for the whole period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmConfig {
    pub timer: TimerId,
    pub port: Port,
    pub pins: [u8; 2],
    pub af: u8,
    pub prescaler: u32,
    pub period: u32,
    pub duty: [u32; 2],
    pub modes: [OutputCompareMode; 2],
    pub polarity: [Polarity; 2],
}

impl PwmConfig {
    /// TIM1_CH1 on PA8 and TIM1_CH2 on PA9 (AF2)
    ///
    /// With a 48 MHz timer clock the counter ticks at 1 kHz, a period lasts
    /// one second and both outputs are high for its first half.
    pub const EDGE_ALIGNED_DEMO: PwmConfig =
        PwmConfig::new(TimerId::TIM1, Port::A, [8, 9], 47_999, 1_000, [500, 500], 2);

    /// Both channels in PWM mode 1, active high
    pub const fn new(
        timer: TimerId,
        port: Port,
        pins: [u8; 2],
        prescaler: u32,
        period: u32,
        duty: [u32; 2],
        af: u8,
    ) -> Self {
        PwmConfig {
            timer,
            port,
            pins,
            af,
            prescaler,
            period,
            duty,
            modes: [OutputCompareMode::PwmMode1; 2],
            polarity: [Polarity::ActiveHigh; 2],
        }
    }

    pub const fn with_modes(mut self, modes: [OutputCompareMode; 2]) -> Self {
        self.modes = modes;
        self
    }

    pub const fn with_polarity(mut self, polarity: [Polarity; 2]) -> Self {
        self.polarity = polarity;
        self
    }

    /// Takes prescaler and period from a solved [`Timebase`]
    pub const fn with_timebase(mut self, timebase: Timebase) -> Self {
        self.prescaler = timebase.prescaler;
        self.period = timebase.period;
        self
    }

    /// Checks the configuration against the register widths and the pin
    /// capability table
    pub fn validate(&self) -> Result<Validated, Error> {
        let info = self.timer.info();

        if self.af > 0xF {
            return Err(Error::InvalidAlternateFunction { af: self.af });
        }
        for &pin in &self.pins {
            if pin > 15 {
                return Err(Error::InvalidPin { pin });
            }
        }
        if self.pins[0] == self.pins[1] {
            return Err(Error::DuplicatePin { pin: self.pins[0] });
        }
        if info.channels < 2 {
            return Err(Error::NotPwmCapable { timer: self.timer });
        }

        let channels = [self.channel_on(self.pins[0])?, self.channel_on(self.pins[1])?];
        if channels[0] == channels[1] {
            return Err(Error::DuplicateChannel {
                channel: channels[0],
            });
        }

        let prescaler = cast::u16(self.prescaler).map_err(|_| Error::PrescalerOverflow {
            prescaler: self.prescaler,
        })?;

        if self.period == 0 {
            return Err(Error::ZeroPeriod);
        }
        let auto_reload = self.period - 1;
        if auto_reload > info.counter_max {
            return Err(Error::PeriodOverflow {
                period: self.period,
                max: info.counter_max,
            });
        }

        for (&pin, &value) in self.pins.iter().zip(self.duty.iter()) {
            if value > info.counter_max {
                return Err(Error::CompareOverflow { pin, value });
            }
        }

        Ok(Validated {
            config: *self,
            info,
            channels,
            prescaler,
            auto_reload,
        })
    }

    fn channel_on(&self, pin: u8) -> Result<Channel, Error> {
        let output = device::find_output(self.timer, self.port, pin).ok_or(Error::UnsupportedPin {
            timer: self.timer,
            port: self.port,
            pin,
        })?;

        if output.af != self.af {
            return Err(Error::AlternateFunctionMismatch {
                port: self.port,
                pin,
                requested: self.af,
                expected: output.af,
            });
        }

        Ok(output.channel)
    }
}

/// A configuration that passed [`PwmConfig::validate`], with the register
/// values derived from it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Validated {
    config: PwmConfig,
    info: TimerInfo,
    channels: [Channel; 2],
    prescaler: u16,
    auto_reload: u32,
}

impl Validated {
    pub const fn config(&self) -> &PwmConfig {
        &self.config
    }

    pub const fn info(&self) -> TimerInfo {
        self.info
    }

    /// Channel driving `pins[0]` and `pins[1]`
    pub const fn channels(&self) -> [Channel; 2] {
        self.channels
    }

    /// PSC value
    pub const fn prescaler(&self) -> u16 {
        self.prescaler
    }

    /// ARR value, `period - 1`
    pub const fn auto_reload(&self) -> u32 {
        self.auto_reload
    }
}

/// Prescaler and period of the timer counter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timebase {
    pub prescaler: u32,
    /// Counter ticks per PWM period
    pub period: u32,
}

impl Timebase {
    /// Finds the prescaler/period pair producing exactly `frequency`
    ///
    /// The smallest workable prescaler wins, which leaves the longest period
    /// and so the finest duty cycle resolution. `counter_max` is the width
    /// limit of the timer's auto-reload register. Periods are at least two
    /// ticks long: with ARR = 0 the counter does not run.
    pub fn solve(timer_clock: Hertz, frequency: Hertz, counter_max: u32) -> Result<Self, Error> {
        let clock = timer_clock.raw();
        let frequency = frequency.raw();

        if frequency == 0 || frequency > clock || clock % frequency != 0 {
            return Err(Error::UnreachableFrequency);
        }

        let cycles = u64::from(clock / frequency);
        let max_period = u64::from(counter_max) + 1;
        let max_divider = (u64::from(PRESCALER_MAX) + 1).min(cycles / 2);

        // Dividers below this leave a period too long for the counter
        let first = ((cycles + max_period - 1) / max_period).max(1);

        (first..=max_divider)
            .find(|divider| cycles % divider == 0)
            .map(|divider| Timebase {
                prescaler: (divider - 1) as u32,
                period: (cycles / divider) as u32,
            })
            .ok_or(Error::UnreachableFrequency)
    }

    /// Timer clock cycles per PWM period, `(prescaler + 1) * period`
    pub const fn period_cycles(&self) -> u64 {
        (self.prescaler as u64 + 1) * self.period as u64
    }

    /// Compare value for a duty cycle of `percent`
    pub fn duty(&self, percent: u8) -> Result<u32, Error> {
        if percent > 100 {
            return Err(Error::DutyOutOfRange { percent });
        }

        let ticks = u64::from(self.period) * u64::from(percent);
        if ticks % 100 != 0 {
            return Err(Error::InexactDuty { percent });
        }

        Ok((ticks / 100) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_configuration_is_valid() {
        let validated = PwmConfig::EDGE_ALIGNED_DEMO.validate().unwrap();
        assert_eq!(validated.channels(), [Channel::C1, Channel::C2]);
        assert_eq!(validated.prescaler(), 47_999);
        assert_eq!(validated.auto_reload(), 999);
        assert!(validated.info().has_break);
    }

    #[test]
    fn prescaler_is_not_truncated() {
        let config = PwmConfig {
            prescaler: 0x1_0000,
            ..PwmConfig::EDGE_ALIGNED_DEMO
        };
        assert_eq!(
            config.validate(),
            Err(Error::PrescalerOverflow {
                prescaler: 0x1_0000
            })
        );
    }

    #[test]
    fn period_must_fit_auto_reload() {
        let longest = PwmConfig {
            period: 0x1_0000,
            ..PwmConfig::EDGE_ALIGNED_DEMO
        };
        assert_eq!(longest.validate().unwrap().auto_reload(), 0xFFFF);

        let too_long = PwmConfig {
            period: 0x1_0001,
            ..PwmConfig::EDGE_ALIGNED_DEMO
        };
        assert_eq!(
            too_long.validate(),
            Err(Error::PeriodOverflow {
                period: 0x1_0001,
                max: 0xFFFF
            })
        );

        let zero = PwmConfig {
            period: 0,
            ..PwmConfig::EDGE_ALIGNED_DEMO
        };
        assert_eq!(zero.validate(), Err(Error::ZeroPeriod));
    }

    #[test]
    fn tim2_takes_32_bit_periods() {
        let config = PwmConfig::new(TimerId::TIM2, Port::A, [0, 1], 0, 48_000_000, [1, 2], 2);
        assert_eq!(config.validate().unwrap().auto_reload(), 47_999_999);
    }

    #[test]
    fn compare_beyond_period_is_degenerate_but_valid() {
        let always_high = PwmConfig {
            duty: [1_000, 5_000],
            ..PwmConfig::EDGE_ALIGNED_DEMO
        };
        assert!(always_high.validate().is_ok());

        let overflow = PwmConfig {
            duty: [500, 0x1_0000],
            ..PwmConfig::EDGE_ALIGNED_DEMO
        };
        assert_eq!(
            overflow.validate(),
            Err(Error::CompareOverflow {
                pin: 9,
                value: 0x1_0000
            })
        );
    }

    #[test]
    fn pins_are_checked_against_the_table() {
        let wrong_port = PwmConfig {
            port: Port::C,
            ..PwmConfig::EDGE_ALIGNED_DEMO
        };
        assert_eq!(
            wrong_port.validate(),
            Err(Error::UnsupportedPin {
                timer: TimerId::TIM1,
                port: Port::C,
                pin: 8
            })
        );

        // PC8/PC9 carry TIM3_CH3/CH4 on AF0, not AF2
        let wrong_af = PwmConfig::new(TimerId::TIM3, Port::C, [8, 9], 47_999, 1_000, [500, 500], 2);
        assert_eq!(
            wrong_af.validate(),
            Err(Error::AlternateFunctionMismatch {
                port: Port::C,
                pin: 8,
                requested: 2,
                expected: 0
            })
        );

        let right_af = PwmConfig { af: 0, ..wrong_af };
        assert_eq!(right_af.validate().unwrap().channels(), [Channel::C3, Channel::C4]);
    }

    #[test]
    fn pins_must_be_distinct_outputs() {
        let same_pin = PwmConfig {
            pins: [8, 8],
            ..PwmConfig::EDGE_ALIGNED_DEMO
        };
        assert_eq!(same_pin.validate(), Err(Error::DuplicatePin { pin: 8 }));

        // PA0 and PA5 are both TIM2_CH1
        let same_channel = PwmConfig::new(TimerId::TIM2, Port::A, [0, 5], 0, 100, [50, 50], 2);
        assert_eq!(
            same_channel.validate(),
            Err(Error::DuplicateChannel {
                channel: Channel::C1
            })
        );

        let bad_pin = PwmConfig {
            pins: [8, 16],
            ..PwmConfig::EDGE_ALIGNED_DEMO
        };
        assert_eq!(bad_pin.validate(), Err(Error::InvalidPin { pin: 16 }));

        let bad_af = PwmConfig {
            af: 16,
            ..PwmConfig::EDGE_ALIGNED_DEMO
        };
        assert_eq!(bad_af.validate(), Err(Error::InvalidAlternateFunction { af: 16 }));
    }

    #[test]
    fn single_channel_timers_are_rejected() {
        let config = PwmConfig::new(TimerId::TIM16, Port::B, [8, 9], 0, 100, [50, 50], 2);
        assert_eq!(
            config.validate(),
            Err(Error::NotPwmCapable {
                timer: TimerId::TIM16
            })
        );
    }

    #[test]
    fn solver_prefers_smallest_prescaler() {
        let clk = Hertz::from_raw(48_000_000);

        let kilo = Timebase::solve(clk, Hertz::from_raw(1_000), 0xFFFF).unwrap();
        assert_eq!(kilo, Timebase { prescaler: 0, period: 48_000 });

        let one_hz = Timebase::solve(clk, Hertz::from_raw(1), 0xFFFF).unwrap();
        assert_eq!(one_hz, Timebase { prescaler: 749, period: 64_000 });
        assert_eq!(one_hz.period_cycles(), 48_000_000);

        let wide = Timebase::solve(clk, Hertz::from_raw(1), 0xFFFF_FFFF).unwrap();
        assert_eq!(wide, Timebase { prescaler: 0, period: 48_000_000 });

        let fastest = Timebase::solve(clk, Hertz::from_raw(24_000_000), 0xFFFF).unwrap();
        assert_eq!(fastest, Timebase { prescaler: 0, period: 2 });
    }

    #[test]
    fn solver_rejects_unreachable_frequencies() {
        let clk = Hertz::from_raw(48_000_000);
        // A 48 MHz output would need a one tick period
        for &f in &[7, 0, 96_000_000, 48_000_000] {
            assert_eq!(
                Timebase::solve(clk, Hertz::from_raw(f), 0xFFFF),
                Err(Error::UnreachableFrequency)
            );
        }

        // 2 * 65537 cycles: the only dividers are 2 (period too long) and
        // 65537 (prescaler too wide)
        let odd = Hertz::from_raw(131_074);
        assert_eq!(
            Timebase::solve(odd, Hertz::from_raw(1), 0xFFFF),
            Err(Error::UnreachableFrequency)
        );
    }

    #[test]
    fn duty_in_percent() {
        let timebase = Timebase { prescaler: 47_999, period: 1_000 };
        assert_eq!(timebase.duty(50), Ok(500));
        assert_eq!(timebase.duty(0), Ok(0));
        assert_eq!(timebase.duty(100), Ok(1_000));
        assert_eq!(timebase.duty(101), Err(Error::DutyOutOfRange { percent: 101 }));

        let coarse = Timebase { prescaler: 0, period: 3 };
        assert_eq!(coarse.duty(50), Err(Error::InexactDuty { percent: 50 }));
    }

    #[test]
    fn timebase_feeds_configuration() {
        let clk = Hertz::from_raw(48_000_000);
        let timebase = Timebase::solve(clk, Hertz::from_raw(1), 0xFFFF).unwrap();
        let config = PwmConfig::EDGE_ALIGNED_DEMO.with_timebase(timebase);
        let validated = config.validate().unwrap();
        assert_eq!(validated.prescaler(), 749);
        assert_eq!(validated.auto_reload(), 63_999);
    }
}
