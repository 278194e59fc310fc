//! Register level model of the STM32F072
//!
//! [`SimDevice`] implements [`Bus`] over the RCC, GPIO and timer blocks the
//! crate drives, so the configuration sequence can be checked on the host.
//! Besides storing register contents the model reproduces the behaviour the
//! PWM bring-up depends on:
//!
//! - peripherals ignore accesses while their clock is gated (reads return 0)
//! - `BSRR`/`BRR` act on `ODR`, `SR` flags are cleared by writing 0
//! - `PSC` is always buffered, `ARR` when `CR1.ARPE` is set and `CCRx` when
//!   `OCxPE` is set; `EGR.UG` and counter overflows latch the buffers
//! - the counter runs edge-aligned upwards from [`SimDevice::advance`]
//!
//! Every bus access is appended to a journal and every access the hardware
//! would ignore is recorded as a [`Violation`]. Down and center-aligned
//! counting, the repetition counter and dead time are not modelled.

use crate::bus::Bus;
use crate::device::{self, Channel, Port, TimerId, TimerInfo};
use crate::map::{self, gpio, rcc, tim};
use crate::regs::{
    Afr, Bdtr, CaptureSelection, Ccer, Ccmr, Cr1, Egr, Moder, OutputCompareMode, PinMode,
    Polarity, Sr,
};

/// Number of accesses kept in the journal
pub const JOURNAL_CAPACITY: usize = 256;

/// Number of violations kept
pub const VIOLATION_CAPACITY: usize = 16;

const RCC_WORDS: usize = 14;
const GPIO_WORDS: usize = 11;
const TIM_WORDS: usize = 18;

const RCC_CR_RESET: u32 = 0x0000_0083;
const GPIOA_OSPEEDR_RESET: u32 = 0x0C00_0000;
const GPIOA_PUPDR_RESET: u32 = 0x2400_0000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// One bus access, with the value read or written
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    pub access: Access,
    pub addr: u32,
    pub value: u32,
}

/// An access real hardware would not have honoured
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Violation {
    /// Nothing modelled lives at this address
    Unmapped { addr: u32 },
    /// The peripheral's clock was gated
    Unclocked { addr: u32 },
}

/// Fixed capacity list that counts what it had to drop
struct Bounded<T: Copy, const N: usize> {
    items: [T; N],
    len: usize,
    dropped: usize,
}

impl<T: Copy, const N: usize> Bounded<T, N> {
    fn new(fill: T) -> Self {
        Bounded {
            items: [fill; N],
            len: 0,
            dropped: 0,
        }
    }

    fn push(&mut self, item: T) {
        if self.len < N {
            self.items[self.len] = item;
            self.len += 1;
        } else {
            self.dropped += 1;
        }
    }

    fn as_slice(&self) -> &[T] {
        &self.items[..self.len]
    }

    fn clear(&mut self) {
        self.len = 0;
        self.dropped = 0;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Rcc(usize),
    Gpio(Port, u32),
    Timer(TimerId, u32),
}

const fn word(offset: u32) -> usize {
    (offset / 4) as usize
}

/// GPIO port registers
#[derive(Clone, Copy)]
struct GpioState {
    regs: [u32; GPIO_WORDS],
}

impl GpioState {
    const fn reset(port: Port) -> Self {
        let mut regs = [0; GPIO_WORDS];
        if let Port::A = port {
            regs[word(gpio::MODER)] = gpio::MODER_RESET_A;
            regs[word(gpio::OSPEEDR)] = GPIOA_OSPEEDR_RESET;
            regs[word(gpio::PUPDR)] = GPIOA_PUPDR_RESET;
        }
        GpioState { regs }
    }

    fn reg(&self, offset: u32) -> u32 {
        self.regs[word(offset)]
    }

    fn store(&mut self, offset: u32, value: u32) {
        match offset {
            gpio::IDR => {}
            gpio::BSRR => {
                // Set wins over reset for the same pin
                let odr = self.reg(gpio::ODR);
                self.set_odr((odr & !(value >> 16)) | (value & 0xFFFF));
            }
            gpio::BRR => {
                let odr = self.reg(gpio::ODR);
                self.set_odr(odr & !(value & 0xFFFF));
            }
            gpio::ODR => self.set_odr(value),
            _ => self.regs[word(offset)] = value,
        }
    }

    fn set_odr(&mut self, odr: u32) {
        let odr = odr & 0xFFFF;
        self.regs[word(gpio::ODR)] = odr;
        self.regs[word(gpio::IDR)] = odr;
    }
}

/// One timer: the register file plus the shadow registers the counter
/// actually uses
#[derive(Clone, Copy)]
struct TimerState {
    info: TimerInfo,
    regs: [u32; TIM_WORDS],
    psc: u32,
    arr: u32,
    ccr: [u32; 4],
    /// Timer clock cycles since the last counter tick
    divider: u32,
    /// OCxREF of the compare-match modes
    oc_ref: [bool; 4],
}

impl TimerState {
    const fn reset(id: TimerId) -> Self {
        let info = id.info();
        let mut regs = [0; TIM_WORDS];
        regs[word(tim::ARR)] = info.counter_max;
        TimerState {
            info,
            regs,
            psc: 0,
            arr: info.counter_max,
            ccr: [0; 4],
            divider: 0,
            oc_ref: [false; 4],
        }
    }

    fn reg(&self, offset: u32) -> u32 {
        self.regs[word(offset)]
    }

    fn cr1(&self) -> Cr1 {
        Cr1::from_bits_retain(self.reg(tim::CR1))
    }

    fn ccmr(&self, channel: Channel) -> Ccmr {
        Ccmr(self.reg(channel.ccmr_offset()))
    }

    fn load(&self, offset: u32) -> u32 {
        match offset {
            tim::EGR => 0,
            _ => self.reg(offset),
        }
    }

    fn store(&mut self, offset: u32, value: u32) {
        let max = self.info.counter_max;
        match offset {
            tim::SR => self.regs[word(offset)] &= value,
            tim::EGR => {
                if Egr::from_bits_retain(value).contains(Egr::UG) {
                    self.force_update();
                }
            }
            tim::CNT => self.regs[word(offset)] = value & max,
            tim::PSC => self.regs[word(offset)] = value & 0xFFFF,
            tim::ARR => {
                self.regs[word(offset)] = value & max;
                if !self.cr1().contains(Cr1::ARPE) {
                    self.arr = value & max;
                }
            }
            tim::CCR1..=tim::CCR4 => {
                let channel = Channel::ALL[word(offset - tim::CCR1)];
                self.regs[word(offset)] = value & max;
                if !self.ccmr(channel).preload(channel.ccmr_slot()) {
                    self.ccr[channel.index()] = value & max;
                }
            }
            _ => self.regs[word(offset)] = value,
        }
    }

    fn latch(&mut self) {
        self.psc = self.reg(tim::PSC);
        self.arr = self.reg(tim::ARR);
        for channel in Channel::ALL {
            self.ccr[channel.index()] = self.reg(channel.ccr_offset());
        }
    }

    /// EGR.UG: restarts counter and prescaler, then raises an update event
    /// unless UDIS blocks it
    fn force_update(&mut self) {
        self.regs[word(tim::CNT)] = 0;
        self.divider = 0;

        let cr1 = self.cr1();
        if !cr1.contains(Cr1::UDIS) {
            self.latch();
            if !cr1.contains(Cr1::URS) {
                self.regs[word(tim::SR)] |= Sr::UIF.bits();
            }
        }
    }

    /// Counts `cycles` timer clock cycles
    fn run(&mut self, mut cycles: u64) {
        if !self.cr1().contains(Cr1::CEN) || self.arr == 0 {
            return;
        }

        loop {
            let tick = u64::from(self.psc) + 1;
            let cnt = self.reg(tim::CNT);
            // A counter already past ARR runs on to the register limit
            let top = if cnt > self.arr {
                self.info.counter_max
            } else {
                self.arr
            };
            let to_wrap = (u64::from(top - cnt) + 1) * tick - u64::from(self.divider);

            if cycles < to_wrap {
                let elapsed = u64::from(self.divider) + cycles;
                let next = cnt + (elapsed / tick) as u32;
                self.divider = (elapsed % tick) as u32;
                if next > cnt {
                    self.compare_matches(cnt + 1, next);
                }
                self.regs[word(tim::CNT)] = next;
                return;
            }

            cycles -= to_wrap;
            if top > cnt {
                self.compare_matches(cnt + 1, top);
            }
            self.regs[word(tim::CNT)] = 0;
            self.divider = 0;
            if !self.cr1().contains(Cr1::UDIS) {
                self.latch();
                self.regs[word(tim::SR)] |= Sr::UIF.bits();
            }
            self.compare_matches(0, 0);

            if self.arr == 0 {
                return;
            }
        }
    }

    /// Applies the match-driven modes for a counter that went through
    /// `first..=last`
    fn compare_matches(&mut self, first: u32, last: u32) {
        for channel in Channel::ALL {
            let i = channel.index();
            if self.ccr[i] < first || self.ccr[i] > last {
                continue;
            }
            match self.ccmr(channel).output_compare(channel.ccmr_slot()) {
                OutputCompareMode::ActiveOnMatch => self.oc_ref[i] = true,
                OutputCompareMode::InactiveOnMatch => self.oc_ref[i] = false,
                OutputCompareMode::Toggle => self.oc_ref[i] = !self.oc_ref[i],
                _ => {}
            }
        }
    }

    fn oc_ref(&self, channel: Channel) -> bool {
        let i = channel.index();
        let cnt = self.reg(tim::CNT);
        match self.ccmr(channel).output_compare(channel.ccmr_slot()) {
            OutputCompareMode::ForceInactive => false,
            OutputCompareMode::ForceActive => true,
            OutputCompareMode::PwmMode1 => cnt < self.ccr[i],
            OutputCompareMode::PwmMode2 => cnt >= self.ccr[i],
            _ => self.oc_ref[i],
        }
    }
}

/// Simulated STM32F072 register space
pub struct SimDevice {
    rcc: [u32; RCC_WORDS],
    ports: [GpioState; 6],
    timers: [TimerState; 7],
    journal: Bounded<Record, JOURNAL_CAPACITY>,
    violations: Bounded<Violation, VIOLATION_CAPACITY>,
    elapsed: u64,
}

impl Default for SimDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDevice {
    /// A device straight out of reset
    pub fn new() -> Self {
        let mut rcc_regs = [0; RCC_WORDS];
        rcc_regs[word(rcc::CR)] = RCC_CR_RESET;
        rcc_regs[word(rcc::AHBENR)] = rcc::AHBENR_RESET;

        SimDevice {
            rcc: rcc_regs,
            ports: Port::ALL.map(GpioState::reset),
            timers: TimerId::ALL.map(TimerState::reset),
            journal: Bounded::new(Record {
                access: Access::Read,
                addr: 0,
                value: 0,
            }),
            violations: Bounded::new(Violation::Unmapped { addr: 0 }),
            elapsed: 0,
        }
    }

    fn decode(addr: u32) -> Option<Target> {
        if addr % 4 != 0 {
            return None;
        }

        let offset = addr.wrapping_sub(map::RCC_BASE);
        if offset < map::BLOCK_SIZE {
            return Some(Target::Rcc(word(offset))).filter(|_| word(offset) < RCC_WORDS);
        }
        if let Some(port) = Port::from_address(addr) {
            let offset = addr - port.base();
            return Some(Target::Gpio(port, offset)).filter(|_| word(offset) < GPIO_WORDS);
        }
        if let Some(timer) = TimerId::from_address(addr) {
            let offset = addr - timer.base();
            return Some(Target::Timer(timer, offset)).filter(|_| word(offset) < TIM_WORDS);
        }
        None
    }

    fn is_clocked(&self, target: Target) -> bool {
        let ahbenr = self.rcc[word(rcc::AHBENR)];
        let apb1enr = self.rcc[word(rcc::APB1ENR)];
        let apb2enr = self.rcc[word(rcc::APB2ENR)];

        match target {
            Target::Rcc(_) => true,
            Target::Gpio(port, _) => ahbenr & port.enable_bit().bits() != 0,
            Target::Timer(timer, _) => match timer.info().clock {
                device::ClockBus::Apb1(bit) => apb1enr & bit.bits() != 0,
                device::ClockBus::Apb2(bit) => apb2enr & bit.bits() != 0,
            },
        }
    }

    fn timer_clocked(&self, timer: TimerId) -> bool {
        self.is_clocked(Target::Timer(timer, 0))
    }

    fn load(&self, target: Target) -> u32 {
        match target {
            Target::Rcc(w) => self.rcc[w],
            Target::Gpio(port, offset) => match offset {
                gpio::BSRR | gpio::BRR => 0,
                _ => self.ports[port.index()].reg(offset),
            },
            Target::Timer(timer, offset) => self.timers[timer.index()].load(offset),
        }
    }

    fn store(&mut self, target: Target, value: u32) {
        match target {
            Target::Rcc(w) => self.rcc[w] = value,
            Target::Gpio(port, offset) => self.ports[port.index()].store(offset, value),
            Target::Timer(timer, offset) => self.timers[timer.index()].store(offset, value),
        }
    }

    /// Reads a register without clock checks, side effects or journaling
    pub fn read_raw(&self, addr: u32) -> u32 {
        Self::decode(addr).map_or(0, |target| self.load(target))
    }

    /// Overwrites a register's stored value, bypassing every side effect
    ///
    /// Meant for setting up the state other code would have left behind.
    pub fn write_raw(&mut self, addr: u32, value: u32) {
        match Self::decode(addr) {
            Some(Target::Rcc(w)) => self.rcc[w] = value,
            Some(Target::Gpio(port, offset)) => self.ports[port.index()].regs[word(offset)] = value,
            Some(Target::Timer(timer, offset)) => {
                self.timers[timer.index()].regs[word(offset)] = value
            }
            None => {}
        }
    }

    /// Bus accesses in the order they happened
    pub fn journal(&self) -> &[Record] {
        self.journal.as_slice()
    }

    /// Accesses that did not fit the journal any more
    pub fn dropped_records(&self) -> usize {
        self.journal.dropped
    }

    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    /// Accesses the hardware would have ignored
    pub fn violations(&self) -> &[Violation] {
        self.violations.as_slice()
    }

    /// Lets `cycles` timer clock cycles pass
    ///
    /// All timers share one clock, see [`crate::rcc::Clocks::timclk`].
    pub fn advance(&mut self, cycles: u64) {
        for timer in TimerId::ALL {
            if self.timer_clocked(timer) {
                self.timers[timer.index()].run(cycles);
            }
        }
        self.elapsed += cycles;
    }

    /// Timer clock cycles passed since reset
    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    /// Prescaler the counter of `timer` currently runs with
    pub fn active_prescaler(&self, timer: TimerId) -> u32 {
        self.timers[timer.index()].psc
    }

    /// Auto-reload value the counter of `timer` currently wraps at
    pub fn active_auto_reload(&self, timer: TimerId) -> u32 {
        self.timers[timer.index()].arr
    }

    /// Compare value `channel` of `timer` currently matches against
    pub fn active_compare(&self, timer: TimerId, channel: Channel) -> u32 {
        self.timers[timer.index()].ccr[channel.index()]
    }

    /// Level of the OCx output of a timer channel, `None` while the output
    /// is not driven
    pub fn output_level(&self, timer: TimerId, channel: Channel) -> Option<bool> {
        let state = &self.timers[timer.index()];
        if !self.timer_clocked(timer) || channel.number() > state.info.channels {
            return None;
        }

        let slot = channel.ccmr_slot();
        if state.ccmr(channel).selection(slot) != CaptureSelection::Output {
            return None;
        }

        let ccer = Ccer(state.reg(tim::CCER));
        if !ccer.enabled(channel.index()) {
            return None;
        }

        let moe = Bdtr::from_bits_retain(state.reg(tim::BDTR)).contains(Bdtr::MOE);
        if state.info.has_break && !moe {
            return None;
        }

        let inverted = ccer.polarity(channel.index()) == Polarity::ActiveLow;
        Some(state.oc_ref(channel) != inverted)
    }

    /// Level driven onto `port`/`pin`, `None` for inputs and undriven pins
    pub fn pin_level(&self, port: Port, pin: u8) -> Option<bool> {
        if pin > 15 {
            return None;
        }

        let regs = &self.ports[port.index()];
        match Moder(regs.reg(gpio::MODER)).mode(pin) {
            PinMode::Output => Some(regs.reg(gpio::ODR) & (1 << pin) != 0),
            PinMode::Alternate => {
                let afr = if pin < 8 { gpio::AFRL } else { gpio::AFRH };
                let af = Afr(regs.reg(afr)).af(pin);
                device::outputs_on(port, pin, af)
                    .find_map(|output| self.output_level(output.timer, output.channel))
            }
            PinMode::Input | PinMode::Analog => None,
        }
    }
}

impl Bus for SimDevice {
    fn read(&mut self, addr: u32) -> u32 {
        let value = match Self::decode(addr) {
            Some(target) if self.is_clocked(target) => self.load(target),
            Some(_) => {
                self.violations.push(Violation::Unclocked { addr });
                0
            }
            None => {
                self.violations.push(Violation::Unmapped { addr });
                0
            }
        };

        self.journal.push(Record {
            access: Access::Read,
            addr,
            value,
        });
        value
    }

    fn write(&mut self, addr: u32, value: u32) {
        match Self::decode(addr) {
            Some(target) if self.is_clocked(target) => self.store(target, value),
            Some(_) => self.violations.push(Violation::Unclocked { addr }),
            None => self.violations.push(Violation::Unmapped { addr }),
        }

        self.journal.push(Record {
            access: Access::Write,
            addr,
            value,
        });
    }
}
