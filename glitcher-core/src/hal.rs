//! Hardware Abstraction Layer for the glitcher
//!
//! Every piece of hardware the core touches sits behind one of these traits, so the same
//! sequencing and configuration code drives real registers on the board and plain memory in
//! tests.

use crate::tick::TICKS_PER_MS;
use crate::types::{Level, Pin, PortId};

/// Peripherals that take part in the one-shot GPIO programming sequence
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Peripheral {
    Port(PortId),
    /// Alternate-function / remap controller
    AlternateFunction,
}

/// Register set of one GPIO port
pub trait PortRegisters {
    /// Input data register
    fn read_input(&self) -> u32;

    /// Output data register
    fn read_output(&self) -> u32;

    fn write_output(&mut self, value: u32);

    /// Control register for pins 0..8
    fn write_control_low(&mut self, value: u32);

    /// Control register for pins 8..16
    fn write_control_high(&mut self, value: u32);
}

/// Resolves port identifiers to their register sets and provides pin-level access on top.
///
/// The pin operations perform exactly one read-modify-write (or one read) of the owning
/// port's data register and only ever touch the addressed bit.
pub trait GpioBank {
    type Port: PortRegisters;

    fn port(&mut self, id: PortId) -> &mut Self::Port;

    /// Drive a pin to the given level
    fn set(&mut self, pin: Pin, level: Level) {
        let port = self.port(pin.port());
        let odr = port.read_output();
        let odr = match level {
            Level::High => odr | pin.mask(),
            Level::Low => odr & !pin.mask(),
        };
        port.write_output(odr);
    }

    /// Invert a pin's output level
    fn toggle(&mut self, pin: Pin) {
        let port = self.port(pin.port());
        let odr = port.read_output();
        port.write_output(odr ^ pin.mask());
    }

    /// Sample a pin's input level
    fn get(&mut self, pin: Pin) -> Level {
        let port = self.port(pin.port());
        Level::from(port.read_input() & pin.mask() != 0)
    }

    /// Level currently latched in the output data register
    fn output_level(&mut self, pin: Pin) -> Level {
        let port = self.port(pin.port());
        Level::from(port.read_output() & pin.mask() != 0)
    }
}

impl<B: GpioBank + ?Sized> GpioBank for &mut B {
    type Port = B::Port;

    fn port(&mut self, id: PortId) -> &mut B::Port {
        (**self).port(id)
    }
}

/// Reset, clock gating and remap control used while programming the GPIO block
pub trait SystemControl {
    fn assert_reset(&mut self, peripheral: Peripheral);

    fn release_reset(&mut self, peripheral: Peripheral);

    fn enable_clock(&mut self, peripheral: Peripheral);

    /// Release the JTAG-only pins for GPIO use, keeping serial-wire debug
    fn disable_jtag(&mut self);
}

/// Monotonic time base in 125 ns tick units
pub trait TickSource {
    fn now(&self) -> u64;

    /// Tick value `ms` milliseconds from now
    fn deadline_after_ms(&self, ms: u64) -> u64 {
        self.now() + ms * TICKS_PER_MS
    }

    /// True once the counter has moved past `deadline`
    fn has_passed(&self, deadline: u64) -> bool {
        self.now() > deadline
    }
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

/// Busy-wait with tick-unit resolution.
///
/// Implementations block the caller for exactly `ticks` units of the fine hardware timer and
/// must not depend on interrupts, since they run inside critical sections.
pub trait FineDelay {
    fn delay_ticks(&mut self, ticks: u32);
}

/// Connection-oriented byte stream the console talks over
pub trait SerialTransport {
    /// Service the underlying stack. Must be called regularly, including while the
    /// caller is blocked waiting for input.
    fn poll(&mut self);

    /// True while a host has the stream open
    fn is_connected(&self) -> bool;

    /// Take one received byte, if any. Never blocks.
    fn read_byte(&mut self) -> Option<u8>;

    /// Queue bytes for transmission
    fn write(&mut self, bytes: &[u8]);

    /// Push queued bytes out to the host
    fn flush(&mut self);
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Simulated hardware for host tests

    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::string::String;
    use std::vec::Vec;

    /// Shared virtual time base, in tick units
    #[derive(Clone, Debug, Default)]
    pub struct SimClock {
        now: Rc<Cell<u64>>,
    }

    impl SimClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn advance(&self, ticks: u64) {
            self.now.set(self.now.get() + ticks);
        }

        pub fn advance_ms(&self, ms: u64) {
            self.advance(ms * TICKS_PER_MS);
        }
    }

    impl TickSource for SimClock {
        fn now(&self) -> u64 {
            self.now.get()
        }
    }

    /// Hardware activity recorded by the mocks
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub enum HwEvent {
        AssertReset(Peripheral),
        ReleaseReset(Peripheral),
        EnableClock(Peripheral),
        JtagDisabled,
        ControlLow(PortId, u32),
        ControlHigh(PortId, u32),
        Output(PortId, u32),
        Delay(u32),
    }

    /// Time-stamped log shared by all mocks built from it
    #[derive(Clone, Debug, Default)]
    pub struct Journal {
        clock: SimClock,
        events: Rc<RefCell<Vec<(u64, HwEvent)>>>,
    }

    impl Journal {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn clock(&self) -> SimClock {
            self.clock.clone()
        }

        pub fn record(&self, event: HwEvent) {
            self.events.borrow_mut().push((self.clock.now(), event));
        }

        pub fn events(&self) -> Vec<HwEvent> {
            self.events.borrow().iter().map(|(_, event)| *event).collect()
        }

        pub fn clear(&self) {
            self.events.borrow_mut().clear();
        }

        /// Level changes of `pin` as `(time, new level)`, starting from `initial`
        pub fn transitions(&self, pin: Pin, initial: Level) -> Vec<(u64, Level)> {
            let mut level = initial;
            let mut out = Vec::new();
            for (at, event) in self.events.borrow().iter() {
                if let HwEvent::Output(port, value) = event {
                    if *port != pin.port() {
                        continue;
                    }
                    let next = Level::from(value & pin.mask() != 0);
                    if next != level {
                        out.push((*at, next));
                        level = next;
                    }
                }
            }
            out
        }
    }

    /// Plain-memory register set of one port. The input register mirrors the output
    /// register unless an external level is forced.
    #[derive(Debug)]
    pub struct MockPort {
        id: PortId,
        journal: Journal,
        pub control_low: u32,
        pub control_high: u32,
        pub output: u32,
        pub forced_input: Option<u32>,
    }

    impl MockPort {
        fn new(id: PortId, journal: Journal) -> Self {
            Self {
                id,
                journal,
                control_low: 0,
                control_high: 0,
                output: 0,
                forced_input: None,
            }
        }
    }

    impl PortRegisters for MockPort {
        fn read_input(&self) -> u32 {
            self.forced_input.unwrap_or(self.output)
        }

        fn read_output(&self) -> u32 {
            self.output
        }

        fn write_output(&mut self, value: u32) {
            self.output = value;
            self.journal.record(HwEvent::Output(self.id, value));
        }

        fn write_control_low(&mut self, value: u32) {
            self.control_low = value;
            self.journal.record(HwEvent::ControlLow(self.id, value));
        }

        fn write_control_high(&mut self, value: u32) {
            self.control_high = value;
            self.journal.record(HwEvent::ControlHigh(self.id, value));
        }
    }

    /// Four simulated ports
    #[derive(Debug)]
    pub struct MockGpio {
        ports: [MockPort; 4],
    }

    impl MockGpio {
        pub fn new(journal: &Journal) -> Self {
            Self {
                ports: PortId::ALL.map(|id| MockPort::new(id, journal.clone())),
            }
        }

        pub fn port_state(&self, id: PortId) -> &MockPort {
            &self.ports[id.index()]
        }
    }

    impl Default for MockGpio {
        fn default() -> Self {
            Self::new(&Journal::new())
        }
    }

    impl GpioBank for MockGpio {
        type Port = MockPort;

        fn port(&mut self, id: PortId) -> &mut MockPort {
            &mut self.ports[id.index()]
        }
    }

    /// Records reset/clock/remap requests
    #[derive(Debug, Default)]
    pub struct MockSystem {
        journal: Journal,
    }

    impl MockSystem {
        pub fn new(journal: &Journal) -> Self {
            Self {
                journal: journal.clone(),
            }
        }
    }

    impl SystemControl for MockSystem {
        fn assert_reset(&mut self, peripheral: Peripheral) {
            self.journal.record(HwEvent::AssertReset(peripheral));
        }

        fn release_reset(&mut self, peripheral: Peripheral) {
            self.journal.record(HwEvent::ReleaseReset(peripheral));
        }

        fn enable_clock(&mut self, peripheral: Peripheral) {
            self.journal.record(HwEvent::EnableClock(peripheral));
        }

        fn disable_jtag(&mut self) {
            self.journal.record(HwEvent::JtagDisabled);
        }
    }

    /// Delay that advances the journal's clock instead of spinning
    #[derive(Debug, Default)]
    pub struct SimDelay {
        journal: Journal,
    }

    impl SimDelay {
        pub fn new(journal: &Journal) -> Self {
            Self {
                journal: journal.clone(),
            }
        }
    }

    impl FineDelay for SimDelay {
        fn delay_ticks(&mut self, ticks: u32) {
            self.journal.record(HwEvent::Delay(ticks));
            self.journal.clock.advance(ticks as u64);
        }
    }

    /// Scripted byte stream. Each `poll` moves the attached clock forward so that
    /// timeouts elapse without real waiting.
    #[derive(Debug)]
    pub struct MockTransport {
        rx: VecDeque<u8>,
        tx: Vec<u8>,
        connected: bool,
        clock: Option<SimClock>,
        poll_step_ms: u64,
        pub polls: usize,
        pub flushes: usize,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                rx: VecDeque::new(),
                tx: Vec::new(),
                connected: true,
                clock: None,
                poll_step_ms: 1,
                polls: 0,
                flushes: 0,
            }
        }

        pub fn with_clock(clock: SimClock) -> Self {
            Self {
                clock: Some(clock),
                ..Self::new()
            }
        }

        pub fn set_connected(&mut self, connected: bool) {
            self.connected = connected;
        }

        pub fn push_input(&mut self, bytes: &[u8]) {
            self.rx.extend(bytes.iter().copied());
        }

        pub fn pending_input(&self) -> usize {
            self.rx.len()
        }

        pub fn output(&self) -> String {
            String::from_utf8_lossy(&self.tx).into_owned()
        }

        pub fn take_output(&mut self) -> String {
            let out = self.output();
            self.tx.clear();
            out
        }
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl SerialTransport for MockTransport {
        fn poll(&mut self) {
            self.polls += 1;
            if let Some(clock) = &self.clock {
                clock.advance_ms(self.poll_step_ms);
            }
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn read_byte(&mut self) -> Option<u8> {
            self.rx.pop_front()
        }

        fn write(&mut self, bytes: &[u8]) {
            self.tx.extend_from_slice(bytes);
        }

        fn flush(&mut self) {
            self.flushes += 1;
        }
    }
}
