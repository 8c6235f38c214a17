//! Batched GPIO configuration and embedded-hal pin handles

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};

use crate::hal::{GpioBank, Peripheral, PortRegisters, SystemControl};
use crate::types::{ConfigNibble, Level, Pin, PortId, PINS_PER_PORT, PORT_COUNT};

/// Staged configuration of one port: a nibble per pin and the initial output word
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PortConfiguration {
    nibbles: [ConfigNibble; PINS_PER_PORT],
    output: u16,
}

impl PortConfiguration {
    /// Every pin input with pull, all outputs low
    pub const fn new() -> Self {
        Self {
            nibbles: [ConfigNibble::INPUT_PULL; PINS_PER_PORT],
            output: 0,
        }
    }

    pub fn nibble(&self, index: u8) -> ConfigNibble {
        self.nibbles[index as usize]
    }

    pub fn output_word(&self) -> u16 {
        self.output
    }

    /// Packed `(low, high)` control-register words; pin `n` occupies bits `4(n%8)..4(n%8)+4`
    pub fn control_words(&self) -> (u32, u32) {
        let pack = |nibbles: &[ConfigNibble]| {
            nibbles
                .iter()
                .enumerate()
                .fold(0u32, |word, (i, nibble)| word | (nibble.bits() as u32) << (i * 4))
        };
        (pack(&self.nibbles[..8]), pack(&self.nibbles[8..]))
    }
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration of ports A..D, staged in memory and written to hardware in one go.
///
/// Not `Copy`: a staged set has a single owner and [`apply`](Self::apply) consumes it.
///
/// ```compile_fail
/// use glitcher_core::GpioConfigSet;
///
/// let config = GpioConfigSet::init();
/// let first = config;
/// let second = config;
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GpioConfigSet {
    ports: [PortConfiguration; PORT_COUNT],
}

impl GpioConfigSet {
    /// Safe starting point: no output drive, no floating inputs
    pub const fn init() -> Self {
        Self {
            ports: [PortConfiguration::new(); PORT_COUNT],
        }
    }

    /// Stage `nibble` (masked to 4 bits) for `pin` along with its initial output level
    pub fn set_pin(&mut self, pin: Pin, nibble: impl Into<ConfigNibble>, initial: Level) -> &mut Self {
        let port = &mut self.ports[pin.port().index()];
        port.nibbles[pin.index() as usize] = ConfigNibble::from_bits(nibble.into().bits());
        let mask = 1u16 << pin.index();
        port.output = match initial {
            Level::High => port.output | mask,
            Level::Low => port.output & !mask,
        };
        self
    }

    pub fn port(&self, id: PortId) -> &PortConfiguration {
        &self.ports[id.index()]
    }

    pub fn nibble(&self, pin: Pin) -> ConfigNibble {
        self.port(pin.port()).nibble(pin.index())
    }

    /// Program every port, then the alternate-function controller.
    ///
    /// Replaces whatever state the ports held before. Register writes are not verified.
    pub fn apply<B, S>(self, gpio: &mut B, system: &mut S)
    where
        B: GpioBank,
        S: SystemControl,
    {
        for id in PortId::ALL {
            let staged = self.port(id);
            let peripheral = Peripheral::Port(id);
            system.assert_reset(peripheral);
            system.release_reset(peripheral);
            system.enable_clock(peripheral);

            let (low, high) = staged.control_words();
            let regs = gpio.port(id);
            regs.write_control_low(0);
            regs.write_control_high(0);
            regs.write_control_low(low);
            regs.write_control_high(high);
            regs.write_output(staged.output_word() as u32);
        }

        system.assert_reset(Peripheral::AlternateFunction);
        system.release_reset(Peripheral::AlternateFunction);
        system.enable_clock(Peripheral::AlternateFunction);
        system.disable_jtag();

        #[cfg(feature = "defmt")]
        defmt::debug!("GPIO configuration applied");
    }
}

impl Default for GpioConfigSet {
    fn default() -> Self {
        Self::init()
    }
}

/// A single line exposed through the `embedded-hal` digital traits
pub struct PinDriver<B> {
    gpio: B,
    pin: Pin,
}

impl<B: GpioBank> PinDriver<B> {
    pub fn new(gpio: B, pin: Pin) -> Self {
        Self { gpio, pin }
    }
}

impl<B> ErrorType for PinDriver<B> {
    type Error = Infallible;
}

impl<B: GpioBank> OutputPin for PinDriver<B> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.gpio.set(self.pin, Level::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.gpio.set(self.pin, Level::High);
        Ok(())
    }
}

impl<B: GpioBank> StatefulOutputPin for PinDriver<B> {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.gpio.output_level(self.pin).is_high())
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.gpio.output_level(self.pin).is_high())
    }

    fn toggle(&mut self) -> Result<(), Self::Error> {
        self.gpio.toggle(self.pin);
        Ok(())
    }
}

impl<B: GpioBank> InputPin for PinDriver<B> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.gpio.get(self.pin).is_high())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.gpio.get(self.pin).is_high())
    }
}
