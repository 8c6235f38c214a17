//! Core data types for the glitcher

/// Number of pins in one port
pub const PINS_PER_PORT: usize = 16;

/// Number of ports handled by the configuration set (A..D)
pub const PORT_COUNT: usize = 4;

/// GPIO port identification
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortId {
    A,
    B,
    C,
    D,
}

impl PortId {
    /// All ports in hardware programming order
    pub const ALL: [PortId; PORT_COUNT] = [PortId::A, PortId::B, PortId::C, PortId::D];

    /// Resolve a port from its selector, keeping only the two valid bits
    pub const fn from_selector(selector: u8) -> PortId {
        match selector & 0b11 {
            0 => PortId::A,
            1 => PortId::B,
            2 => PortId::C,
            _ => PortId::D,
        }
    }

    /// Zero-based index of this port
    pub const fn index(&self) -> usize {
        match self {
            PortId::A => 0,
            PortId::B => 1,
            PortId::C => 2,
            PortId::D => 3,
        }
    }
}

/// Physical pin coordinate. Carries no ownership of the line it names.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pin {
    port: PortId,
    index: u8,
}

impl Pin {
    /// Create a pin coordinate. `index` must be in 0..16.
    pub const fn new(port: PortId, index: u8) -> Self {
        Self { port, index }
    }

    pub const fn port(&self) -> PortId {
        self.port
    }

    pub const fn index(&self) -> u8 {
        self.index
    }

    /// Single-bit mask of this pin inside its port's data registers
    pub const fn mask(&self) -> u32 {
        1 << self.index
    }
}

/// Digital line level
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub const fn is_high(&self) -> bool {
        matches!(self, Level::High)
    }

    /// Returns the opposite level
    pub const fn inverted(&self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> Self {
        level.is_high()
    }
}

/// Pin mode field (bits 1:0 of a configuration nibble)
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Input = 0b00,
    Output10MHz = 0b01,
    Output2MHz = 0b10,
    Output50MHz = 0b11,
}

/// Sub-configuration of an input pin (bits 3:2)
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputConfig {
    Analog = 0b00,
    Floating = 0b01,
    /// Pull-up or pull-down, selected by the output data bit
    Pull = 0b10,
    Reserved = 0b11,
}

/// Sub-configuration of an output pin (bits 3:2)
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputConfig {
    PushPull = 0b00,
    OpenDrain = 0b01,
    AlternatePushPull = 0b10,
    AlternateOpenDrain = 0b11,
}

/// Decoded view of a configuration nibble
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinFunction {
    Input(InputConfig),
    Output(Mode, OutputConfig),
}

/// 4-bit mode + configuration value as stored in the pin-control registers
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigNibble(u8);

impl ConfigNibble {
    /// Safe power-on default: input with pull resistor
    pub const INPUT_PULL: ConfigNibble = ConfigNibble::input(InputConfig::Pull);
    pub const INPUT_FLOATING: ConfigNibble = ConfigNibble::input(InputConfig::Floating);

    /// Build from raw bits, dropping everything above bit 3
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0xF)
    }

    pub const fn input(config: InputConfig) -> Self {
        Self(((config as u8) << 2) | Mode::Input as u8)
    }

    /// Output nibble. `Mode::Input` is not an output speed and yields an output at 2 MHz.
    pub const fn output(speed: Mode, config: OutputConfig) -> Self {
        let mode = match speed {
            Mode::Input => Mode::Output2MHz,
            other => other,
        };
        Self(((config as u8) << 2) | mode as u8)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn mode(&self) -> Mode {
        match self.0 & 0b11 {
            0b00 => Mode::Input,
            0b01 => Mode::Output10MHz,
            0b10 => Mode::Output2MHz,
            _ => Mode::Output50MHz,
        }
    }

    pub const fn decode(&self) -> PinFunction {
        let cnf = (self.0 >> 2) & 0b11;
        match self.mode() {
            Mode::Input => PinFunction::Input(match cnf {
                0b00 => InputConfig::Analog,
                0b01 => InputConfig::Floating,
                0b10 => InputConfig::Pull,
                _ => InputConfig::Reserved,
            }),
            speed => PinFunction::Output(
                speed,
                match cnf {
                    0b00 => OutputConfig::PushPull,
                    0b01 => OutputConfig::OpenDrain,
                    0b10 => OutputConfig::AlternatePushPull,
                    _ => OutputConfig::AlternateOpenDrain,
                },
            ),
        }
    }
}

impl From<u8> for ConfigNibble {
    fn from(bits: u8) -> Self {
        Self::from_bits(bits)
    }
}

impl Default for ConfigNibble {
    fn default() -> Self {
        Self::INPUT_PULL
    }
}

/// Tunable sequence parameters, all counted in 125 ns tick units
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingConfig {
    /// Glitch pulse width. Stored for the host, not used to size the pulse.
    pub glitch_width: u32,
    /// Delay between the end of the reset phase and the glitch pulse
    pub time_to_glitch: u32,
    /// Length of the discharge (power off) phase
    pub reset_width: u32,
}

impl TimingConfig {
    /// Power-on values
    pub const DEFAULT: TimingConfig = TimingConfig {
        glitch_width: 4,       // 500ns
        time_to_glitch: 24000, // 3ms
        reset_width: 800_000,  // 100ms
    };
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Identifies one field of [`TimingConfig`]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parameter {
    GlitchWidth,
    ResetWidth,
    TimeToGlitch,
}

/// Glitch sequencer states
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequencerState {
    /// Rails at rest, target powered
    Idle,
    /// Power rail low, glitch rail high to drain the target's supply
    Discharging,
    /// Power restored after the reset phase
    Powered,
    /// Glitch pulse in flight
    Glitching,
}

/// Split a tick count into whole microseconds and the nanosecond remainder
pub const fn ticks_to_micros(ticks: u32) -> (u32, u32) {
    (ticks / 8, (ticks % 8) * 125)
}
