//! Serial command console
//!
//! Single-character commands, some followed by a decimal argument terminated by any
//! non-digit byte. Everything the host types is echoed back.

use core::fmt::Write as _;

use heapless::String;

use crate::hal::{SerialTransport, TickSource};
use crate::params::TimingParameters;
use crate::sequencer::GlitchControl;
use crate::types::{ticks_to_micros, Parameter};

pub const PROMPT: &str = "command (h for help): ";
pub const UNEXPECTED: &str = "Something unexpected happened.\n\r";
pub const RESET_NOTICE: &str = "Reseting target\n\r";
pub const GLITCH_NOTICE: &str = "glitching target\n\r";

pub const COMMAND_LIST: &str = "\n\r\
generic\n\r \
h    print this\n\r \
r    reset target\n\r \
g    glitch target(includes reset)\n\r\
\n\r\
config\n\r \
w    glitch pulse width (format: command%d, 125ns steps, default 4/500ns)\n\r \
l    reset pulse width (format: command%d, 125ns steps, default 800000/100ms)\n\r \
d    time between reset and glitch (format: command%d, 125ns steps, default 24000/3ms)\n\r\
\n\r";

/// Room for the longest "setting ..." line
const LINE_CAPACITY: usize = 64;

/// Console commands
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Help,
    Reset,
    Glitch,
    Configure(Parameter),
}

impl Command {
    pub fn from_byte(byte: u8) -> Option<Command> {
        match byte {
            b'h' => Some(Command::Help),
            b'r' => Some(Command::Reset),
            b'g' => Some(Command::Glitch),
            b'w' => Some(Command::Configure(Parameter::GlitchWidth)),
            b'l' => Some(Command::Configure(Parameter::ResetWidth)),
            b'd' => Some(Command::Configure(Parameter::TimeToGlitch)),
            _ => None,
        }
    }
}

fn label(parameter: Parameter) -> &'static str {
    match parameter {
        Parameter::GlitchWidth => "glitch pulse width",
        Parameter::ResetWidth => "rest pulse width",
        Parameter::TimeToGlitch => "time to glitch",
    }
}

/// Numeric argument failures
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArgumentError {
    /// No terminator arrived in time
    Timeout,
    /// Value does not fit in 32 bits
    Overflow,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConsoleError {
    UnknownCommand(u8),
    Argument(ArgumentError),
}

impl From<ArgumentError> for ConsoleError {
    fn from(err: ArgumentError) -> Self {
        ConsoleError::Argument(err)
    }
}

#[cfg(feature = "std")]
impl core::fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ArgumentError::Timeout => write!(f, "argument timed out"),
            ArgumentError::Overflow => write!(f, "argument out of range"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ArgumentError {}

#[cfg(feature = "std")]
impl core::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConsoleError::UnknownCommand(byte) => write!(f, "unknown command 0x{:02x}", byte),
            ConsoleError::Argument(err) => write!(f, "bad argument: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConsoleError {}

/// Accumulates decimal digits until the first non-digit byte
#[derive(Default, Debug)]
pub struct DecimalParser {
    value: u32,
    overflowed: bool,
}

impl DecimalParser {
    pub const fn new() -> Self {
        Self {
            value: 0,
            overflowed: false,
        }
    }

    /// Feed one byte. Returns the outcome once a terminator is seen; the terminator is
    /// consumed. Digits past an overflow are still swallowed up to the terminator.
    pub fn push(&mut self, byte: u8) -> Option<Result<u32, ArgumentError>> {
        if !byte.is_ascii_digit() {
            return Some(if self.overflowed {
                Err(ArgumentError::Overflow)
            } else {
                Ok(self.value)
            });
        }

        let digit = (byte - b'0') as u32;
        match self.value.checked_mul(10).and_then(|v| v.checked_add(digit)) {
            Some(value) => self.value = value,
            None => self.overflowed = true,
        }
        None
    }
}

/// Read a decimal argument, echoing every byte received.
///
/// Gives up `timeout_ms` after the call started, however much input arrived meanwhile.
/// Keeps the transport serviced while waiting.
pub fn read_argument<T, K>(transport: &mut T, clock: &K, timeout_ms: u32) -> Result<u32, ArgumentError>
where
    T: SerialTransport,
    K: TickSource,
{
    let deadline = clock.deadline_after_ms(timeout_ms as u64);
    let mut parser = DecimalParser::new();

    loop {
        if clock.has_passed(deadline) {
            return Err(ArgumentError::Timeout);
        }

        transport.flush();
        transport.poll();

        if let Some(byte) = transport.read_byte() {
            transport.write(&[byte]);
            if let Some(outcome) = parser.push(byte) {
                return outcome;
            }
        }
    }
}

/// Identity and limits of the console
#[derive(Copy, Clone, Debug)]
pub struct ConsoleConfig {
    /// Shown in the banner
    pub name: &'static str,
    pub version: &'static str,
    pub argument_timeout_ms: u32,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            name: "stm32-glitcher",
            version: crate::VERSION,
            argument_timeout_ms: 5000,
        }
    }
}

/// Cooperative command console, polled from the main loop
pub struct CommandConsole<'a, G, K> {
    sequencer: G,
    clock: K,
    params: &'a TimingParameters,
    config: ConsoleConfig,
    greeted: bool,
}

impl<'a, G, K> CommandConsole<'a, G, K>
where
    G: GlitchControl,
    K: TickSource,
{
    pub fn new(sequencer: G, clock: K, params: &'a TimingParameters, config: ConsoleConfig) -> Self {
        Self {
            sequencer,
            clock,
            params,
            config,
            greeted: false,
        }
    }

    pub fn sequencer(&self) -> &G {
        &self.sequencer
    }

    /// Run one console step.
    ///
    /// Returns the outcome of the command handled in this step, if a byte was waiting.
    pub fn poll<T: SerialTransport>(
        &mut self,
        transport: &mut T,
    ) -> Option<Result<Command, ConsoleError>> {
        if !transport.is_connected() {
            self.greeted = false;
            return None;
        }

        if !self.greeted {
            self.write_banner(transport);
            transport.write(PROMPT.as_bytes());
            self.greeted = true;
        }

        let outcome = transport
            .read_byte()
            .map(|byte| self.handle_byte(byte, transport));

        transport.flush();
        outcome
    }

    fn handle_byte<T: SerialTransport>(&mut self, byte: u8, transport: &mut T) -> Result<Command, ConsoleError> {
        transport.write(&[byte, b'\n', b'\r']);

        let outcome = match Command::from_byte(byte) {
            Some(command) => self.execute(command, transport).map(|()| command),
            None => Err(ConsoleError::UnknownCommand(byte)),
        };

        if let Err(_err) = outcome {
            #[cfg(feature = "defmt")]
            defmt::debug!("console: {}", _err);
            transport.write(UNEXPECTED.as_bytes());
        }
        transport.write(PROMPT.as_bytes());
        outcome
    }

    fn execute<T: SerialTransport>(&mut self, command: Command, transport: &mut T) -> Result<(), ConsoleError> {
        match command {
            Command::Help => {
                self.write_banner(transport);
                transport.write(COMMAND_LIST.as_bytes());
            }
            Command::Reset => {
                transport.write(RESET_NOTICE.as_bytes());
                self.sequencer.reset_target();
            }
            Command::Glitch => {
                transport.write(GLITCH_NOTICE.as_bytes());
                self.sequencer.glitch_target();
            }
            Command::Configure(parameter) => {
                let ticks = read_argument(transport, &self.clock, self.config.argument_timeout_ms)?;

                let (micros, nanos) = ticks_to_micros(ticks);
                let mut line: String<LINE_CAPACITY> = String::new();
                // Fits: the longest label plus a 10-digit value is well under the capacity
                write!(line, "\n\rsetting {} to {}.{:03}us\n\r", label(parameter), micros, nanos).ok();
                transport.write(line.as_bytes());

                self.params.set(parameter, ticks);
            }
        }
        Ok(())
    }

    fn write_banner<T: SerialTransport>(&self, transport: &mut T) {
        transport.write(self.config.name.as_bytes());
        transport.write(b" v:");
        transport.write(self.config.version.as_bytes());
        transport.write(b"\n\r");
    }
}
