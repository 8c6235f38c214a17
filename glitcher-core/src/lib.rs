#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! # Glitcher Core
//!
//! Power-rail fault injection core for small microcontroller targets.
//! Batched GPIO configuration, 125 ns resolution timing, the reset/glitch sequencer and
//! the serial command console, all behind hardware traits.

pub mod types;
pub mod hal;
pub mod tick;
pub mod params;
pub mod gpio;
pub mod sequencer;
pub mod console;


pub use types::*;
pub use hal::*;
pub use tick::*;
pub use params::*;
pub use gpio::*;
pub use sequencer::*;
pub use console::*;

/// Glitcher library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Power-on timing parameters: 500 ns glitch, 3 ms time to glitch, 100 ms reset
pub fn default_config() -> TimingConfig {
    TimingConfig::DEFAULT
}
