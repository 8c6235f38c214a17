//! Shared timing parameters

use core::sync::atomic::{AtomicU32, Ordering};

use crate::types::{Parameter, TimingConfig};

/// Timing parameters shared between the console (writer) and the sequencer (reader).
///
/// Each field is an independent word. Readers take a [`TimingConfig`] snapshot at the
/// start of a sequence and never need the very latest store.
pub struct TimingParameters {
    glitch_width: AtomicU32,
    time_to_glitch: AtomicU32,
    reset_width: AtomicU32,
}

impl TimingParameters {
    /// Parameters holding the power-on defaults
    pub const fn new() -> Self {
        Self::with_config(TimingConfig::DEFAULT)
    }

    pub const fn with_config(config: TimingConfig) -> Self {
        Self {
            glitch_width: AtomicU32::new(config.glitch_width),
            time_to_glitch: AtomicU32::new(config.time_to_glitch),
            reset_width: AtomicU32::new(config.reset_width),
        }
    }

    fn slot(&self, parameter: Parameter) -> &AtomicU32 {
        match parameter {
            Parameter::GlitchWidth => &self.glitch_width,
            Parameter::TimeToGlitch => &self.time_to_glitch,
            Parameter::ResetWidth => &self.reset_width,
        }
    }

    pub fn get(&self, parameter: Parameter) -> u32 {
        self.slot(parameter).load(Ordering::Relaxed)
    }

    pub fn set(&self, parameter: Parameter, ticks: u32) {
        self.slot(parameter).store(ticks, Ordering::Relaxed);
    }

    /// Local copy of all three values
    pub fn snapshot(&self) -> TimingConfig {
        TimingConfig {
            glitch_width: self.get(Parameter::GlitchWidth),
            time_to_glitch: self.get(Parameter::TimeToGlitch),
            reset_width: self.get(Parameter::ResetWidth),
        }
    }

    pub fn store(&self, config: TimingConfig) {
        self.set(Parameter::GlitchWidth, config.glitch_width);
        self.set(Parameter::TimeToGlitch, config.time_to_glitch);
        self.set(Parameter::ResetWidth, config.reset_width);
    }
}

impl Default for TimingParameters {
    fn default() -> Self {
        Self::new()
    }
}
