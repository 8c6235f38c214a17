//! Glitch sequencer: timed power-cycle and glitch pulse generation

use core::marker::PhantomData;

use crate::hal::{FineDelay, GpioBank};
use crate::params::TimingParameters;
use crate::types::{Level, Pin, SequencerState, TimingConfig};

/// Interrupts stay disabled for as long as this guard lives.
///
/// Guards nest; each one restores the state it found on drop, so they must be
/// dropped in reverse order of acquisition (which scoping guarantees).
pub struct InterruptGuard {
    restore: critical_section::RestoreState,
    // Must be released on the context that acquired it
    _not_send: PhantomData<*mut ()>,
}

impl InterruptGuard {
    pub fn acquire() -> Self {
        // SAFETY: released exactly once, in Drop, in LIFO order with any nested guard.
        let restore = unsafe { critical_section::acquire() };
        Self {
            restore,
            _not_send: PhantomData,
        }
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        // SAFETY: `restore` came from the matching `acquire` above.
        unsafe { critical_section::release(self.restore) };
    }
}

/// The two outputs wired to the target's supply
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct GlitchRails {
    /// Powers the target when high
    pub power: Pin,
    /// Pulls the target's supply down when high
    pub glitch: Pin,
}

/// Operations the console can trigger on the target
pub trait GlitchControl {
    /// Power-cycle the target with a timed discharge phase
    fn reset_target(&mut self);

    /// Power-cycle the target, then fire one glitch pulse `time_to_glitch` later
    fn glitch_target(&mut self);
}

/// Drives the rails through the reset and glitch sequences.
///
/// A whole sequence runs inside one [`InterruptGuard`] and cannot be interrupted or
/// cancelled once started.
pub struct GlitchSequencer<'a, B, D> {
    gpio: B,
    delay: D,
    params: &'a TimingParameters,
    rails: GlitchRails,
    state: SequencerState,
}

impl<'a, B, D> GlitchSequencer<'a, B, D>
where
    B: GpioBank,
    D: FineDelay,
{
    pub fn new(gpio: B, delay: D, params: &'a TimingParameters, rails: GlitchRails) -> Self {
        Self {
            gpio,
            delay,
            params,
            rails,
            state: SequencerState::Idle,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn gpio(&self) -> &B {
        &self.gpio
    }

    /// Idle -> Discharging -> Powered, with interrupts off throughout
    fn power_cycle(&mut self, timing: &TimingConfig) {
        let _guard = InterruptGuard::acquire();

        self.state = SequencerState::Discharging;
        self.gpio.set(self.rails.power, Level::Low);
        // Glitch rail helps drain residual charge on the target's supply
        self.gpio.set(self.rails.glitch, Level::High);
        self.delay.delay_ticks(timing.reset_width);

        self.state = SequencerState::Powered;
        self.gpio.set(self.rails.glitch, Level::Low);
        self.gpio.set(self.rails.power, Level::High);
    }
}

impl<'a, B, D> GlitchControl for GlitchSequencer<'a, B, D>
where
    B: GpioBank,
    D: FineDelay,
{
    fn reset_target(&mut self) {
        let timing = self.params.snapshot();

        #[cfg(feature = "defmt")]
        defmt::debug!("reset: {} ticks", timing.reset_width);

        self.power_cycle(&timing);
        self.state = SequencerState::Idle;
    }

    fn glitch_target(&mut self) {
        let timing = self.params.snapshot();

        #[cfg(feature = "defmt")]
        defmt::debug!("glitch: {}", timing);

        {
            let _guard = InterruptGuard::acquire();
            // Nested guard inside; the pulse must follow power-up with nothing in between
            self.power_cycle(&timing);

            self.delay.delay_ticks(timing.time_to_glitch);
            self.state = SequencerState::Glitching;
            // No delay for glitch_width here: the call overhead of a busy-wait is longer
            // than the pulses worth asking for, so back-to-back writes give the shortest
            // pulse the hardware can produce (a few hundred ns).
            self.gpio.set(self.rails.glitch, Level::High);
            self.gpio.set(self.rails.glitch, Level::Low);
        }
        self.state = SequencerState::Idle;
    }
}
