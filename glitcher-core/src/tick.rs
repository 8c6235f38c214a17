//! Tick counter driven by the periodic timer interrupt

use portable_atomic::{AtomicU64, Ordering};

use crate::hal::TickSource;

/// Length of one tick unit
pub const TICK_NANOS: u64 = 125;

/// Tick units in one millisecond
pub const TICKS_PER_MS: u64 = 1_000_000 / TICK_NANOS;

/// Core clock cycles a busy-wait of `ticks` units must burn
pub const fn delay_cycles(ticks: u32, cycles_per_tick: u32) -> u64 {
    ticks as u64 * cycles_per_tick as u64
}

/// Cycles between two samples of a down-counter that reloads every `period` cycles.
///
/// At most one reload may fall between the samples.
pub const fn countdown_elapsed(last: u32, now: u32, period: u32) -> u32 {
    if now <= last {
        last - now
    } else {
        last + period - now
    }
}

/// Monotonic count of tick units since boot.
///
/// Written only from the timer interrupt, read from anywhere. Stalls while a
/// critical section holds interrupts off.
pub struct TickCounter {
    ticks: AtomicU64,
}

impl TickCounter {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
        }
    }

    /// Account for one elapsed timer period of `ticks_per_period` units
    /// (called from the timer interrupt handler)
    pub fn advance(&self, ticks_per_period: u64) {
        self.ticks.fetch_add(ticks_per_period, Ordering::Relaxed);
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for TickCounter {
    fn now(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}
