//! SysTick time base and the single-core critical section

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;
use glitcher_core::{TickCounter, TICKS_PER_MS};

use crate::stm32f103_hardware::SYSCLK_HZ;

/// System time in 125 ns units, advanced by the SysTick exception
pub static TICKS: TickCounter = TickCounter::new();

/// One SysTick period per millisecond
const SYSTICK_RELOAD: u32 = SYSCLK_HZ / 1000 - 1;

/// Start SysTick on the core clock with a 1 ms period and its exception enabled
pub fn configure_systick(mut syst: SYST) {
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(SYSTICK_RELOAD);
    syst.clear_current();
    syst.enable_interrupt();
    syst.enable_counter();
}

/// Account for one SysTick period (called from the SysTick exception)
pub fn on_systick() {
    TICKS.advance(TICKS_PER_MS);
}

// Critical section implementation for single-core Cortex-M3
critical_section::set_impl!(CortexMCriticalSection);

struct CortexMCriticalSection;

unsafe impl critical_section::Impl for CortexMCriticalSection {
    unsafe fn acquire() -> critical_section::RawRestoreState {
        let was_active = cortex_m::register::primask::read().is_active();
        cortex_m::interrupt::disable();
        was_active
    }

    unsafe fn release(was_active: critical_section::RawRestoreState) {
        if was_active {
            cortex_m::interrupt::enable();
        }
    }
}
