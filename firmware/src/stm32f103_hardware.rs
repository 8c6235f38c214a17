//! STM32F103 Hardware Implementation
//!
//! 64KB Flash / 20KB RAM "Blue Pill". Raw register access, no PAC.

use cortex_m::peripheral::SYST;
use glitcher_core::{
    countdown_elapsed, delay_cycles, FineDelay, GpioBank, Peripheral, PortId, PortRegisters,
    SystemControl,
};

/// Core clock after `init_clocks`
pub const SYSCLK_HZ: u32 = 72_000_000;

/// Memory map
const FLASH_BASE: u32 = 0x4002_2000;
const RCC_BASE: u32 = 0x4002_1000;
const AFIO_BASE: u32 = 0x4001_0000;
const GPIOA_BASE: u32 = 0x4001_0800;
const GPIOB_BASE: u32 = 0x4001_0C00;
const GPIOC_BASE: u32 = 0x4001_1000;
const GPIOD_BASE: u32 = 0x4001_1400;

/// RCC register offsets
const RCC_CR: u32 = 0x00;
const RCC_CFGR: u32 = 0x04;
const RCC_APB2RSTR: u32 = 0x0C;
const RCC_APB1RSTR: u32 = 0x10;
const RCC_APB2ENR: u32 = 0x18;
const RCC_APB1ENR: u32 = 0x1C;

/// GPIO register offsets
const GPIO_CRL: u32 = 0x00; // Control Register Low
const GPIO_CRH: u32 = 0x04; // Control Register High
const GPIO_IDR: u32 = 0x08; // Input Data Register
const GPIO_ODR: u32 = 0x0C; // Output Data Register

const AFIO_MAPR: u32 = 0x04;
const FLASH_ACR: u32 = 0x00;

const CR_HSEON: u32 = 1 << 16;
const CR_HSERDY: u32 = 1 << 17;
const CR_PLLON: u32 = 1 << 24;
const CR_PLLRDY: u32 = 1 << 25;

const CFGR_SW_PLL: u32 = 0b10;
const CFGR_SWS_MASK: u32 = 0b11 << 2;
const CFGR_PPRE1_DIV2: u32 = 0b100 << 8;
const CFGR_PLLSRC_HSE: u32 = 1 << 16;
const CFGR_PLLMUL_9: u32 = 0b0111 << 18;

const ACR_LATENCY_2WS: u32 = 0b010;
const ACR_PRFTBE: u32 = 1 << 4;

/// SWJ_CFG = 010: JTAG off, SW-DP on
const MAPR_SWJ_JTAG_DISABLE: u32 = 0b010 << 24;

const APB1_USB: u32 = 1 << 23;

/// SysTick cycles per 125 ns tick unit
const CYCLES_PER_TICK: u32 = SYSCLK_HZ / 8_000_000;

#[inline(always)]
unsafe fn read_reg(addr: u32) -> u32 {
    core::ptr::read_volatile(addr as *const u32)
}

#[inline(always)]
unsafe fn write_reg(addr: u32, value: u32) {
    core::ptr::write_volatile(addr as *mut u32, value)
}

#[inline(always)]
unsafe fn modify_reg(addr: u32, f: impl FnOnce(u32) -> u32) {
    write_reg(addr, f(read_reg(addr)))
}

/// Switch SYSCLK to the PLL: 8 MHz HSE x9 = 72 MHz, APB1 at 36 MHz, USB at 48 MHz.
///
/// Must run once, before anything else touches the clock tree. Spins until the
/// oscillator and PLL report ready.
pub fn init_clocks() {
    unsafe {
        // Two wait states for 48 < SYSCLK <= 72 MHz
        write_reg(FLASH_BASE + FLASH_ACR, ACR_PRFTBE | ACR_LATENCY_2WS);

        modify_reg(RCC_BASE + RCC_CR, |cr| cr | CR_HSEON);
        while read_reg(RCC_BASE + RCC_CR) & CR_HSERDY == 0 {}

        // USBPRE left clear: PLL / 1.5
        write_reg(
            RCC_BASE + RCC_CFGR,
            CFGR_PLLSRC_HSE | CFGR_PLLMUL_9 | CFGR_PPRE1_DIV2,
        );

        modify_reg(RCC_BASE + RCC_CR, |cr| cr | CR_PLLON);
        while read_reg(RCC_BASE + RCC_CR) & CR_PLLRDY == 0 {}

        modify_reg(RCC_BASE + RCC_CFGR, |cfgr| cfgr | CFGR_SW_PLL);
        while read_reg(RCC_BASE + RCC_CFGR) & CFGR_SWS_MASK != CFGR_SW_PLL << 2 {}
    }
}

/// Pulse the USB block through reset and gate its clock on
pub(crate) fn enable_usb_clock() {
    critical_section::with(|_| unsafe {
        modify_reg(RCC_BASE + RCC_APB1RSTR, |r| r | APB1_USB);
        modify_reg(RCC_BASE + RCC_APB1RSTR, |r| r & !APB1_USB);
        modify_reg(RCC_BASE + RCC_APB1ENR, |r| r | APB1_USB);
    });
}

/// One GPIO port's register block
pub struct RawPort {
    base: u32,
}

impl RawPort {
    const fn new(base: u32) -> Self {
        Self { base }
    }
}

impl PortRegisters for RawPort {
    fn read_input(&self) -> u32 {
        unsafe { read_reg(self.base + GPIO_IDR) }
    }

    fn read_output(&self) -> u32 {
        unsafe { read_reg(self.base + GPIO_ODR) }
    }

    fn write_output(&mut self, value: u32) {
        unsafe { write_reg(self.base + GPIO_ODR, value & 0xFFFF) }
    }

    fn write_control_low(&mut self, value: u32) {
        unsafe { write_reg(self.base + GPIO_CRL, value) }
    }

    fn write_control_high(&mut self, value: u32) {
        unsafe { write_reg(self.base + GPIO_CRH, value) }
    }
}

/// Ports A..D at their fixed addresses.
///
/// Handles are plain addresses; any number may exist. Pin writes are read-modify-write, so
/// two handles must not be used from contexts that preempt each other.
pub struct Stm32Gpio {
    ports: [RawPort; 4],
}

impl Stm32Gpio {
    pub const fn new() -> Self {
        Self {
            ports: [
                RawPort::new(GPIOA_BASE),
                RawPort::new(GPIOB_BASE),
                RawPort::new(GPIOC_BASE),
                RawPort::new(GPIOD_BASE),
            ],
        }
    }
}

impl Default for Stm32Gpio {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioBank for Stm32Gpio {
    type Port = RawPort;

    fn port(&mut self, id: PortId) -> &mut RawPort {
        &mut self.ports[id.index()]
    }
}

/// Reset and clock control plus the AFIO remap register
pub struct Rcc;

impl Rcc {
    fn apb2_mask(peripheral: Peripheral) -> u32 {
        match peripheral {
            Peripheral::AlternateFunction => 1 << 0,
            Peripheral::Port(id) => 1 << (2 + id.index()),
        }
    }
}

impl SystemControl for Rcc {
    fn assert_reset(&mut self, peripheral: Peripheral) {
        let mask = Self::apb2_mask(peripheral);
        unsafe { modify_reg(RCC_BASE + RCC_APB2RSTR, |r| r | mask) }
    }

    fn release_reset(&mut self, peripheral: Peripheral) {
        let mask = Self::apb2_mask(peripheral);
        unsafe { modify_reg(RCC_BASE + RCC_APB2RSTR, |r| r & !mask) }
    }

    fn enable_clock(&mut self, peripheral: Peripheral) {
        let mask = Self::apb2_mask(peripheral);
        unsafe { modify_reg(RCC_BASE + RCC_APB2ENR, |r| r | mask) }
    }

    fn disable_jtag(&mut self) {
        // SWJ_CFG reads back undefined, so write the whole register
        unsafe { write_reg(AFIO_BASE + AFIO_MAPR, MAPR_SWJ_JTAG_DISABLE) }
    }
}

/// Busy-wait on the SysTick down-counter.
///
/// Works with interrupts disabled: only the counter value is sampled, and wraps are
/// detected from the reload value. Must be sampled at least once per SysTick period,
/// which the tight loop guarantees.
pub struct SysTickDelay;

impl FineDelay for SysTickDelay {
    fn delay_ticks(&mut self, ticks: u32) {
        let period = SYST::get_reload() + 1;
        let mut remaining = delay_cycles(ticks, CYCLES_PER_TICK);
        let mut last = SYST::get_current();

        while remaining > 0 {
            let now = SYST::get_current();
            let elapsed = countdown_elapsed(last, now, period);
            remaining = remaining.saturating_sub(elapsed as u64);
            last = now;
        }
    }
}
