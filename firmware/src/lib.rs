#![no_std]

//! STM32F103 "Blue Pill" glitcher firmware support: board wiring, register-level
//! hardware, time base and the USB serial transport

pub mod stm32f103_hardware;
pub mod time_driver;
pub mod usb_serial;

pub use glitcher_core::*;

pub use crate::stm32f103_hardware::*;
pub use crate::time_driver::*;
pub use crate::usb_serial::*;

/// Product string and banner name
pub const FIRMWARE_NAME: &str = "stm32-glitcher";

pub mod board {
    //! Blue Pill wiring

    use glitcher_core::{
        ConfigNibble, GlitchRails, GpioConfigSet, Level, Mode, OutputConfig, Pin, PortId,
    };

    /// Pulls the target's supply down when high
    pub const GLITCH: Pin = Pin::new(PortId::A, 0);
    /// Target supply
    pub const POWER: Pin = Pin::new(PortId::A, 2);
    pub const USB_DM: Pin = Pin::new(PortId::A, 11);
    pub const USB_DP: Pin = Pin::new(PortId::A, 12);
    /// External 1.5k pull-up on D+ hangs off this pin; driving it low detaches the device
    pub const USB_DP_PULLUP: Pin = USB_DP;
    pub const LED: Pin = Pin::new(PortId::C, 13);

    pub const RAILS: GlitchRails = GlitchRails {
        power: POWER,
        glitch: GLITCH,
    };

    /// LED blink half-periods
    pub const BLINK_DISCONNECTED_MS: u64 = 500;
    pub const BLINK_CONNECTED_MS: u64 = 200;

    /// How long D+ is held low so the host sees a detach
    pub const USB_DETACH_MS: u64 = 10;

    /// Pin setup for the whole board. Everything not listed stays input with pull-down.
    pub fn gpio_config() -> GpioConfigSet {
        let out_50mhz = ConfigNibble::output(Mode::Output50MHz, OutputConfig::PushPull);
        let out_10mhz = ConfigNibble::output(Mode::Output10MHz, OutputConfig::PushPull);

        let mut config = GpioConfigSet::init();
        config
            .set_pin(USB_DM, ConfigNibble::INPUT_FLOATING, Level::Low)
            .set_pin(USB_DP, ConfigNibble::INPUT_FLOATING, Level::Low)
            // Same line as D+: held low as an output until the stack is ready
            .set_pin(USB_DP_PULLUP, out_50mhz, Level::Low)
            .set_pin(GLITCH, out_50mhz, Level::Low)
            .set_pin(POWER, out_50mhz, Level::High)
            .set_pin(LED, out_10mhz, Level::Low);
        config
    }
}
