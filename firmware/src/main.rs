#![no_std]
#![no_main]

// Logging support
#[cfg(feature = "defmt")]
use defmt::info;
#[cfg(feature = "defmt")]
use defmt_rtt as _;
use panic_halt as _;

// Define a no-op logging macro when defmt is not available
#[cfg(not(feature = "defmt"))]
macro_rules! info {
    ($($arg:tt)*) => {};
}

use cortex_m_rt::{entry, exception};
use embedded_hal::digital::{OutputPin, StatefulOutputPin};

use glitcher_firmware::board;
use glitcher_firmware::{
    configure_systick, init_clocks, on_systick, CdcTransport, CommandConsole, ConsoleConfig,
    GlitchSequencer, PinDriver, Rcc, SerialTransport, Stm32Gpio, SysTickDelay, TickSource,
    TimingParameters, FIRMWARE_NAME, TICKS,
};

/// Timing parameters shared by the console and the sequencer
static PARAMS: TimingParameters = TimingParameters::new();

#[entry]
fn main() -> ! {
    init_clocks();

    // `take` only fails on a second call
    let Some(core) = cortex_m::Peripherals::take() else {
        panic!("core peripherals already taken");
    };
    configure_systick(core.SYST);

    board::gpio_config().apply(&mut Stm32Gpio::new(), &mut Rcc);
    info!("GPIO configured");

    // Hold D+ low long enough for the host to notice, then attach
    let attach_at = TICKS.deadline_after_ms(board::USB_DETACH_MS);
    while !TICKS.has_passed(attach_at) {}
    PinDriver::new(Stm32Gpio::new(), board::USB_DP_PULLUP).set_high().ok();

    let mut transport = CdcTransport::new(FIRMWARE_NAME);

    let sequencer = GlitchSequencer::new(Stm32Gpio::new(), SysTickDelay, &PARAMS, board::RAILS);
    let config = ConsoleConfig {
        name: FIRMWARE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        ..ConsoleConfig::default()
    };
    let mut console = CommandConsole::new(sequencer, &TICKS, &PARAMS, config);

    info!("{} v:{} ready", FIRMWARE_NAME, env!("CARGO_PKG_VERSION"));

    let mut led = PinDriver::new(Stm32Gpio::new(), board::LED);
    let mut blink_at = TICKS.deadline_after_ms(board::BLINK_DISCONNECTED_MS);

    loop {
        transport.poll();

        // Rejected commands are already logged by the console
        console.poll(&mut transport);

        if TICKS.has_passed(blink_at) {
            led.toggle().ok();
            let half_period = if transport.is_connected() {
                board::BLINK_CONNECTED_MS
            } else {
                board::BLINK_DISCONNECTED_MS
            };
            blink_at = TICKS.deadline_after_ms(half_period);
        }
    }
}

#[exception]
fn SysTick() {
    on_systick();
}
