//! USB CDC-ACM transport for the command console

use heapless::Deque;
use static_cell::StaticCell;
use stm32_usbd::{UsbBus, UsbPeripheral};
use usb_device::bus::UsbBusAllocator;
use usb_device::device::{UsbDevice, UsbDeviceBuilder, UsbDeviceState, UsbVidPid};
use usb_device::UsbError;
use usbd_serial::{SerialPort, USB_CLASS_CDC};

use glitcher_core::SerialTransport;

use crate::stm32f103_hardware::{enable_usb_clock, SYSCLK_HZ};

pub const USB_VID: u16 = 0xCAFE;
pub const USB_PID: u16 = 0x0420;
pub const MANUFACTURER: &str = "github/perigoso";

/// Bytes held between `poll` and `read_byte`
const RX_CAPACITY: usize = 64;

/// Device polls tried while the class's transmit buffer stays full
const WRITE_RETRIES: usize = 1000;

/// The on-chip USB full-speed block
pub struct UsbRegisters;

unsafe impl UsbPeripheral for UsbRegisters {
    const REGISTERS: *const () = 0x4000_5C00 as *const ();
    // D+ pull-up is an external resistor on this board
    const DP_PULL_UP_FEATURE: bool = false;
    const EP_MEMORY: *const () = 0x4000_6000 as *const ();
    const EP_MEMORY_SIZE: usize = 512;
    const EP_MEMORY_ACCESS_2X16: bool = false;

    fn enable() {
        enable_usb_clock();
    }

    fn startup_delay() {
        // tSTARTUP is 1 us
        cortex_m::asm::delay(SYSCLK_HZ / 1_000_000);
    }
}

pub type Bus = UsbBus<UsbRegisters>;

static USB_BUS: StaticCell<UsbBusAllocator<Bus>> = StaticCell::new();

/// CDC serial port plus a small receive lookahead
pub struct CdcTransport {
    device: UsbDevice<'static, Bus>,
    serial: SerialPort<'static, Bus>,
    rx: Deque<u8, RX_CAPACITY>,
}

impl CdcTransport {
    /// Bring up the USB stack. `product` is reported as the product string.
    ///
    /// Panics if called twice: the bus allocator lives in a single static slot.
    pub fn new(product: &'static str) -> Self {
        let bus: &'static UsbBusAllocator<Bus> = USB_BUS.init(UsbBus::new(UsbRegisters));

        let serial = SerialPort::new(bus);
        let device = UsbDeviceBuilder::new(bus, UsbVidPid(USB_VID, USB_PID))
            .manufacturer(MANUFACTURER)
            .product(product)
            .device_release(0x0100)
            .device_class(USB_CLASS_CDC)
            .build();

        #[cfg(feature = "defmt")]
        defmt::info!("USB CDC up ({=u16:#x}:{=u16:#x})", USB_VID, USB_PID);

        Self {
            device,
            serial,
            rx: Deque::new(),
        }
    }

    fn pump_rx(&mut self) {
        let space = RX_CAPACITY - self.rx.len();
        if space == 0 {
            return;
        }

        let mut buf = [0u8; RX_CAPACITY];
        if let Ok(count) = self.serial.read(&mut buf[..space]) {
            for byte in &buf[..count] {
                // Cannot fail, `space` bounds the read
                self.rx.push_back(*byte).ok();
            }
        }
    }
}

impl SerialTransport for CdcTransport {
    fn poll(&mut self) {
        if self.device.poll(&mut [&mut self.serial]) {
            self.pump_rx();
        }
    }

    fn is_connected(&self) -> bool {
        self.device.state() == UsbDeviceState::Configured && self.serial.dtr()
    }

    fn read_byte(&mut self) -> Option<u8> {
        if self.rx.is_empty() {
            self.pump_rx();
        }
        self.rx.pop_front()
    }

    fn write(&mut self, bytes: &[u8]) {
        let mut pending = bytes;
        let mut retries = 0;

        while !pending.is_empty() {
            match self.serial.write(pending) {
                Ok(written) => {
                    pending = &pending[written..];
                    retries = 0;
                }
                Err(UsbError::WouldBlock) if retries < WRITE_RETRIES && self.is_connected() => {
                    retries += 1;
                    self.serial.flush().ok();
                    self.device.poll(&mut [&mut self.serial]);
                }
                Err(_) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("USB write dropped {} bytes", pending.len());
                    break;
                }
            }
        }
    }

    fn flush(&mut self) {
        // WouldBlock just means the host has not drained the previous packet yet
        self.serial.flush().ok();
    }
}
