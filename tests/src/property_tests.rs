//! Property-based checks of the pin model, configuration staging and argument parsing

#[cfg(test)]
mod tests {
    use embedded_hal::digital::{InputPin, OutputPin, StatefulOutputPin};
    use glitcher_core::hal::mock::MockGpio;
    use glitcher_core::{
        ticks_to_micros, ArgumentError, DecimalParser, GpioBank, GpioConfigSet, Level, Pin,
        PinDriver, PortId, PortRegisters,
    };
    use proptest::prelude::*;

    fn any_pin() -> impl Strategy<Value = Pin> {
        (0u8..4, 0u8..16).prop_map(|(port, index)| Pin::new(PortId::from_selector(port), index))
    }

    fn parse(input: &[u8]) -> Option<Result<u32, ArgumentError>> {
        let mut parser = DecimalParser::new();
        input.iter().find_map(|byte| parser.push(*byte))
    }

    proptest! {
        #[test]
        fn set_reads_back_and_spares_neighbours(pin in any_pin(), initial in 0u32..0x1_0000, high in any::<bool>()) {
            let mut gpio = MockGpio::default();
            gpio.port(pin.port()).write_output(initial);

            gpio.set(pin, Level::from(high));

            prop_assert_eq!(gpio.get(pin), Level::from(high));
            let output = gpio.port_state(pin.port()).output;
            prop_assert_eq!(output & !pin.mask(), initial & !pin.mask());
        }

        #[test]
        fn toggle_twice_is_identity(pin in any_pin(), initial in 0u32..0x1_0000) {
            let mut gpio = MockGpio::default();
            gpio.port(pin.port()).write_output(initial);

            gpio.toggle(pin);
            prop_assert_eq!(gpio.port_state(pin.port()).output, initial ^ pin.mask());
            gpio.toggle(pin);
            prop_assert_eq!(gpio.port_state(pin.port()).output, initial);
        }

        #[test]
        fn pin_driver_matches_bank(pin in any_pin(), high in any::<bool>()) {
            let mut gpio = MockGpio::default();
            {
                let mut driver = PinDriver::new(&mut gpio, pin);
                if high {
                    driver.set_high().unwrap();
                } else {
                    driver.set_low().unwrap();
                }
                prop_assert_eq!(driver.is_set_high().unwrap(), high);
                prop_assert_eq!(driver.is_high().unwrap(), high);
            }
            prop_assert_eq!(gpio.output_level(pin), Level::from(high));
        }

        #[test]
        fn staged_nibble_is_masked(pin in any_pin(), bits in any::<u8>(), high in any::<bool>()) {
            let mut config = GpioConfigSet::init();
            config.set_pin(pin, bits, Level::from(high));

            prop_assert_eq!(config.nibble(pin).bits(), bits & 0xF);

            let port = config.port(pin.port());
            prop_assert_eq!(port.output_word() & (1 << pin.index()) != 0, high);

            let (low, high_word) = port.control_words();
            let word = if pin.index() < 8 { low } else { high_word };
            let shift = (pin.index() % 8) * 4;
            prop_assert_eq!((word >> shift) & 0xF, (bits & 0xF) as u32);
        }

        #[test]
        fn decimal_round_trip(value in any::<u32>(), terminator in any::<u8>().prop_filter("non-digit", |b| !b.is_ascii_digit())) {
            let mut input = value.to_string().into_bytes();
            input.push(terminator);
            prop_assert_eq!(parse(&input), Some(Ok(value)));
        }

        #[test]
        fn oversized_values_rejected(value in (u32::MAX as u64 + 1)..u64::MAX) {
            let mut input = value.to_string().into_bytes();
            input.push(b'\n');
            prop_assert_eq!(parse(&input), Some(Err(ArgumentError::Overflow)));
        }

        #[test]
        fn micros_match_float_rendering(ticks in any::<u32>()) {
            let (micros, nanos) = ticks_to_micros(ticks);
            let exact = format!("{}.{:03}", micros, nanos);
            prop_assert_eq!(exact, format!("{:.3}", ticks as f64 * 0.125));
        }
    }
}
