//! Console scenarios driven over the scripted transport

#[cfg(test)]
mod tests {
    use glitcher_core::hal::mock::{Journal, MockTransport};
    use glitcher_core::{
        ArgumentError, Command, ConsoleError, Level, Parameter, TimingConfig, TimingParameters,
        TickSource, COMMAND_LIST, GLITCH_NOTICE, PROMPT, RESET_NOTICE, TICKS_PER_MS, UNEXPECTED,
    };
    use rstest::rstest;

    use crate::rig::{self, GLITCH, POWER};

    #[test]
    fn test_banner_then_prompt_on_connect() {
        let journal = Journal::new();
        let params = TimingParameters::new();
        let mut console = rig::console(&journal, &params);
        let mut transport = MockTransport::with_clock(journal.clock());

        transport.set_connected(false);
        assert_eq!(console.poll(&mut transport), None);
        assert_eq!(transport.output(), "");
        assert_eq!(transport.flushes, 0);

        transport.set_connected(true);
        console.poll(&mut transport);
        assert_eq!(transport.take_output(), format!("glitcher v:1.2.3\n\r{}", PROMPT));
        assert_eq!(transport.flushes, 1);
    }

    #[test]
    fn test_input_waits_while_disconnected() {
        let journal = Journal::new();
        let params = TimingParameters::new();
        let mut console = rig::console(&journal, &params);
        let mut transport = rig::greeted(&mut console, &journal);

        transport.set_connected(false);
        transport.push_input(b"r");
        assert_eq!(console.poll(&mut transport), None);
        assert_eq!(transport.pending_input(), 1);
        assert!(journal.events().is_empty());
    }

    #[test]
    fn test_one_command_per_poll() {
        let journal = Journal::new();
        let params = TimingParameters::new();
        let mut console = rig::console(&journal, &params);
        let mut transport = rig::greeted(&mut console, &journal);

        transport.push_input(b"hh");
        assert_eq!(console.poll(&mut transport), Some(Ok(Command::Help)));
        assert_eq!(transport.pending_input(), 1);
    }

    #[test]
    fn test_help_lists_commands() {
        let journal = Journal::new();
        let params = TimingParameters::new();
        let mut console = rig::console(&journal, &params);
        let mut transport = rig::greeted(&mut console, &journal);

        transport.push_input(b"h");
        console.poll(&mut transport);
        assert_eq!(
            transport.take_output(),
            format!("h\n\rglitcher v:1.2.3\n\r{}{}", COMMAND_LIST, PROMPT)
        );
        assert!(COMMAND_LIST.contains("\n\r w    glitch pulse width (format: command%d"));
    }

    #[test]
    fn test_set_glitch_width_end_to_end() {
        let journal = Journal::new();
        let params = TimingParameters::new();
        let mut console = rig::console(&journal, &params);
        let mut transport = rig::greeted(&mut console, &journal);

        transport.push_input(b"w500\n");
        assert_eq!(
            console.poll(&mut transport),
            Some(Ok(Command::Configure(Parameter::GlitchWidth)))
        );

        assert_eq!(params.get(Parameter::GlitchWidth), 500);
        assert_eq!(
            transport.take_output(),
            format!(
                "w\n\r500\n\n\rsetting glitch pulse width to 62.500us\n\r{}",
                PROMPT
            )
        );
    }

    #[rstest]
    #[case(b"w1\r", Parameter::GlitchWidth, 1, "glitch pulse width to 0.125us")]
    #[case(b"l8000\r", Parameter::ResetWidth, 8000, "rest pulse width to 1000.000us")]
    #[case(b"d24000 ", Parameter::TimeToGlitch, 24000, "time to glitch to 3000.000us")]
    #[case(b"dx", Parameter::TimeToGlitch, 0, "time to glitch to 0.000us")]
    #[case(b"l4294967295\r", Parameter::ResetWidth, u32::MAX, "rest pulse width to 536870911.875us")]
    fn test_configure_parameter(
        #[case] input: &[u8],
        #[case] parameter: Parameter,
        #[case] expected: u32,
        #[case] message: &str,
    ) {
        let journal = Journal::new();
        let params = TimingParameters::new();
        let mut console = rig::console(&journal, &params);
        let mut transport = rig::greeted(&mut console, &journal);

        transport.push_input(input);
        console.poll(&mut transport);

        assert_eq!(params.get(parameter), expected);
        let output = transport.take_output();
        assert!(output.contains(&format!("\n\rsetting {}\n\r", message)), "{output:?}");
        assert!(output.ends_with(PROMPT));
    }

    #[test]
    fn test_terminator_is_not_reinterpreted() {
        let journal = Journal::new();
        let params = TimingParameters::new();
        let mut console = rig::console(&journal, &params);
        let mut transport = rig::greeted(&mut console, &journal);

        // 'r' ends the number and must not trigger a reset
        transport.push_input(b"d12r");
        console.poll(&mut transport);

        assert_eq!(params.get(Parameter::TimeToGlitch), 12);
        assert_eq!(transport.pending_input(), 0);
        assert!(journal.events().is_empty());
    }

    #[test]
    fn test_argument_timeout_leaves_parameter() {
        let journal = Journal::new();
        let params = TimingParameters::new();
        let mut console = rig::console(&journal, &params);
        let mut transport = rig::greeted(&mut console, &journal);
        let clock = journal.clock();
        let started = clock.now();

        transport.push_input(b"d12");
        assert_eq!(
            console.poll(&mut transport),
            Some(Err(ConsoleError::Argument(ArgumentError::Timeout)))
        );

        assert_eq!(params.get(Parameter::TimeToGlitch), 24000);
        assert!(clock.now() - started > 5000 * TICKS_PER_MS);
        assert_eq!(
            transport.take_output(),
            format!("d\n\r12{}{}", UNEXPECTED, PROMPT)
        );
    }

    #[test]
    fn test_argument_overflow_is_rejected() {
        let journal = Journal::new();
        let params = TimingParameters::new();
        let mut console = rig::console(&journal, &params);
        let mut transport = rig::greeted(&mut console, &journal);

        transport.push_input(b"w4294967296\rh");
        assert_eq!(
            console.poll(&mut transport),
            Some(Err(ConsoleError::Argument(ArgumentError::Overflow)))
        );

        assert_eq!(params.snapshot(), TimingConfig::default());
        assert_eq!(
            transport.take_output(),
            format!("w\n\r4294967296\r{}{}", UNEXPECTED, PROMPT)
        );
        // Nothing past the terminator was consumed
        assert_eq!(transport.pending_input(), 1);
    }

    #[rstest]
    #[case(b'x')]
    #[case(b'R')]
    #[case(b'\r')]
    #[case(b'0')]
    fn test_unknown_commands(#[case] byte: u8) {
        let journal = Journal::new();
        let params = TimingParameters::new();
        let mut console = rig::console(&journal, &params);
        let mut transport = rig::greeted(&mut console, &journal);

        transport.push_input(&[byte]);
        assert_eq!(
            console.poll(&mut transport),
            Some(Err(ConsoleError::UnknownCommand(byte)))
        );

        let mut expected = vec![byte, b'\n', b'\r'];
        expected.extend_from_slice(UNEXPECTED.as_bytes());
        expected.extend_from_slice(PROMPT.as_bytes());
        assert_eq!(transport.take_output(), String::from_utf8_lossy(&expected));
        assert_eq!(params.snapshot(), TimingConfig::default());
    }

    #[test]
    fn test_reset_command_cycles_power() {
        let journal = Journal::new();
        let params = TimingParameters::new();
        let mut console = rig::console(&journal, &params);
        let mut transport = rig::greeted(&mut console, &journal);
        let start = journal.clock().now();

        transport.push_input(b"r");
        console.poll(&mut transport);

        assert_eq!(transport.take_output(), format!("r\n\r{}{}", RESET_NOTICE, PROMPT));
        assert_eq!(
            journal.transitions(POWER, Level::High),
            vec![(start, Level::Low), (start + 800_000, Level::High)]
        );
    }

    #[test]
    fn test_glitch_uses_updated_parameters() {
        let journal = Journal::new();
        let params = TimingParameters::new();
        let mut console = rig::console(&journal, &params);
        let mut transport = rig::greeted(&mut console, &journal);

        transport.push_input(b"l80\r");
        console.poll(&mut transport);
        transport.push_input(b"d16\r");
        console.poll(&mut transport);
        transport.take_output();

        let start = journal.clock().now();
        journal.clear();
        transport.push_input(b"g");
        assert_eq!(console.poll(&mut transport), Some(Ok(Command::Glitch)));
        assert_eq!(transport.take_output(), format!("g\n\r{}{}", GLITCH_NOTICE, PROMPT));

        assert_eq!(
            journal.transitions(GLITCH, Level::Low),
            vec![
                (start, Level::High),
                (start + 80, Level::Low),
                (start + 96, Level::High),
                (start + 96, Level::Low),
            ]
        );
        assert_eq!(
            journal.transitions(POWER, Level::High),
            vec![(start, Level::Low), (start + 80, Level::High)]
        );
    }
}
