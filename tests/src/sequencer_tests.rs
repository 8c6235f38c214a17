//! Rail waveforms produced by the glitch sequencer

#[cfg(test)]
mod tests {
    use glitcher_core::hal::mock::{HwEvent, Journal};
    use glitcher_core::{
        GlitchControl, Level, Parameter, SequencerState, TickSource, TimingConfig,
        TimingParameters,
    };
    use rstest::rstest;

    use crate::rig::{self, GLITCH, LED, POWER};

    fn timing(reset_width: u32, time_to_glitch: u32) -> TimingParameters {
        TimingParameters::with_config(TimingConfig {
            reset_width,
            time_to_glitch,
            ..TimingConfig::default()
        })
    }

    #[rstest]
    #[case(800_000)]
    #[case(8)]
    #[case(1)]
    #[case(0)]
    fn test_reset_window(#[case] reset_width: u32) {
        let journal = Journal::new();
        let params = timing(reset_width, 24000);
        let mut sequencer = rig::sequencer(&journal, &params);

        sequencer.reset_target();

        let end = reset_width as u64;
        assert_eq!(
            journal.transitions(POWER, Level::High),
            vec![(0, Level::Low), (end, Level::High)]
        );
        assert_eq!(
            journal.transitions(GLITCH, Level::Low),
            vec![(0, Level::High), (end, Level::Low)]
        );
        assert_eq!(sequencer.state(), SequencerState::Idle);
    }

    #[rstest]
    #[case(800_000, 24_000)]
    #[case(80, 1)]
    #[case(80, 0)]
    fn test_glitch_follows_reset(#[case] reset_width: u32, #[case] time_to_glitch: u32) {
        let journal = Journal::new();
        let params = timing(reset_width, time_to_glitch);
        let mut sequencer = rig::sequencer(&journal, &params);

        sequencer.glitch_target();

        let powered = reset_width as u64;
        let pulse = powered + time_to_glitch as u64;
        assert_eq!(
            journal.transitions(GLITCH, Level::Low),
            vec![
                (0, Level::High),
                (powered, Level::Low),
                (pulse, Level::High),
                (pulse, Level::Low),
            ]
        );
        // Power stays on through the glitch
        assert_eq!(
            journal.transitions(POWER, Level::High),
            vec![(0, Level::Low), (powered, Level::High)]
        );
        assert_eq!(journal.clock().now(), pulse);
    }

    #[test]
    fn test_sequence_leaves_other_pins_alone() {
        let journal = Journal::new();
        let params = TimingParameters::new();
        let mut sequencer = rig::sequencer(&journal, &params);

        sequencer.glitch_target();

        assert!(journal.transitions(LED, Level::Low).is_empty());
        let port_a = sequencer.gpio().port_state(POWER.port());
        assert_eq!(port_a.output, POWER.mask());
    }

    #[test]
    fn test_parameters_snapshot_per_sequence() {
        let journal = Journal::new();
        let params = timing(100, 10);
        let mut sequencer = rig::sequencer(&journal, &params);

        sequencer.glitch_target();
        params.set(Parameter::ResetWidth, 200);
        params.set(Parameter::TimeToGlitch, 20);
        sequencer.glitch_target();

        let delays: Vec<u32> = journal
            .events()
            .into_iter()
            .filter_map(|event| match event {
                HwEvent::Delay(ticks) => Some(ticks),
                _ => None,
            })
            .collect();
        assert_eq!(delays, vec![100, 10, 200, 20]);
    }
}
