//! Property-based tests for catena effects.
//!
//! Runs every chain operator through the parameter contract (round trip,
//! out-of-range indices) and checks that arbitrary settings never produce
//! non-finite output on short blocks.

use catena_core::{ChainOperator, Operator, SampleBuffer};
use catena_effects::{
    AdvancedCompressor, AdvancedReverb, Allpass, Amplify, AmplifyChannel, AmplifyClipCount,
    AudioStamp, Bandpass, Bandreject, ChannelCopy, Chorus, CombFilter, Compress, DcFind, DcFix,
    Delay, FakeStereo, Flanger, Highpass, InverseCombFilter, Limiter, Lowpass, MixToChannel,
    MultitapDelay, NoiseGate, NormalPan, Phaser, PitchShift, PulseGate, PulseGateBpm, RcLowpass,
    ResonantBandpass, ResonantLowpass, Resonator, Reverb, ThresholdGate, TimeCropGate, Tremolo,
    VolumeBuckets, VolumePeak,
};
use proptest::prelude::*;

fn all_operators() -> Vec<Box<dyn ChainOperator>> {
    vec![
        Box::new(Amplify::default()),
        Box::new(AmplifyChannel::default()),
        Box::new(Limiter::default()),
        Box::new(AmplifyClipCount::default()),
        Box::new(Compress::default()),
        Box::new(NoiseGate::default()),
        Box::new(NormalPan::default()),
        Box::new(ChannelCopy::default()),
        Box::new(MixToChannel::default()),
        Box::new(Delay::default()),
        Box::new(MultitapDelay::default()),
        Box::new(FakeStereo::default()),
        Box::new(Reverb::default()),
        Box::new(AdvancedReverb::default()),
        Box::new(Lowpass::default()),
        Box::new(Highpass::default()),
        Box::new(Bandpass::default()),
        Box::new(Bandreject::default()),
        Box::new(VolumeBuckets::default()),
        Box::new(DcFind::default()),
        Box::new(DcFix::default()),
        Box::new(PitchShift::default()),
        Box::new(TimeCropGate::default()),
        Box::new(ThresholdGate::default()),
        Box::new(AdvancedCompressor::default()),
        Box::new(PulseGate::default()),
        Box::new(PulseGateBpm::default()),
        Box::new(Tremolo::default()),
        Box::new(ResonantBandpass::default()),
        Box::new(Resonator::default()),
        Box::new(ResonantLowpass::default()),
        Box::new(RcLowpass::default()),
        Box::new(Allpass::default()),
        Box::new(CombFilter::default()),
        Box::new(InverseCombFilter::default()),
        Box::new(Chorus::default()),
        Box::new(Flanger::default()),
        Box::new(Phaser::default()),
        Box::new(VolumePeak::default()),
        Box::new(AudioStamp::default()),
    ]
}

/// Maps a raw draw onto a value the parameter accepts.
fn legal_value(op: &dyn ChainOperator, index: usize, raw: f32) -> f32 {
    let desc = op.describe_parameter(index).unwrap_or_default();
    if desc.is_toggled() {
        return if raw > 50.0 { 1.0 } else { 0.0 };
    }
    let value = desc.clamp(raw);
    if desc.is_integer() { value.trunc() } else { value }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Writing a legal value and reading it back returns the same value.
    #[test]
    fn param_round_trip(raw in 1.0f32..100.0, pick in any::<prop::sample::Index>()) {
        for mut op in all_operators() {
            let count = op.number_of_params();
            if count == 0 {
                continue;
            }
            let index = pick.index(count) + 1;
            let desc = op.describe_parameter(index).unwrap_or_default();
            if desc.is_output() {
                continue;
            }
            let value = legal_value(op.as_ref(), index, raw);
            op.set_parameter(index, value);
            prop_assert_eq!(
                op.get_parameter(index),
                value,
                "{} param {} ({:?})",
                op.keyword(),
                index,
                op.parameter_name(index)
            );
        }
    }

    /// Indices outside 1..=count read 0.0 and leave every parameter alone.
    #[test]
    fn out_of_range_index_is_ignored(offset in 1usize..16, value in -1000.0f32..1000.0) {
        for mut op in all_operators() {
            let before = op.parameter_values();
            let beyond = op.number_of_params() + offset;
            op.set_parameter(0, value);
            op.set_parameter(beyond, value);
            prop_assert_eq!(op.get_parameter(0), 0.0);
            prop_assert_eq!(op.get_parameter(beyond), 0.0);
            prop_assert_eq!(op.parameter_values(), before, "{}", op.keyword());
        }
    }

    /// Any legal settings keep output finite over a few blocks.
    #[test]
    fn output_stays_finite(
        raws in prop::collection::vec(1.0f32..100.0, 5),
        samples in prop::collection::vec(-1.0f32..1.0, 64),
    ) {
        for mut op in all_operators() {
            for index in 1..=op.number_of_params().min(raws.len()) {
                let value = legal_value(op.as_ref(), index, raws[index - 1]);
                op.set_parameter(index, value);
            }

            let mut buffer = SampleBuffer::new(2, 32, 8000);
            op.init(&buffer);
            for _ in 0..4 {
                buffer.set_channel_count(2);
                buffer.read_interleaved(&samples, 2);
                let channels = op.output_channels(2);
                buffer.set_channel_count(channels);
                op.process(&mut buffer);
                prop_assert_eq!(buffer.channel_count(), channels, "{}", op.keyword());
                for ch in buffer.channels() {
                    prop_assert!(ch.iter().all(|s| s.is_finite()), "{}", op.keyword());
                }
            }
        }
    }
}
