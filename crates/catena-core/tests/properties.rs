//! Property-based tests for catena-core buffers and controllers.
//!
//! Checks buffer shape invariants under arbitrary resize sequences, the
//! affine mapping of GenericController, and the out-of-range parameter policy.

use std::borrow::Cow;

use catena_core::{
    ControllerSource, GenericController, InterleavedCursor, Operator, SampleBuffer, param_names,
};
use proptest::prelude::*;

#[derive(Clone)]
struct Fixed {
    value: f32,
    rate: f32,
}

impl Operator for Fixed {
    fn name(&self) -> &str {
        "Fixed"
    }

    fn keyword(&self) -> &str {
        "kf"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("value,rate")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.value = value,
            2 => self.rate = value,
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.value,
            2 => self.rate,
            _ => 0.0,
        }
    }
}

impl ControllerSource for Fixed {
    fn init(&mut self, _step: f64) {}

    fn value(&mut self) -> f32 {
        self.value
    }

    fn step_length(&self) -> f64 {
        0.0
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Every channel holds exactly frame_count samples after any sequence of
    /// channel and frame resizes, and new channels start silent.
    #[test]
    fn buffer_shape_invariant(
        ops in prop::collection::vec((0usize..2, 0usize..8, 0usize..512), 1..20),
    ) {
        let mut buffer = SampleBuffer::new(1, 32, 48000);
        for (kind, channels, frames) in ops {
            let before = buffer.channel_count();
            if kind == 0 {
                buffer.set_channel_count(channels);
                for ch in before..channels {
                    prop_assert!(buffer.channel(ch).iter().all(|&s| s == 0.0));
                }
            } else {
                buffer.set_frame_count(frames);
            }
            for ch in buffer.channels() {
                prop_assert_eq!(ch.len(), buffer.frame_count());
            }
            buffer.channels_mut().for_each(|ch| ch.fill(0.25));
        }
    }

    /// The interleaved cursor visits exactly channels * frames samples.
    #[test]
    fn interleaved_cursor_visits_every_sample(channels in 0usize..6, frames in 0usize..64) {
        let mut buffer = SampleBuffer::new(channels, frames, 48000);
        let mut cursor = InterleavedCursor::new(&mut buffer);
        let mut count = 0;
        while !cursor.end() {
            *cursor.current() += 1.0;
            count += 1;
            cursor.next();
        }
        prop_assert_eq!(count, channels * frames);
        prop_assert!(buffer.channels().all(|ch| ch.iter().all(|&s| s == 1.0)));
    }

    /// Source values in [0, 1] land in [low, high], hitting both ends exactly.
    #[test]
    fn controller_output_within_range(
        v in 0.0f32..=1.0,
        low in -1000.0f32..1000.0,
        span in 0.0f32..1000.0,
    ) {
        let high = low + span;
        let mut ctrl = GenericController::new(Box::new(Fixed { value: v, rate: 1.0 }), 1, low, high);
        let out = ctrl.value(0.0);
        let tolerance = 1e-3 * (1.0 + low.abs() + high.abs());
        prop_assert!(out >= low - tolerance && out <= high + tolerance, "{out} not in [{low}, {high}]");

        ctrl.set_range(low, low);
        prop_assert_eq!(ctrl.value(0.0), low);
    }

    /// Inverse mapping of a value produced by the controller recovers the
    /// source value.
    #[test]
    fn controller_inverse_map_recovers_source(
        v in 0.0f32..=1.0,
        low in -100.0f32..100.0,
        span in 1.0f32..100.0,
    ) {
        let mut ctrl = GenericController::new(
            Box::new(Fixed { value: v, rate: 1.0 }),
            1,
            low,
            low + span,
        );
        let out = ctrl.value(0.0);
        prop_assert!((ctrl.inverse_map(out) - v).abs() < 1e-3);
    }

    /// Out of range writes change nothing.
    #[test]
    fn out_of_range_parameters_are_noops(value in -1e6f32..1e6, extra in 1usize..100) {
        let mut ctrl = GenericController::new(Box::new(Fixed { value: 0.5, rate: 2.0 }), 2, 1.0, 3.0);
        let before = ctrl.parameter_values();
        ctrl.set_parameter(0, value);
        ctrl.set_parameter(ctrl.number_of_params() + extra, value);
        prop_assert_eq!(ctrl.parameter_values(), before);
        prop_assert_eq!(ctrl.get_parameter(ctrl.number_of_params() + extra), 0.0);
    }
}
