//! Modulating delay effects: chorus, flanger and phaser.
//!
//! All three read a delay line at `delay-time + variance · lfo`, where the
//! LFO is a sine mapped into `[0, 1]`. They differ in how the delayed copy is
//! combined with the input:
//!
//! | Effect | Output | LFO phase |
//! |--------|--------|-----------|
//! | Flanger | `(x + d) / 2` | same on every channel |
//! | Chorus | `(x + d) / 2` | a quarter period apart per channel |
//! | Phaser | `(x - d) / 2` | same on every channel |
//!
//! The line is written with `x ± feedback · d`, using the same sign as the
//! output.

use std::borrow::Cow;
use std::f32::consts::TAU;

use catena_core::{ChainOperator, Operator, ParamDescriptor, SampleBuffer, param_names};

use crate::timebased::{
    DelayLine, MAX_DELAY_SAMPLES, count_descriptor, mix_descriptor, ms_to_samples, time_descriptor,
};

const DEFAULT_SAMPLE_RATE: u32 = 48000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Voicing {
    Chorus,
    Flanger,
    Phaser,
}

/// Shared engine of the three modulating delays.
#[derive(Debug, Clone)]
struct ModulatingDelay {
    voicing: Voicing,
    delay_ms: f32,
    variance: usize,
    feedback_percent: f32,
    lfo_freq: f32,
    sample_rate: u32,
    /// LFO phase in periods, `[0, 1)`.
    phase: f32,
    lines: Vec<DelayLine>,
}

impl ModulatingDelay {
    fn new(voicing: Voicing, delay_ms: f32, variance: usize, feedback: f32, lfo_freq: f32) -> Self {
        Self {
            voicing,
            delay_ms,
            variance: variance.min(MAX_DELAY_SAMPLES),
            feedback_percent: feedback,
            lfo_freq,
            sample_rate: DEFAULT_SAMPLE_RATE,
            phase: 0.0,
            lines: Vec::new(),
        }
    }

    fn longest_delay(&self) -> usize {
        ms_to_samples(self.delay_ms, self.sample_rate) + self.variance + 2
    }

    fn fit(&mut self, channels: usize) {
        if self.lines.len() < channels {
            self.lines.resize_with(channels, DelayLine::default);
        }
        let longest = self.longest_delay();
        for line in &mut self.lines {
            line.reserve(longest);
        }
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.delay_ms = value,
            2 => self.variance = (value.max(0.0) as usize).min(MAX_DELAY_SAMPLES),
            3 => self.feedback_percent = value,
            4 => self.lfo_freq = value,
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.delay_ms,
            2 => self.variance as f32,
            3 => self.feedback_percent,
            4 => self.lfo_freq,
            _ => 0.0,
        }
    }

    fn parameter_description(index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => time_descriptor(desc, 2.0),
            2 => count_descriptor(desc, 50.0, 0.0),
            3 => mix_descriptor(desc, 20.0),
            4 => *desc = desc.with_default(0.4).with_lower_bound(0.0),
            _ => {}
        }
    }

    fn init(&mut self, buffer: &SampleBuffer) {
        self.sample_rate = buffer.sample_rate().max(1);
        self.phase = 0.0;
        self.lines.clear();
        self.fit(buffer.channel_count());
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        let channels = buffer.channel_count();
        self.fit(channels);
        let base = ms_to_samples(self.delay_ms, self.sample_rate) as f32;
        let variance = self.variance as f32;
        let feedback = self.feedback_percent / 100.0;
        let increment = self.lfo_freq.max(0.0) / self.sample_rate as f32;
        let sign = if self.voicing == Voicing::Phaser { -1.0 } else { 1.0 };
        let spread = if self.voicing == Voicing::Chorus { 0.25 } else { 0.0 };

        for n in 0..buffer.frame_count() {
            for c in 0..channels {
                let phase = self.phase + spread * c as f32;
                let lfo = (libm::sinf(TAU * phase) + 1.0) * 0.5;
                let line = &mut self.lines[c];
                let delayed = line.read_fractional(base + variance * lfo);
                let x = buffer.channel(c)[n];
                line.push(x + sign * feedback * delayed);
                buffer.channel_mut(c)[n] = 0.5 * (x + sign * delayed);
            }
            self.phase = (self.phase + increment).fract();
        }
    }

    fn release(&mut self) {
        self.lines.clear();
    }
}

macro_rules! modulating_delay {
    ($(#[$doc:meta])* $ty:ident, $voicing:expr, $name:literal, $keyword:literal, $description:literal) => {
        $(#[$doc])*
        ///
        /// ## Parameter Indices
        ///
        /// | Index | Name | Range | Default |
        /// |-------|------|-------|---------|
        /// | 1 | delay-time-msec | ≥ 0 | 2.0 |
        /// | 2 | variance-time-samples | ≥ 0, integer | 50 |
        /// | 3 | feedback-% | 0.0–100.0 | 20.0 |
        /// | 4 | lfo-freq | ≥ 0 Hz | 0.4 |
        #[derive(Debug, Clone)]
        pub struct $ty {
            inner: ModulatingDelay,
        }

        impl $ty {
            /// Creates the effect. `variance` is in samples.
            pub fn new(delay_ms: f32, variance: usize, feedback_percent: f32, lfo_freq: f32) -> Self {
                Self {
                    inner: ModulatingDelay::new($voicing, delay_ms, variance, feedback_percent, lfo_freq),
                }
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new(2.0, 50, 20.0, 0.4)
            }
        }

        impl Operator for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn description(&self) -> &str {
                $description
            }

            fn keyword(&self) -> &str {
                $keyword
            }

            fn parameter_names(&self) -> Vec<Cow<'static, str>> {
                param_names("delay-time-msec,variance-time-samples,feedback-%,lfo-freq")
            }

            fn set_parameter(&mut self, index: usize, value: f32) {
                self.inner.set_parameter(index, value);
            }

            fn get_parameter(&self, index: usize) -> f32 {
                self.inner.get_parameter(index)
            }

            fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
                ModulatingDelay::parameter_description(index, desc);
            }
        }

        impl ChainOperator for $ty {
            fn init(&mut self, buffer: &SampleBuffer) {
                self.inner.init(buffer);
            }

            fn process(&mut self, buffer: &mut SampleBuffer) {
                self.inner.process(buffer);
            }

            fn release(&mut self) {
                self.inner.release();
            }
        }
    };
}

modulating_delay!(
    /// Chorus: a sine-swept delayed copy mixed with the input, with the sweep
    /// offset a quarter period on each successive channel.
    Chorus,
    Voicing::Chorus,
    "Chorus",
    "etc",
    "Thickens the signal with a slowly moving delayed copy."
);

modulating_delay!(
    /// Flanger: a short sine-swept delay mixed with the input.
    Flanger,
    Voicing::Flanger,
    "Flanger",
    "etl",
    "Sweeps comb-filter peaks with a modulated short delay."
);

modulating_delay!(
    /// Phaser: a sine-swept delayed copy subtracted from the input.
    Phaser,
    Voicing::Phaser,
    "Phaser",
    "etp",
    "Sweeps notches by cancelling the input against a moving delayed copy."
);

#[cfg(test)]
mod tests {
    use super::*;

    /// 1 kHz sample rate, so milliseconds equal samples.
    fn impulse(channels: usize, frames: usize) -> SampleBuffer {
        let mut buf = SampleBuffer::new(channels, frames, 1000);
        for ch in buf.channels_mut() {
            ch[0] = 1.0;
        }
        buf
    }

    #[test]
    fn test_flanger_echo_at_lfo_midpoint() {
        // Frozen LFO sits at 0.5, so the delay is 2 + 2 · 0.5 = 3 samples.
        let mut flanger = Flanger::new(2.0, 2, 0.0, 0.0);
        let mut buf = impulse(1, 8);
        flanger.init(&buf);
        flanger.process(&mut buf);
        assert_eq!(buf.channel(0), &[0.5, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_phaser_inverts_delayed_copy() {
        let mut phaser = Phaser::new(2.0, 2, 0.0, 0.0);
        let mut buf = impulse(1, 5);
        phaser.init(&buf);
        phaser.process(&mut buf);
        assert_eq!(buf.channel(0), &[0.5, 0.0, 0.0, -0.5, 0.0]);
    }

    #[test]
    fn test_feedback_repeats_echo() {
        let mut flanger = Flanger::new(2.0, 2, 50.0, 0.0);
        let mut buf = impulse(1, 8);
        flanger.init(&buf);
        flanger.process(&mut buf);
        assert_eq!(buf.channel(0)[3], 0.5);
        assert_eq!(buf.channel(0)[6], 0.25);
    }

    #[test]
    fn test_chorus_spreads_channels() {
        // Channel 2 is a quarter period ahead: LFO at 1.0, delay 4.
        let mut chorus = Chorus::new(2.0, 2, 0.0, 0.0);
        let mut buf = impulse(2, 6);
        chorus.init(&buf);
        chorus.process(&mut buf);
        assert_eq!(buf.channel(0)[3], 0.5);
        assert!(buf.channel(1)[3].abs() < 1e-6);
        assert!((buf.channel(1)[4] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_sweep_stays_finite() {
        let mut flanger = Flanger::new(5.0, 200, 90.0, 3.0);
        let mut buf = SampleBuffer::new(2, 48000, 48000);
        for ch in buf.channels_mut() {
            for (n, s) in ch.iter_mut().enumerate() {
                *s = libm::sinf(n as f32 * 0.05);
            }
        }
        flanger.init(&buf);
        flanger.process(&mut buf);
        assert!(buf.channels().all(|ch| ch.iter().all(|s| s.is_finite() && s.abs() < 10.0)));
    }

    #[test]
    fn test_parameters() {
        let mut chorus = Chorus::default();
        assert_eq!(chorus.parameter_values(), vec![2.0, 50.0, 20.0, 0.4]);
        chorus.set_parameter(2, 1e12);
        assert_eq!(chorus.get_parameter(2), MAX_DELAY_SAMPLES as f32);
        assert_eq!(Phaser::default().keyword(), "etp");
        assert!(Flanger::default().describe_parameter(2).unwrap().is_integer());
    }
}
