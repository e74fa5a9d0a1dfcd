//! Pitch shifting by resampling.
//!
//! Playing a block back faster raises its pitch and shortens it. The shifter
//! keeps the read position and the last input sample of every channel across
//! blocks, so consecutive blocks join without clicks.

use std::borrow::Cow;

use catena_core::{ChainOperator, Operator, ParamDescriptor, SampleBuffer, param_names};

/// Smallest accepted change. One input block yields at most 100 output
/// blocks' worth of frames.
pub const MIN_CHANGE_PERCENT: f32 = 1.0;

/// Resampling pitch shifter.
///
/// A change of 200% plays twice as fast (one octave up, half the frames);
/// 50% plays at half speed (one octave down, twice the frames). Because the
/// read position carries over between blocks, a block can come out one frame
/// longer or shorter than [`output_samples`](ChainOperator::output_samples)
/// predicts.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | change-% | ≥ 1.0 | 100.0 |
///
/// Values at or below zero are rejected and reset the change to 100%.
/// Positive values below [`MIN_CHANGE_PERCENT`] are raised to it.
#[derive(Debug, Clone)]
pub struct PitchShift {
    change_percent: f32,
    /// Read position of the next output frame, in input frames. -1 addresses
    /// the last sample of the previous block.
    position: f64,
    last: Vec<f32>,
    input: Vec<Vec<f32>>,
    positions: Vec<f64>,
}

impl PitchShift {
    /// Creates a shifter.
    pub fn new(change_percent: f32) -> Self {
        let mut shift = Self {
            change_percent: 100.0,
            position: 0.0,
            last: Vec::new(),
            input: Vec::new(),
            positions: Vec::new(),
        };
        shift.set_parameter(1, change_percent);
        shift
    }

    fn step(&self) -> f64 {
        f64::from(self.change_percent) / 100.0
    }
}

impl Default for PitchShift {
    fn default() -> Self {
        Self::new(100.0)
    }
}

fn interpolate(input: &[f32], last: f32, t: f64) -> f32 {
    let floor = t.floor();
    let frac = (t - floor) as f32;
    let i = floor as i64;
    let top = input.len() - 1;
    let a = if i < 0 { last } else { input[(i as usize).min(top)] };
    let b = input[((i + 1).max(0) as usize).min(top)];
    a + (b - a) * frac
}

impl Operator for PitchShift {
    fn name(&self) -> &str {
        "Pitch shifter"
    }

    fn description(&self) -> &str {
        "Shifts pitch by resampling the signal."
    }

    fn keyword(&self) -> &str {
        "ei"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("change-%")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == 1 {
            if value >= MIN_CHANGE_PERCENT {
                self.change_percent = value;
            } else if value > 0.0 {
                #[cfg(feature = "tracing")]
                tracing::warn!(value, "pitch change below {MIN_CHANGE_PERCENT}%, clamped");
                self.change_percent = MIN_CHANGE_PERCENT;
            } else {
                #[cfg(feature = "tracing")]
                tracing::warn!(value, "pitch change must be positive, using 100%");
                self.change_percent = 100.0;
            }
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.change_percent,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        if index == 1 {
            *desc = desc
                .with_default(100.0)
                .with_lower_bound(MIN_CHANGE_PERCENT);
        }
    }
}

impl ChainOperator for PitchShift {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.position = 0.0;
        self.last = vec![0.0; buffer.channel_count()];
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        let frames = buffer.frame_count();
        if frames == 0 {
            return;
        }
        let channels = buffer.channel_count();
        if self.last.len() < channels {
            self.last.resize(channels, 0.0);
        }

        let step = self.step();
        let end = (frames - 1) as f64;
        self.positions.clear();
        let mut t = self.position;
        while t <= end {
            self.positions.push(t);
            t += step;
        }
        self.position = t - frames as f64;

        self.input.resize_with(channels, Vec::new);
        for (stash, samples) in self.input.iter_mut().zip(buffer.channels()) {
            stash.clear();
            stash.extend_from_slice(samples);
        }

        buffer.set_frame_count(self.positions.len());
        for ch in 0..channels {
            let input = &self.input[ch];
            let last = self.last[ch];
            for (out, &t) in buffer.channel_mut(ch).iter_mut().zip(&self.positions) {
                *out = interpolate(input, last, t);
            }
            self.last[ch] = input[frames - 1];
        }
    }

    fn output_samples(&self, input_samples: usize) -> usize {
        (input_samples as f64 / self.step()).round() as usize
    }

    fn release(&mut self) {
        self.last.clear();
        self.input.clear();
    }
}
