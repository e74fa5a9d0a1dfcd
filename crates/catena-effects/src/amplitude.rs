//! Gain stages: plain amplification, single-channel gain, hard limiting and a
//! clip-counting amplifier.
//!
//! All gains are given in percent, so `-ea:100` is unity and `-ea:50` is
//! roughly -6 dB.

use std::borrow::Cow;

use catena_core::{
    ChainOperator, MAX_AMPLITUDE, MAX_CHANNELS, Operator, ParamDescriptor, ParamFlags,
    SampleBuffer, param_names,
};

use crate::mixing::{channel_descriptor, channel_from};

fn gain_descriptor(desc: &mut ParamDescriptor) {
    *desc = desc.with_default(100.0).with_lower_bound(0.0);
}

/// Multiplies every sample by a percentage.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | amp-% | ≥ 0 | 100.0 |
#[derive(Debug, Clone)]
pub struct Amplify {
    percent: f32,
}

impl Amplify {
    /// Creates an amplifier with the given gain in percent.
    pub fn new(percent: f32) -> Self {
        Self { percent }
    }

    fn gain(&self) -> f32 {
        self.percent / 100.0
    }
}

impl Default for Amplify {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl Operator for Amplify {
    fn name(&self) -> &str {
        "Amplify"
    }

    fn description(&self) -> &str {
        "Adjusts the signal level by a percentage."
    }

    fn keyword(&self) -> &str {
        "ea"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("amp-%")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == 1 {
            self.percent = value;
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.percent,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        if index == 1 {
            gain_descriptor(desc);
        }
    }
}

impl ChainOperator for Amplify {
    fn init(&mut self, _buffer: &SampleBuffer) {}

    fn process(&mut self, buffer: &mut SampleBuffer) {
        let gain = self.gain();
        for channel in buffer.channels_mut() {
            channel.iter_mut().for_each(|s| *s *= gain);
        }
    }
}

/// Amplifies one channel and leaves the others alone.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | amp-% | ≥ 0 | 100.0 |
/// | 2 | channel | 1–64, integer | 1 |
///
/// Channel numbers below 1 are rejected and keep the previous channel;
/// larger ones are capped at [`MAX_CHANNELS`].
#[derive(Debug, Clone)]
pub struct AmplifyChannel {
    percent: f32,
    /// 1-based.
    channel: usize,
}

impl AmplifyChannel {
    /// Creates a single-channel amplifier. `channel` is 1-based.
    pub fn new(percent: f32, channel: usize) -> Self {
        Self {
            percent,
            channel: channel.clamp(1, MAX_CHANNELS),
        }
    }
}

impl Default for AmplifyChannel {
    fn default() -> Self {
        Self::new(100.0, 1)
    }
}

impl Operator for AmplifyChannel {
    fn name(&self) -> &str {
        "Channel amplify"
    }

    fn description(&self) -> &str {
        "Adjusts the level of a single channel."
    }

    fn keyword(&self) -> &str {
        "eac"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("amp-%,channel")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.percent = value,
            2 => {
                if let Some(ch) = channel_from(value) {
                    self.channel = ch;
                }
            }
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.percent,
            2 => self.channel as f32,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => gain_descriptor(desc),
            2 => channel_descriptor(desc),
            _ => {}
        }
    }
}

impl ChainOperator for AmplifyChannel {
    fn init(&mut self, _buffer: &SampleBuffer) {}

    fn process(&mut self, buffer: &mut SampleBuffer) {
        let index = self.channel - 1;
        if index >= buffer.channel_count() {
            return;
        }
        let gain = self.percent / 100.0;
        buffer.channel_mut(index).iter_mut().for_each(|s| *s *= gain);
    }
}

/// Hard clipper at a percentage of full scale.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | limit-% | 0.0–100.0 | 100.0 |
#[derive(Debug, Clone)]
pub struct Limiter {
    percent: f32,
}

impl Limiter {
    /// Creates a limiter at `percent` of full scale.
    pub fn new(percent: f32) -> Self {
        Self { percent }
    }
}

impl Default for Limiter {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl Operator for Limiter {
    fn name(&self) -> &str {
        "Limiter"
    }

    fn description(&self) -> &str {
        "Clamps samples to a fraction of full scale."
    }

    fn keyword(&self) -> &str {
        "eal"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("limit-%")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == 1 {
            self.percent = value;
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.percent,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        if index == 1 {
            *desc = desc.with_default(100.0).bounded(0.0, 100.0);
        }
    }
}

impl ChainOperator for Limiter {
    fn init(&mut self, _buffer: &SampleBuffer) {}

    fn process(&mut self, buffer: &mut SampleBuffer) {
        let limit = (MAX_AMPLITUDE * self.percent / 100.0).abs();
        for channel in buffer.channels_mut() {
            channel.iter_mut().for_each(|s| *s = s.clamp(-limit, limit));
        }
    }
}

/// Amplifier that watches for runs of clipped samples.
///
/// A sample counts as clipped when it leaves `[-1, 1]` after amplification.
/// The run length resets on the first unclipped sample. When a block ends
/// with a run longer than `max-clipped-samples`, a warning is logged; a
/// maximum of 0 disables the warning.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | amp-% | ≥ 0 | 100.0 |
/// | 2 | max-clipped-samples | ≥ 0, integer | 0 |
#[derive(Debug, Clone)]
pub struct AmplifyClipCount {
    percent: f32,
    max_clipped: usize,
    clipped_run: usize,
}

impl AmplifyClipCount {
    /// Creates a clip-counting amplifier.
    pub fn new(percent: f32, max_clipped: usize) -> Self {
        Self {
            percent,
            max_clipped,
            clipped_run: 0,
        }
    }

    /// Length of the current run of consecutive clipped samples.
    pub fn clipped_run(&self) -> usize {
        self.clipped_run
    }

    /// Returns true if the current run exceeds the configured maximum.
    pub fn is_clipping(&self) -> bool {
        self.max_clipped != 0 && self.clipped_run > self.max_clipped
    }
}

impl Default for AmplifyClipCount {
    fn default() -> Self {
        Self::new(100.0, 0)
    }
}

impl Operator for AmplifyClipCount {
    fn name(&self) -> &str {
        "Amplify with clip-control"
    }

    fn description(&self) -> &str {
        "Adjusts the level and warns about consecutive clipped samples."
    }

    fn keyword(&self) -> &str {
        "eaw"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("amp-%,max-clipped-samples")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.percent = value,
            2 => self.max_clipped = value.max(0.0) as usize,
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.percent,
            2 => self.max_clipped as f32,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => gain_descriptor(desc),
            2 => {
                *desc = desc
                    .with_default(0.0)
                    .with_lower_bound(0.0)
                    .with_flags(ParamFlags::INTEGER);
            }
            _ => {}
        }
    }
}

impl ChainOperator for AmplifyClipCount {
    fn init(&mut self, _buffer: &SampleBuffer) {
        self.clipped_run = 0;
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        let gain = self.percent / 100.0;
        for channel in buffer.channels_mut() {
            for sample in channel.iter_mut() {
                *sample *= gain;
                if sample.abs() > MAX_AMPLITUDE {
                    self.clipped_run += 1;
                } else {
                    self.clipped_run = 0;
                }
            }
        }

        #[cfg(feature = "tracing")]
        if self.is_clipping() {
            tracing::warn!(consecutive = self.clipped_run, "signal is clipping");
        }
    }

    fn status(&self) -> String {
        format!("consecutive clipped samples: {}", self.clipped_run)
    }
}
