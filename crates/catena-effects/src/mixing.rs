//! Channel routing: panning, copying one channel onto another, and mixing all
//! channels down into one.
//!
//! Channel numbers in parameters are 1-based, matching how they are written
//! in chain strings.

use std::borrow::Cow;

use catena_core::{
    ChainOperator, MAX_CHANNELS, Operator, ParamDescriptor, ParamFlags, SampleBuffer, param_names,
};

/// Integer channel number in `1..=MAX_CHANNELS`, default 1.
pub(crate) fn channel_descriptor(desc: &mut ParamDescriptor) {
    *desc = desc
        .with_default(1.0)
        .bounded(1.0, MAX_CHANNELS as f32)
        .with_flags(ParamFlags::INTEGER);
}

/// 1-based channel number from a parameter value, at most [`MAX_CHANNELS`].
pub(crate) fn channel_from(value: f32) -> Option<usize> {
    (value >= 1.0).then(|| (value as usize).min(MAX_CHANNELS))
}

/// Stereo panner. Always produces two channels.
///
/// At 50 both channels pass at unity. Moving right attenuates the left
/// channel linearly down to silence at 100, and moving left does the same
/// to the right channel.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | right-% | 0.0–100.0 | 50.0 |
#[derive(Debug, Clone)]
pub struct NormalPan {
    right_percent: f32,
    left_gain: f32,
    right_gain: f32,
}

impl NormalPan {
    /// Creates a panner at `right_percent`.
    pub fn new(right_percent: f32) -> Self {
        let mut pan = Self {
            right_percent: 50.0,
            left_gain: 1.0,
            right_gain: 1.0,
        };
        pan.set_parameter(1, right_percent);
        pan
    }

    /// Returns the (left, right) channel gains.
    pub fn gains(&self) -> (f32, f32) {
        (self.left_gain, self.right_gain)
    }

    fn update_gains(&mut self) {
        let right = self.right_percent.clamp(0.0, 100.0);
        if right < 50.0 {
            self.left_gain = 1.0;
            self.right_gain = right / 50.0;
        } else {
            self.left_gain = (100.0 - right) / 50.0;
            self.right_gain = 1.0;
        }
    }
}

impl Default for NormalPan {
    fn default() -> Self {
        Self::new(50.0)
    }
}

impl Operator for NormalPan {
    fn name(&self) -> &str {
        "Normal pan"
    }

    fn description(&self) -> &str {
        "Balances a stereo signal between left and right."
    }

    fn keyword(&self) -> &str {
        "epp"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("right-%")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == 1 {
            self.right_percent = value;
            self.update_gains();
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.right_percent,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        if index == 1 {
            *desc = desc.with_default(50.0).bounded(0.0, 100.0);
        }
    }
}

impl ChainOperator for NormalPan {
    fn init(&mut self, _buffer: &SampleBuffer) {}

    fn process(&mut self, buffer: &mut SampleBuffer) {
        if let Some((left, right)) = buffer.channel_pair_mut(0, 1) {
            left.iter_mut().for_each(|s| *s *= self.left_gain);
            right.iter_mut().for_each(|s| *s *= self.right_gain);
        }
    }

    fn output_channels(&self, _input_channels: usize) -> usize {
        2
    }
}

/// Copies one channel over another, creating the target if needed.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | from-channel | ≥ 1, integer | 1 |
/// | 2 | to-channel | ≥ 1, integer | 1 |
#[derive(Debug, Clone)]
pub struct ChannelCopy {
    from: usize,
    to: usize,
}

impl ChannelCopy {
    /// Creates a copier. Channels are 1-based; zero is treated as 1.
    pub fn new(from: usize, to: usize) -> Self {
        Self {
            from: from.max(1),
            to: to.max(1),
        }
    }
}

impl Default for ChannelCopy {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl Operator for ChannelCopy {
    fn name(&self) -> &str {
        "Channel copy"
    }

    fn description(&self) -> &str {
        "Copies one channel onto another."
    }

    fn keyword(&self) -> &str {
        "erc"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("from-channel,to-channel")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match (index, channel_from(value)) {
            (1, Some(ch)) => self.from = ch,
            (2, Some(ch)) => self.to = ch,
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.from as f32,
            2 => self.to as f32,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        if (1..=2).contains(&index) {
            channel_descriptor(desc);
        }
    }
}

impl ChainOperator for ChannelCopy {
    fn init(&mut self, _buffer: &SampleBuffer) {}

    fn process(&mut self, buffer: &mut SampleBuffer) {
        if let Some((from, to)) = buffer.channel_pair_mut(self.from - 1, self.to - 1) {
            to.copy_from_slice(from);
        }
    }

    fn output_channels(&self, input_channels: usize) -> usize {
        self.from.max(self.to).max(input_channels)
    }
}

/// Writes the average of all input channels into one channel.
///
/// Averages over the channels present at init, so a target created by this
/// operator does not dilute the mix.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | to-channel | ≥ 1, integer | 1 |
#[derive(Debug, Clone)]
pub struct MixToChannel {
    to: usize,
    input_channels: usize,
    mix: Vec<f32>,
}

impl MixToChannel {
    /// Creates a mixer targeting 1-based channel `to`.
    pub fn new(to: usize) -> Self {
        Self {
            to: to.max(1),
            input_channels: 0,
            mix: Vec::new(),
        }
    }
}

impl Default for MixToChannel {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Operator for MixToChannel {
    fn name(&self) -> &str {
        "Mix to channel"
    }

    fn description(&self) -> &str {
        "Mixes all channels down into a single channel."
    }

    fn keyword(&self) -> &str {
        "erm"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("to-channel")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == 1
            && let Some(ch) = channel_from(value)
        {
            self.to = ch;
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.to as f32,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        if index == 1 {
            channel_descriptor(desc);
        }
    }
}

impl ChainOperator for MixToChannel {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.input_channels = buffer.channel_count();
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        let target = self.to - 1;
        if target >= buffer.channel_count() {
            return;
        }
        let sources = match self.input_channels {
            0 => buffer.channel_count(),
            n => n.min(buffer.channel_count()),
        };

        self.mix.clear();
        self.mix.resize(buffer.frame_count(), 0.0);
        for channel in buffer.channels().take(sources) {
            for (acc, &s) in self.mix.iter_mut().zip(channel) {
                *acc += s;
            }
        }
        let scale = 1.0 / sources as f32;
        for (dst, &sum) in buffer.channel_mut(target).iter_mut().zip(&self.mix) {
            *dst = sum * scale;
        }
    }

    fn output_channels(&self, input_channels: usize) -> usize {
        self.to.max(input_channels)
    }

    fn release(&mut self) {
        self.mix = Vec::new();
    }
}
