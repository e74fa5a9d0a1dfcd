//! Delay-based filters: allpass, feedback comb and feed-forward (inverse)
//! comb.
//!
//! Delays are given in samples, not milliseconds, so the notch and peak
//! spacing of a comb is `rate / delay` Hz regardless of the sample rate.

use std::borrow::Cow;

use catena_core::{ChainOperator, Operator, ParamDescriptor, SampleBuffer, param_names};

use crate::timebased::{DelayLine, MAX_DELAY_SAMPLES, count_descriptor};

/// Largest loop gain a feedback comb is allowed to reach.
const MAX_COMB_GAIN: f32 = 0.999;

fn delay_from(value: f32) -> usize {
    (value.max(1.0) as usize).min(MAX_DELAY_SAMPLES)
}

fn radius_descriptor(desc: &mut ParamDescriptor) {
    *desc = desc.with_default(1.0).bounded(0.0, 1.0);
}

/// Grows `lines` to `channels` lines that hold `delay` samples each.
fn fit_lines(lines: &mut Vec<DelayLine>, channels: usize, delay: usize) {
    if lines.len() < channels {
        lines.resize_with(channels, DelayLine::default);
    }
    for line in lines.iter_mut() {
        line.reserve(delay);
    }
}

/// Schroeder allpass: flat magnitude, frequency dependent phase.
///
/// `y[n] = -g·x[n] + x[n-D] + g·y[n-D]` with `g = feedback-% / 100`.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | delay-samples | ≥ 1, integer | 10 |
/// | 2 | feedback-% | 0.0–100.0 | 50.0 |
#[derive(Debug, Clone)]
pub struct Allpass {
    delay: usize,
    feedback_percent: f32,
    inputs: Vec<DelayLine>,
    outputs: Vec<DelayLine>,
}

impl Allpass {
    /// Creates an allpass.
    pub fn new(delay: usize, feedback_percent: f32) -> Self {
        Self {
            delay: delay.clamp(1, MAX_DELAY_SAMPLES),
            feedback_percent,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    fn gain(&self) -> f32 {
        (self.feedback_percent / 100.0).clamp(-MAX_COMB_GAIN, MAX_COMB_GAIN)
    }
}

impl Default for Allpass {
    fn default() -> Self {
        Self::new(10, 50.0)
    }
}

impl Operator for Allpass {
    fn name(&self) -> &str {
        "Allpass filter"
    }

    fn keyword(&self) -> &str {
        "efa"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("delay-samples,feedback-%")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.delay = delay_from(value),
            2 => self.feedback_percent = value,
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.delay as f32,
            2 => self.feedback_percent,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => count_descriptor(desc, 10.0, 1.0),
            2 => *desc = desc.with_default(50.0).bounded(0.0, 100.0),
            _ => {}
        }
    }
}

impl ChainOperator for Allpass {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.inputs.clear();
        self.outputs.clear();
        fit_lines(&mut self.inputs, buffer.channel_count(), self.delay);
        fit_lines(&mut self.outputs, buffer.channel_count(), self.delay);
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        let channels = buffer.channel_count();
        fit_lines(&mut self.inputs, channels, self.delay);
        fit_lines(&mut self.outputs, channels, self.delay);
        let g = self.gain();
        let d = self.delay;
        for ((channel, xs), ys) in buffer
            .channels_mut()
            .zip(self.inputs.iter_mut())
            .zip(self.outputs.iter_mut())
        {
            for sample in channel.iter_mut() {
                let x = *sample;
                let y = -g * x + xs.read(d, x) + g * ys.read(d, 0.0);
                xs.push(x);
                ys.push(y);
                *sample = y;
            }
        }
    }

    fn release(&mut self) {
        self.inputs.clear();
        self.outputs.clear();
    }
}

/// Feedback comb: `y[n] = x[n] + R^D·y[n-D]`.
///
/// Peaks sit at multiples of `rate / D`. A radius of 1 would ring forever,
/// so the loop gain is held just below 1.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | delay-samples | ≥ 1, integer | 1 |
/// | 2 | radius | 0.0–1.0 | 1.0 |
#[derive(Debug, Clone)]
pub struct CombFilter {
    delay: usize,
    radius: f32,
    lines: Vec<DelayLine>,
}

impl CombFilter {
    /// Creates a feedback comb.
    pub fn new(delay: usize, radius: f32) -> Self {
        Self {
            delay: delay.clamp(1, MAX_DELAY_SAMPLES),
            radius,
            lines: Vec::new(),
        }
    }

    fn gain(&self) -> f32 {
        libm::powf(self.radius.clamp(0.0, 1.0), self.delay as f32).min(MAX_COMB_GAIN)
    }
}

impl Default for CombFilter {
    fn default() -> Self {
        Self::new(1, 1.0)
    }
}

impl Operator for CombFilter {
    fn name(&self) -> &str {
        "Comb filter"
    }

    fn keyword(&self) -> &str {
        "efc"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("delay-samples,radius")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.delay = delay_from(value),
            2 => self.radius = value,
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.delay as f32,
            2 => self.radius,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => count_descriptor(desc, 1.0, 1.0),
            2 => radius_descriptor(desc),
            _ => {}
        }
    }
}

impl ChainOperator for CombFilter {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.lines.clear();
        fit_lines(&mut self.lines, buffer.channel_count(), self.delay);
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        fit_lines(&mut self.lines, buffer.channel_count(), self.delay);
        let g = self.gain();
        let d = self.delay;
        for (channel, line) in buffer.channels_mut().zip(self.lines.iter_mut()) {
            for sample in channel.iter_mut() {
                let y = *sample + g * line.read(d, 0.0);
                line.push(y);
                *sample = y;
            }
        }
    }

    fn release(&mut self) {
        self.lines.clear();
    }
}

/// Feed-forward (inverse) comb: `y[n] = x[n] - R^D·x[n-D]`.
///
/// Notches sit at multiples of `rate / D`; at radius 1 they are complete.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | delay-samples | ≥ 1, integer | 10 |
/// | 2 | radius | 0.0–1.0 | 1.0 |
#[derive(Debug, Clone)]
pub struct InverseCombFilter {
    delay: usize,
    radius: f32,
    lines: Vec<DelayLine>,
}

impl InverseCombFilter {
    /// Creates an inverse comb.
    pub fn new(delay: usize, radius: f32) -> Self {
        Self {
            delay: delay.clamp(1, MAX_DELAY_SAMPLES),
            radius,
            lines: Vec::new(),
        }
    }

    fn gain(&self) -> f32 {
        libm::powf(self.radius.clamp(0.0, 1.0), self.delay as f32)
    }
}

impl Default for InverseCombFilter {
    fn default() -> Self {
        Self::new(10, 1.0)
    }
}

impl Operator for InverseCombFilter {
    fn name(&self) -> &str {
        "Inverse comb filter"
    }

    fn keyword(&self) -> &str {
        "efi"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("delay-samples,radius")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.delay = delay_from(value),
            2 => self.radius = value,
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.delay as f32,
            2 => self.radius,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => count_descriptor(desc, 10.0, 1.0),
            2 => radius_descriptor(desc),
            _ => {}
        }
    }
}

impl ChainOperator for InverseCombFilter {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.lines.clear();
        fit_lines(&mut self.lines, buffer.channel_count(), self.delay);
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        fit_lines(&mut self.lines, buffer.channel_count(), self.delay);
        let g = self.gain();
        let d = self.delay;
        for (channel, line) in buffer.channels_mut().zip(self.lines.iter_mut()) {
            for sample in channel.iter_mut() {
                let x = *sample;
                *sample = x - g * line.read(d, 0.0);
                line.push(x);
            }
        }
    }

    fn release(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(frames: usize) -> SampleBuffer {
        let mut buf = SampleBuffer::new(1, frames, 1000);
        buf.channel_mut(0)[0] = 1.0;
        buf
    }

    #[test]
    fn test_inverse_comb_subtracts_delayed_copy() {
        let mut comb = InverseCombFilter::new(3, 1.0);
        let mut buf = impulse(6);
        comb.init(&buf);
        comb.process(&mut buf);
        assert_eq!(buf.channel(0), &[1.0, 0.0, 0.0, -1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_inverse_comb_cancels_dc_at_full_radius() {
        let mut comb = InverseCombFilter::new(4, 1.0);
        let mut buf = SampleBuffer::new(1, 16, 1000);
        buf.channel_mut(0).fill(0.5);
        comb.init(&buf);
        comb.process(&mut buf);
        assert!(buf.channel(0)[4..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_comb_repeats_with_radius_decay() {
        let mut comb = CombFilter::new(2, 0.5);
        let mut buf = impulse(7);
        comb.init(&buf);
        comb.process(&mut buf);
        // R^D = 0.25
        assert_eq!(buf.channel(0), &[1.0, 0.0, 0.25, 0.0, 0.0625, 0.0, 0.015625]);
    }

    #[test]
    fn test_comb_full_radius_decays() {
        let mut comb = CombFilter::default();
        let mut buf = impulse(10_000);
        comb.init(&buf);
        comb.process(&mut buf);
        let last = buf.channel(0)[9999];
        assert!(last > 0.0 && last < 0.01, "{last}");
    }

    #[test]
    fn test_allpass_preserves_energy() {
        let mut ap = Allpass::new(5, 70.0);
        let mut buf = impulse(4000);
        ap.init(&buf);
        ap.process(&mut buf);
        let energy: f32 = buf.channel(0).iter().map(|s| s * s).sum();
        assert!((energy - 1.0).abs() < 1e-3, "{energy}");
        assert!((buf.channel(0)[0] + 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_delay_is_clamped() {
        let mut comb = CombFilter::default();
        comb.set_parameter(1, 0.0);
        assert_eq!(comb.get_parameter(1), 1.0);
        comb.set_parameter(1, 1e12);
        assert_eq!(comb.get_parameter(1), MAX_DELAY_SAMPLES as f32);
        assert!(Allpass::default().describe_parameter(1).unwrap().is_integer());
    }
}
