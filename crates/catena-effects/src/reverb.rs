//! Multi-tap room reverb.
//!
//! # Algorithm
//!
//! Every channel owns a 65536-sample ring. Each input sample is written to the
//! ring together with the previous (filtered) reverb output, then 64 taps are
//! summed:
//!
//! - Tap 0 sits at `room-size · sample_rate / 333` samples with gain 0.035.
//! - Each later tap adds a pseudo-random 0..511 sample offset and scales the
//!   previous gain by `1 - 1 / (feedback · 1000)`.
//!
//! The tap sum passes through a slow one-pole high-pass (offset removal) and a
//! gentle one-pole low-pass (wall absorption) before being mixed with 80% of
//! the dry signal.
//!
//! Tap offsets come from a fixed-seed `fastrand` generator, so two instances
//! with the same parameters sound identical.

use std::borrow::Cow;

use catena_core::{ChainOperator, Operator, ParamDescriptor, SampleBuffer, param_names};

const TAPS: usize = 64;
const RING_SIZE: usize = 1 << 16;
const RING_MASK: usize = RING_SIZE - 1;
const TAP_SEED: u64 = 0x0EC4_5EED;
const FIRST_TAP_GAIN: f32 = 0.035;
const DRY_LEVEL: f32 = 0.8;

#[derive(Debug, Clone)]
struct ReverbChannel {
    ring: Vec<f32>,
    pos: usize,
    offsets: [usize; TAPS],
    gains: [f32; TAPS],
    feedback_state: f32,
    dc_state: f32,
}

impl ReverbChannel {
    fn new() -> Self {
        Self {
            ring: vec![0.0; RING_SIZE],
            pos: 0,
            offsets: [0; TAPS],
            gains: [0.0; TAPS],
            feedback_state: 0.0,
            dc_state: 0.0,
        }
    }

    fn process(&mut self, input: f32, wet: f32) -> f32 {
        self.pos = (self.pos + 1) & RING_MASK;
        self.ring[self.pos] = input + self.feedback_state;

        let mut sum = 0.0;
        for (&offset, &gain) in self.offsets.iter().zip(&self.gains) {
            sum += self.ring[self.pos.wrapping_sub(offset) & RING_MASK] * gain;
        }

        self.dc_state = self.dc_state * 0.99 + sum * 0.01;
        let sum = sum - self.dc_state;

        self.feedback_state = self.feedback_state * 0.75 + sum * 0.25;
        self.feedback_state * wet + input * DRY_LEVEL
    }
}

/// Dense multi-tap reverb with damping.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | room-size | ≥ 0 (meters) | 10.0 |
/// | 2 | feedback-% | 0.0–100.0 | 100.0 |
/// | 3 | wet-% | 0.0–100.0 | 100.0 |
///
/// Feedback below 0.1% is treated as 0.1%, which keeps tap gains in [0, 1].
#[derive(Debug, Clone)]
pub struct AdvancedReverb {
    room_size: f32,
    feedback_percent: f32,
    wet_percent: f32,
    sample_rate: u32,
    channels: Vec<ReverbChannel>,
}

impl AdvancedReverb {
    /// Creates a reverb.
    pub fn new(room_size: f32, feedback_percent: f32, wet_percent: f32) -> Self {
        Self {
            room_size,
            feedback_percent,
            wet_percent,
            sample_rate: 48000,
            channels: Vec::new(),
        }
    }

    fn feedback(&self) -> f32 {
        (self.feedback_percent / 100.0).max(0.001)
    }

    /// Lays out taps on every channel and rewinds the rings.
    fn place_taps(&mut self) {
        let first = (self.room_size.max(0.0) * self.sample_rate as f32 / 333.0) as usize;
        let decay = 1.0 - 1.0 / self.feedback() / 1000.0;
        let mut rng = fastrand::Rng::with_seed(TAP_SEED);

        for channel in &mut self.channels {
            channel.pos = 0;
            channel.offsets[0] = first;
            channel.gains[0] = FIRST_TAP_GAIN;
            for i in 1..TAPS {
                channel.offsets[i] = channel.offsets[i - 1] + rng.usize(0..512);
                channel.gains[i] = channel.gains[i - 1] * decay;
            }
        }
    }
}

impl Default for AdvancedReverb {
    fn default() -> Self {
        Self::new(10.0, 100.0, 100.0)
    }
}

impl Operator for AdvancedReverb {
    fn name(&self) -> &str {
        "Advanced reverb"
    }

    fn description(&self) -> &str {
        "Room simulation from 64 scattered reflections."
    }

    fn keyword(&self) -> &str {
        "ete"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("room-size,feedback-%,wet-%")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.room_size = value,
            2 => self.feedback_percent = value,
            3 => {
                self.wet_percent = value;
                return;
            }
            _ => return,
        }
        self.place_taps();
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.room_size,
            2 => self.feedback_percent,
            3 => self.wet_percent,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => *desc = desc.with_default(10.0).with_lower_bound(0.0),
            2 | 3 => *desc = desc.with_default(100.0).bounded(0.0, 100.0),
            _ => {}
        }
    }
}

impl ChainOperator for AdvancedReverb {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.sample_rate = buffer.sample_rate();
        self.channels = vec![ReverbChannel::new(); buffer.channel_count()];
        self.place_taps();
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        if self.channels.len() < buffer.channel_count() {
            self.channels.resize_with(buffer.channel_count(), ReverbChannel::new);
            self.place_taps();
        }
        let wet = self.wet_percent / 100.0;
        for (samples, channel) in buffer.channels_mut().zip(self.channels.iter_mut()) {
            for sample in samples.iter_mut() {
                *sample = channel.process(*sample, wet);
            }
        }
    }

    fn release(&mut self) {
        self.channels.clear();
    }
}
