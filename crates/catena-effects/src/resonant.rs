//! Resonant filters: a two-pole bandpass, a four-pole resonant lowpass, an
//! analogue-style RC lowpass and an all-pole resonator.
//!
//! Unlike the Butterworth set in [`filter`](crate::filter), these filters
//! ring. The bandpass and resonator place a pole pair near the unit circle;
//! the lowpass filters expose resonance as a parameter.

use std::borrow::Cow;
use std::f32::consts::PI;

use catena_core::{ChainOperator, Operator, ParamDescriptor, ParamScale, SampleBuffer, param_names};
use libm::{acosf, cosf, expf, sinf, sqrtf, tanf, tanhf};

const DEFAULT_SAMPLE_RATE: u32 = 48000;

fn frequency_descriptor(desc: &mut ParamDescriptor, default: f32) {
    *desc = desc
        .with_default(default)
        .with_lower_bound(0.0)
        .with_scale(ParamScale::Logarithmic);
}

/// Keeps a frequency inside (0, Nyquist).
fn clamp_frequency(hz: f32, sample_rate: u32) -> f32 {
    hz.clamp(1.0, sample_rate as f32 * 0.49)
}

/// Two output samples of history per channel.
#[derive(Debug, Clone, Default)]
struct PoleHistory {
    y: Vec<[f32; 2]>,
}

impl PoleHistory {
    fn reset(&mut self, channels: usize) {
        self.y = vec![[0.0; 2]; channels];
    }

    fn fit(&mut self, channels: usize) {
        if self.y.len() < channels {
            self.y.resize(channels, [0.0; 2]);
        }
    }

    /// Runs `y = gain·x + b1·y[n-1] - b2·y[n-2]` over every channel.
    fn run(&mut self, buffer: &mut SampleBuffer, gain: f32, b1: f32, b2: f32) {
        self.fit(buffer.channel_count());
        for (channel, h) in buffer.channels_mut().zip(self.y.iter_mut()) {
            for sample in channel.iter_mut() {
                let y = gain * *sample + b1 * h[0] - b2 * h[1];
                *h = [y, h[0]];
                *sample = y;
            }
        }
    }
}

/// Two-pole resonant bandpass.
///
/// The pole radius is `1 - π·width/rate`, so narrower widths ring longer.
/// The gain is normalised so the peak at the center frequency is near unity.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | center-freq | > 0 Hz | 1000.0 |
/// | 2 | width | > 0 Hz | 1000.0 |
#[derive(Debug, Clone)]
pub struct ResonantBandpass {
    center: f32,
    width: f32,
    sample_rate: u32,
    gain: f32,
    b1: f32,
    b2: f32,
    history: PoleHistory,
}

impl ResonantBandpass {
    /// Creates a resonant bandpass.
    pub fn new(center: f32, width: f32) -> Self {
        let mut f = Self {
            center,
            width,
            sample_rate: DEFAULT_SAMPLE_RATE,
            gain: 1.0,
            b1: 0.0,
            b2: 0.0,
            history: PoleHistory::default(),
        };
        f.update();
        f
    }

    fn update(&mut self) {
        let rate = self.sample_rate as f32;
        let center = clamp_frequency(self.center, self.sample_rate);
        let width = clamp_frequency(self.width, self.sample_rate);
        let r = (1.0 - PI * width / rate).clamp(0.0, 0.9999);
        let c = r * r;
        let theta = 2.0 * PI * center / rate;
        let pole_angle = acosf(((2.0 * r) / (1.0 + c) * cosf(theta)).clamp(-1.0, 1.0));
        self.gain = (1.0 - c) * sinf(pole_angle);
        self.b1 = 2.0 * r * cosf(theta);
        self.b2 = c;
    }
}

impl Default for ResonantBandpass {
    fn default() -> Self {
        Self::new(1000.0, 1000.0)
    }
}

impl Operator for ResonantBandpass {
    fn name(&self) -> &str {
        "Resonant bandpass filter"
    }

    fn keyword(&self) -> &str {
        "ef1"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("center-freq,width")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.center = value,
            2 => self.width = value,
            _ => return,
        }
        self.update();
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.center,
            2 => self.width,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        if (1..=2).contains(&index) {
            frequency_descriptor(desc, 1000.0);
        }
    }
}

impl ChainOperator for ResonantBandpass {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.sample_rate = buffer.sample_rate().max(1);
        self.history.reset(buffer.channel_count());
        self.update();
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        self.history.run(buffer, self.gain, self.b1, self.b2);
    }

    fn release(&mut self) {
        self.history.y.clear();
    }
}

/// All-pole resonator.
///
/// Pole radius `exp(-π·width/rate)` at the center angle, scaled for unity
/// gain at the center frequency.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | center-freq | > 0 Hz | 1000.0 |
/// | 2 | width | > 0 Hz | 1000.0 |
#[derive(Debug, Clone)]
pub struct Resonator {
    center: f32,
    width: f32,
    sample_rate: u32,
    gain: f32,
    b1: f32,
    b2: f32,
    history: PoleHistory,
}

impl Resonator {
    /// Creates a resonator.
    pub fn new(center: f32, width: f32) -> Self {
        let mut f = Self {
            center,
            width,
            sample_rate: DEFAULT_SAMPLE_RATE,
            gain: 1.0,
            b1: 0.0,
            b2: 0.0,
            history: PoleHistory::default(),
        };
        f.update();
        f
    }

    fn update(&mut self) {
        let rate = self.sample_rate as f32;
        let center = clamp_frequency(self.center, self.sample_rate);
        let width = clamp_frequency(self.width, self.sample_rate);
        let r = expf(-PI * width / rate);
        let theta = 2.0 * PI * center / rate;
        self.b1 = 2.0 * r * cosf(theta);
        self.b2 = r * r;
        self.gain = (1.0 - r) * sqrtf(1.0 - 2.0 * r * cosf(2.0 * theta) + r * r);
    }
}

impl Default for Resonator {
    fn default() -> Self {
        Self::new(1000.0, 1000.0)
    }
}

impl Operator for Resonator {
    fn name(&self) -> &str {
        "Resonator filter"
    }

    fn keyword(&self) -> &str {
        "efs"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("center-freq,width")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.center = value,
            2 => self.width = value,
            _ => return,
        }
        self.update();
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.center,
            2 => self.width,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        if (1..=2).contains(&index) {
            frequency_descriptor(desc, 1000.0);
        }
    }
}

impl ChainOperator for Resonator {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.sample_rate = buffer.sample_rate().max(1);
        self.history.reset(buffer.channel_count());
        self.update();
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        self.history.run(buffer, self.gain, self.b1, self.b2);
    }

    fn release(&mut self) {
        self.history.y.clear();
    }
}

/// Normalised biquad `y = n0·x + n1·x1 + n2·x2 - d1·y1 - d2·y2`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Section {
    n0: f32,
    n1: f32,
    n2: f32,
    d1: f32,
    d2: f32,
}

impl Section {
    /// Bilinear transform of the analogue lowpass `1 / (1 + s·b1 + s²)`,
    /// prewarped so the cutoff lands at `cutoff` Hz.
    fn lowpass(b1: f32, cutoff: f32, sample_rate: f32) -> Self {
        let c = 1.0 / tanf(PI * cutoff / sample_rate);
        let d0 = 1.0 + b1 * c + c * c;
        Self {
            n0: 1.0 / d0,
            n1: 2.0 / d0,
            n2: 1.0 / d0,
            d1: 2.0 * (1.0 - c * c) / d0,
            d2: (1.0 - b1 * c + c * c) / d0,
        }
    }
}

/// x1, x2, y1, y2 of each section, per channel.
type SectionHistory = [[f32; 4]; 2];

/// Four-pole resonant lowpass built from two cascaded biquads.
///
/// The sections come from a fourth order Butterworth prototype; resonance
/// divides the damping of the first section, so values above 1 raise a peak
/// at the cutoff. The output is scaled by `gain`.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | cutoff-freq | > 0 Hz | 1000.0 |
/// | 2 | resonance | ≥ 0.1 | 1.0 |
/// | 3 | gain | ≥ 0 | 1.0 |
#[derive(Debug, Clone)]
pub struct ResonantLowpass {
    cutoff: f32,
    resonance: f32,
    gain: f32,
    sample_rate: u32,
    sections: [Section; 2],
    history: Vec<SectionHistory>,
}

/// Damping terms of the two Butterworth sections.
const PROTOTYPE_DAMPING: [f32; 2] = [0.765367, 1.847759];

impl ResonantLowpass {
    /// Creates a resonant lowpass.
    pub fn new(cutoff: f32, resonance: f32, gain: f32) -> Self {
        let mut f = Self {
            cutoff,
            resonance,
            gain,
            sample_rate: DEFAULT_SAMPLE_RATE,
            sections: [Section::default(); 2],
            history: Vec::new(),
        };
        f.update();
        f
    }

    fn update(&mut self) {
        let rate = self.sample_rate as f32;
        let cutoff = clamp_frequency(self.cutoff, self.sample_rate);
        let q = self.resonance.max(0.1);
        self.sections = [
            Section::lowpass(PROTOTYPE_DAMPING[0] / q, cutoff, rate),
            Section::lowpass(PROTOTYPE_DAMPING[1], cutoff, rate),
        ];
    }
}

impl Default for ResonantLowpass {
    fn default() -> Self {
        Self::new(1000.0, 1.0, 1.0)
    }
}

impl Operator for ResonantLowpass {
    fn name(&self) -> &str {
        "Resonant lowpass filter"
    }

    fn keyword(&self) -> &str {
        "ef3"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("cutoff-freq,resonance,gain")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.cutoff = value,
            2 => self.resonance = value,
            3 => self.gain = value,
            _ => return,
        }
        self.update();
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.cutoff,
            2 => self.resonance,
            3 => self.gain,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => frequency_descriptor(desc, 1000.0),
            2 => *desc = desc.with_default(1.0).with_lower_bound(0.1),
            3 => *desc = desc.with_default(1.0).with_lower_bound(0.0),
            _ => {}
        }
    }
}

impl ChainOperator for ResonantLowpass {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.sample_rate = buffer.sample_rate().max(1);
        self.history = vec![[[0.0; 4]; 2]; buffer.channel_count()];
        self.update();
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        if self.history.len() < buffer.channel_count() {
            self.history.resize(buffer.channel_count(), [[0.0; 4]; 2]);
        }
        let sections = self.sections;
        let gain = self.gain;
        for (channel, h) in buffer.channels_mut().zip(self.history.iter_mut()) {
            for sample in channel.iter_mut() {
                let mut x = *sample;
                for (s, h) in sections.iter().zip(h.iter_mut()) {
                    let y = s.n0 * x + s.n1 * h[0] + s.n2 * h[1] - s.d1 * h[2] - s.d2 * h[3];
                    *h = [x, h[0], y, h[2]];
                    x = y;
                }
                *sample = x * gain;
            }
        }
    }

    fn release(&mut self) {
        self.history.clear();
    }
}

/// Per-channel state of [`RcLowpass`].
#[derive(Debug, Clone, Copy, Default)]
struct RcStage {
    lp1: f32,
    lp2: f32,
    lp3: f32,
    hp1: f32,
    feedback: f32,
}

/// Simulation of a third order active RC lowpass, as found in older analogue
/// synthesisers.
///
/// Three one-pole stages share the normalised `cutoff` coefficient. The
/// output is fed back through a DC-blocking highpass and a `tanh` soft
/// clipper, so high resonance makes the filter self-oscillate without
/// digital clipping.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | cutoff-freq | 0.0–1.0 | 0.25 |
/// | 2 | resonance | ≥ 0 | 1.0 |
#[derive(Debug, Clone)]
pub struct RcLowpass {
    cutoff: f32,
    resonance: f32,
    stages: Vec<RcStage>,
}

/// Coefficient of the one-pole that tracks DC in the feedback path.
const RC_DC_TRACK: f32 = 0.01;

impl RcLowpass {
    /// Creates an RC lowpass. `cutoff` is a 0–1 coefficient.
    pub fn new(cutoff: f32, resonance: f32) -> Self {
        Self {
            cutoff,
            resonance,
            stages: Vec::new(),
        }
    }
}

impl Default for RcLowpass {
    fn default() -> Self {
        Self::new(0.25, 1.0)
    }
}

impl Operator for RcLowpass {
    fn name(&self) -> &str {
        "RC-lowpass filter"
    }

    fn description(&self) -> &str {
        "Analogue style 3rd order lowpass with self-oscillating resonance."
    }

    fn keyword(&self) -> &str {
        "ef4"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("cutoff-freq,resonance")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.cutoff = value,
            2 => self.resonance = value,
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.cutoff,
            2 => self.resonance,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => *desc = desc.with_default(0.25).bounded(0.0, 1.0),
            2 => *desc = desc.with_default(1.0).with_lower_bound(0.0),
            _ => {}
        }
    }
}

impl ChainOperator for RcLowpass {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.stages = vec![RcStage::default(); buffer.channel_count()];
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        if self.stages.len() < buffer.channel_count() {
            self.stages.resize(buffer.channel_count(), RcStage::default());
        }
        let k = self.cutoff.clamp(0.0, 1.0);
        let resonance = self.resonance.max(0.0);
        for (channel, st) in buffer.channels_mut().zip(self.stages.iter_mut()) {
            for sample in channel.iter_mut() {
                let input = *sample - resonance * st.feedback;
                st.lp1 += k * (input - st.lp1);
                st.lp2 += k * (st.lp1 - st.lp2);
                st.lp3 += k * (st.lp2 - st.lp3);
                st.hp1 += RC_DC_TRACK * (st.lp3 - st.hp1);
                st.feedback = tanhf(st.lp3 - st.hp1);
                *sample = st.lp3;
            }
        }
    }

    fn release(&mut self) {
        self.stages.clear();
    }
}
