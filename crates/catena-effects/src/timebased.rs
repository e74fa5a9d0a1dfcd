//! Delay-line effects: echo, multi-tap delay, fake stereo and a feedback
//! reverb.
//!
//! Delay times are given in milliseconds and converted to samples with the
//! sample rate seen at init. Lines grow when a longer delay is requested at
//! runtime; growing clears the line.

use std::borrow::Cow;

use catena_core::{ChainOperator, Operator, ParamDescriptor, ParamFlags, SampleBuffer, param_names};

const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Longest delay line any operator allocates, in samples per channel.
pub const MAX_DELAY_SAMPLES: usize = 1 << 22;

/// Circular history of one channel.
#[derive(Debug, Clone, Default)]
pub(crate) struct DelayLine {
    data: Vec<f32>,
    /// Index of the most recent sample.
    pos: usize,
}

impl DelayLine {
    /// Makes sure delays up to `max_delay` samples can be read.
    pub(crate) fn reserve(&mut self, max_delay: usize) {
        if self.data.len() < max_delay.max(1) {
            self.data = vec![0.0; max_delay.max(1)];
            self.pos = 0;
        }
    }

    /// Sample pushed `delay` pushes ago; `current` when the delay is zero.
    pub(crate) fn read(&self, delay: usize, current: f32) -> f32 {
        if delay == 0 || self.data.is_empty() {
            return current;
        }
        let len = self.data.len();
        let back = (delay - 1) % len;
        self.data[(self.pos + len - back) % len]
    }

    /// Linear interpolation between the samples `delay` and `delay + 1`
    /// pushes ago, for delays that move smoothly.
    pub(crate) fn read_fractional(&self, delay: f32) -> f32 {
        let whole = delay.max(1.0);
        let base = whole as usize;
        let frac = whole - base as f32;
        let a = self.read(base, 0.0);
        let b = self.read(base + 1, a);
        a + (b - a) * frac
    }

    pub(crate) fn push(&mut self, sample: f32) {
        if self.data.is_empty() {
            return;
        }
        self.pos = (self.pos + 1) % self.data.len();
        self.data[self.pos] = sample;
    }

    pub(crate) fn clear(&mut self) {
        self.data.fill(0.0);
    }
}

pub(crate) fn ms_to_samples(ms: f32, sample_rate: u32) -> usize {
    ((ms.max(0.0) * sample_rate as f32 / 1000.0) as usize).min(MAX_DELAY_SAMPLES)
}

pub(crate) fn time_descriptor(desc: &mut ParamDescriptor, default: f32) {
    *desc = desc.with_default(default).with_lower_bound(0.0);
}

pub(crate) fn mix_descriptor(desc: &mut ParamDescriptor, default: f32) {
    *desc = desc.with_default(default).bounded(0.0, 100.0);
}

pub(crate) fn count_descriptor(desc: &mut ParamDescriptor, default: f32, lower: f32) {
    *desc = desc
        .with_default(default)
        .with_lower_bound(lower)
        .with_flags(ParamFlags::INTEGER);
}

/// How [`Delay`] and [`Reverb`] route echoes between the first two channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurroundMode {
    /// Each channel echoes itself
    #[default]
    Normal,
    /// Odd echoes come from the opposite channel
    Surround,
    /// A mono sum bounces between left and right
    PingPong,
}

impl SurroundMode {
    fn from_value(value: f32) -> Self {
        match value.round() as i32 {
            1 => Self::Surround,
            2 => Self::PingPong,
            _ => Self::Normal,
        }
    }

    fn partner(channel: usize, channels: usize) -> usize {
        let other = channel ^ 1;
        if other < channels { other } else { channel }
    }
}

/// Echo with up to N repeats.
///
/// Each output sample is `dry · (1 - mix) + mix · avg(echo_1..echo_N)` where
/// echo `k` is the input delayed by `k · delay-time`.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | delay-time-msec | ≥ 0 | 100.0 |
/// | 2 | surround-mode | 0, 1, 2 | 0 |
/// | 3 | number-of-delays | ≥ 1, integer | 1 |
/// | 4 | mix-% | 0.0–100.0 | 50.0 |
#[derive(Debug, Clone)]
pub struct Delay {
    delay_ms: f32,
    mode_value: f32,
    mode: SurroundMode,
    delays: usize,
    mix_percent: f32,
    sample_rate: u32,
    lines: Vec<DelayLine>,
    mono: DelayLine,
    frame: Vec<f32>,
}

impl Delay {
    /// Creates a delay.
    pub fn new(delay_ms: f32, mode: f32, delays: usize, mix_percent: f32) -> Self {
        Self {
            delay_ms,
            mode_value: mode,
            mode: SurroundMode::from_value(mode),
            delays: delays.max(1),
            mix_percent,
            sample_rate: DEFAULT_SAMPLE_RATE,
            lines: Vec::new(),
            mono: DelayLine::default(),
            frame: Vec::new(),
        }
    }

    /// Routing currently in effect.
    pub fn mode(&self) -> SurroundMode {
        self.mode
    }

    fn delay_samples(&self) -> usize {
        ms_to_samples(self.delay_ms, self.sample_rate)
    }

    fn reserve(&mut self) {
        let longest = self.delay_samples() * self.delays;
        for line in &mut self.lines {
            line.reserve(longest);
        }
        self.mono.reserve(longest);
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::new(100.0, 0.0, 1, 50.0)
    }
}

impl Operator for Delay {
    fn name(&self) -> &str {
        "Delay"
    }

    fn description(&self) -> &str {
        "Echo with optional stereo routing."
    }

    fn keyword(&self) -> &str {
        "etd"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("delay-time-msec,surround-mode,number-of-delays,mix-%")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.delay_ms = value,
            2 => {
                self.mode_value = value;
                self.mode = SurroundMode::from_value(value);
            }
            3 => self.delays = value.max(1.0) as usize,
            4 => self.mix_percent = value,
            _ => return,
        }
        if !self.lines.is_empty() {
            self.reserve();
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.delay_ms,
            2 => self.mode_value,
            3 => self.delays as f32,
            4 => self.mix_percent,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => time_descriptor(desc, 100.0),
            2 => {
                *desc = desc
                    .with_default(0.0)
                    .bounded(0.0, 2.0)
                    .with_flags(ParamFlags::INTEGER);
            }
            3 => count_descriptor(desc, 1.0, 1.0),
            4 => mix_descriptor(desc, 50.0),
            _ => {}
        }
    }
}

impl ChainOperator for Delay {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.sample_rate = buffer.sample_rate();
        self.lines = vec![DelayLine::default(); buffer.channel_count().max(2)];
        self.mono = DelayLine::default();
        self.reserve();
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        let channels = buffer.channel_count();
        if self.lines.len() < channels {
            self.lines.resize(channels, DelayLine::default());
            self.reserve();
        }
        let step = self.delay_samples();
        let mix = self.mix_percent / 100.0;
        let scale = 1.0 / self.delays as f32;

        for n in 0..buffer.frame_count() {
            self.frame.clear();
            self.frame.extend(buffer.channels().map(|ch| ch[n]));
            let mono_in = self.frame.iter().sum::<f32>() / channels.max(1) as f32;

            for (c, &dry) in self.frame.iter().enumerate() {
                let mut wet = 0.0;
                for k in 1..=self.delays {
                    wet += match self.mode {
                        SurroundMode::Normal => self.lines[c].read(k * step, dry),
                        SurroundMode::Surround if k % 2 == 1 => {
                            let other = SurroundMode::partner(c, channels);
                            self.lines[other].read(k * step, self.frame[other])
                        }
                        SurroundMode::Surround => self.lines[c].read(k * step, dry),
                        SurroundMode::PingPong if (k - 1) % 2 == c % 2 => {
                            self.mono.read(k * step, mono_in)
                        }
                        SurroundMode::PingPong => 0.0,
                    };
                }
                buffer.channel_mut(c)[n] = dry * (1.0 - mix) + wet * scale * mix;
            }

            for (line, &x) in self.lines.iter_mut().zip(&self.frame) {
                line.push(x);
            }
            self.mono.push(mono_in);
        }
    }

    fn output_channels(&self, _input_channels: usize) -> usize {
        2
    }

    fn release(&mut self) {
        self.lines.clear();
        self.mono = DelayLine::default();
    }
}

/// Per-channel multi-tap delay.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | delay-time-msec | ≥ 0 | 100.0 |
/// | 2 | number-of-delays | ≥ 1, integer | 1 |
/// | 3 | mix-% | 0.0–100.0 | 50.0 |
#[derive(Debug, Clone)]
pub struct MultitapDelay {
    delay_ms: f32,
    delays: usize,
    mix_percent: f32,
    sample_rate: u32,
    lines: Vec<DelayLine>,
}

impl MultitapDelay {
    /// Creates a multi-tap delay.
    pub fn new(delay_ms: f32, delays: usize, mix_percent: f32) -> Self {
        Self {
            delay_ms,
            delays: delays.max(1),
            mix_percent,
            sample_rate: DEFAULT_SAMPLE_RATE,
            lines: Vec::new(),
        }
    }

    fn reserve(&mut self) {
        let longest = ms_to_samples(self.delay_ms, self.sample_rate) * self.delays;
        for line in &mut self.lines {
            line.reserve(longest);
        }
    }
}

impl Default for MultitapDelay {
    fn default() -> Self {
        Self::new(100.0, 1, 50.0)
    }
}

impl Operator for MultitapDelay {
    fn name(&self) -> &str {
        "Multitap delay"
    }

    fn keyword(&self) -> &str {
        "etm"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("delay-time-msec,number-of-delays,mix-%")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.delay_ms = value,
            2 => self.delays = value.max(1.0) as usize,
            3 => self.mix_percent = value,
            _ => return,
        }
        self.reserve();
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.delay_ms,
            2 => self.delays as f32,
            3 => self.mix_percent,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => time_descriptor(desc, 100.0),
            2 => count_descriptor(desc, 1.0, 1.0),
            3 => mix_descriptor(desc, 50.0),
            _ => {}
        }
    }
}

impl ChainOperator for MultitapDelay {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.sample_rate = buffer.sample_rate();
        self.lines = vec![DelayLine::default(); buffer.channel_count()];
        self.reserve();
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        if self.lines.len() < buffer.channel_count() {
            self.lines.resize(buffer.channel_count(), DelayLine::default());
            self.reserve();
        }
        let step = ms_to_samples(self.delay_ms, self.sample_rate);
        let mix = self.mix_percent / 100.0;
        let scale = 1.0 / self.delays as f32;

        for (channel, line) in buffer.channels_mut().zip(self.lines.iter_mut()) {
            for sample in channel.iter_mut() {
                let dry = *sample;
                let wet: f32 = (1..=self.delays).map(|k| line.read(k * step, dry)).sum();
                line.push(dry);
                *sample = dry * (1.0 - mix) + wet * scale * mix;
            }
        }
    }

    fn release(&mut self) {
        self.lines.clear();
    }
}

/// Widens a mono signal by delaying a copy into the right channel.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | delay-time-msec | ≥ 0 | 20.0 |
#[derive(Debug, Clone)]
pub struct FakeStereo {
    delay_ms: f32,
    sample_rate: u32,
    input_channels: usize,
    line: DelayLine,
}

impl FakeStereo {
    /// Creates a fake-stereo widener.
    pub fn new(delay_ms: f32) -> Self {
        Self {
            delay_ms,
            sample_rate: DEFAULT_SAMPLE_RATE,
            input_channels: 1,
            line: DelayLine::default(),
        }
    }
}

impl Default for FakeStereo {
    fn default() -> Self {
        Self::new(20.0)
    }
}

impl Operator for FakeStereo {
    fn name(&self) -> &str {
        "Fake stereo"
    }

    fn keyword(&self) -> &str {
        "etf"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("delay-time-msec")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == 1 {
            self.delay_ms = value;
            self.line.reserve(ms_to_samples(self.delay_ms, self.sample_rate));
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.delay_ms,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        if index == 1 {
            time_descriptor(desc, 20.0);
        }
    }
}

impl ChainOperator for FakeStereo {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.sample_rate = buffer.sample_rate();
        self.input_channels = buffer.channel_count().max(1);
        self.line = DelayLine::default();
        self.line.reserve(ms_to_samples(self.delay_ms, self.sample_rate));
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        let delay = ms_to_samples(self.delay_ms, self.sample_rate);
        let stereo_input = self.input_channels >= 2;
        let Some((left, right)) = buffer.channel_pair_mut(0, 1) else {
            return;
        };
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mono = if stereo_input { (*l + *r) * 0.5 } else { *l };
            let delayed = self.line.read(delay, mono);
            self.line.push(mono);
            *l = mono;
            *r = delayed;
        }
    }

    fn output_channels(&self, _input_channels: usize) -> usize {
        2
    }

    fn release(&mut self) {
        self.line = DelayLine::default();
    }
}

/// Single feedback comb per channel.
///
/// `y[n] = x[n] + feedback · y[n - d]`. In surround mode the feedback path
/// crosses over to the opposite channel.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | delay-time | ≥ 0 ms | 20.0 |
/// | 2 | surround-mode | 0, 1 | 0 |
/// | 3 | feedback-% | 0.0–100.0 | 50.0 |
#[derive(Debug, Clone)]
pub struct Reverb {
    delay_ms: f32,
    surround: bool,
    feedback_percent: f32,
    sample_rate: u32,
    lines: Vec<DelayLine>,
    frame: Vec<f32>,
}

impl Reverb {
    /// Creates a comb reverb.
    pub fn new(delay_ms: f32, surround: bool, feedback_percent: f32) -> Self {
        Self {
            delay_ms,
            surround,
            feedback_percent,
            sample_rate: DEFAULT_SAMPLE_RATE,
            lines: Vec::new(),
            frame: Vec::new(),
        }
    }

    fn reserve(&mut self) {
        let delay = ms_to_samples(self.delay_ms, self.sample_rate);
        for line in &mut self.lines {
            line.reserve(delay);
        }
    }
}

impl Default for Reverb {
    fn default() -> Self {
        Self::new(20.0, false, 50.0)
    }
}

impl Operator for Reverb {
    fn name(&self) -> &str {
        "Reverb"
    }

    fn keyword(&self) -> &str {
        "etr"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("delay-time,surround-mode,feedback-%")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.delay_ms = value,
            2 => self.surround = value != 0.0,
            3 => self.feedback_percent = value,
            _ => return,
        }
        self.reserve();
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.delay_ms,
            2 => {
                if self.surround {
                    1.0
                } else {
                    0.0
                }
            }
            3 => self.feedback_percent,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => time_descriptor(desc, 20.0),
            2 => {
                *desc = desc
                    .with_default(0.0)
                    .bounded(0.0, 1.0)
                    .with_flags(ParamFlags::TOGGLED.union(ParamFlags::INTEGER));
            }
            3 => mix_descriptor(desc, 50.0),
            _ => {}
        }
    }
}

impl ChainOperator for Reverb {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.sample_rate = buffer.sample_rate();
        self.lines = vec![DelayLine::default(); buffer.channel_count().max(2)];
        self.reserve();
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        let channels = buffer.channel_count();
        if self.lines.len() < channels {
            self.lines.resize(channels, DelayLine::default());
            self.reserve();
        }
        let delay = ms_to_samples(self.delay_ms, self.sample_rate).max(1);
        let feedback = self.feedback_percent / 100.0;

        for n in 0..buffer.frame_count() {
            self.frame.clear();
            for c in 0..channels {
                let source = if self.surround {
                    SurroundMode::partner(c, channels)
                } else {
                    c
                };
                let x = buffer.channel(c)[n];
                self.frame.push(x + feedback * self.lines[source].read(delay, 0.0));
            }
            for (c, &y) in self.frame.iter().enumerate() {
                self.lines[c].push(y);
                buffer.channel_mut(c)[n] = y;
            }
        }
    }

    fn output_channels(&self, _input_channels: usize) -> usize {
        2
    }

    fn release(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
        self.lines.clear();
    }
}
