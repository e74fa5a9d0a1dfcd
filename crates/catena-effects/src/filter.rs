//! Second order Butterworth filters.
//!
//! Coefficients follow the classic SPKit formulation. Every filter runs the
//! same difference equation
//!
//! ```text
//! y[n] = a0·x[n] + a1·x[n-1] + a2·x[n-2] - b1·y[n-1] - b2·y[n-2]
//! ```
//!
//! with per-channel history, so one instance can filter any number of
//! channels. Frequencies are clamped just below Nyquist before the
//! coefficients are computed.

use std::borrow::Cow;
use std::f32::consts::{PI, SQRT_2};

use catena_core::{ChainOperator, Operator, ParamDescriptor, ParamScale, SampleBuffer, param_names};
use libm::{cosf, tanf};

const DEFAULT_SAMPLE_RATE: u32 = 48000;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    a0: f32,
    a1: f32,
    a2: f32,
    b1: f32,
    b2: f32,
}

impl Coefficients {
    const PASS: Self = Self {
        a0: 1.0,
        a1: 0.0,
        a2: 0.0,
        b1: 0.0,
        b2: 0.0,
    };

    fn lowpass(cutoff: f32, sample_rate: f32) -> Self {
        let c = 1.0 / tanf(PI * cutoff / sample_rate);
        let a0 = 1.0 / (1.0 + SQRT_2 * c + c * c);
        Self {
            a0,
            a1: 2.0 * a0,
            a2: a0,
            b1: 2.0 * (1.0 - c * c) * a0,
            b2: (1.0 - SQRT_2 * c + c * c) * a0,
        }
    }

    fn highpass(cutoff: f32, sample_rate: f32) -> Self {
        let c = tanf(PI * cutoff / sample_rate);
        let a0 = 1.0 / (1.0 + SQRT_2 * c + c * c);
        Self {
            a0,
            a1: -2.0 * a0,
            a2: a0,
            b1: 2.0 * (c * c - 1.0) * a0,
            b2: (1.0 - SQRT_2 * c + c * c) * a0,
        }
    }

    fn bandpass(center: f32, width: f32, sample_rate: f32) -> Self {
        let c = 1.0 / tanf(PI * width / sample_rate);
        let d = 2.0 * cosf(2.0 * PI * center / sample_rate);
        let a0 = 1.0 / (1.0 + c);
        Self {
            a0,
            a1: 0.0,
            a2: -a0,
            b1: -c * d * a0,
            b2: (c - 1.0) * a0,
        }
    }

    fn bandreject(center: f32, width: f32, sample_rate: f32) -> Self {
        let c = tanf(PI * width / sample_rate);
        let d = 2.0 * cosf(2.0 * PI * center / sample_rate);
        let a0 = 1.0 / (1.0 + c);
        Self {
            a0,
            a1: -d * a0,
            a2: a0,
            b1: -d * a0,
            b2: (1.0 - c) * a0,
        }
    }
}

/// x[n-1], x[n-2], y[n-1], y[n-2]
type History = [f32; 4];

/// Shared difference-equation engine.
#[derive(Debug, Clone)]
struct Butterworth {
    coefs: Coefficients,
    history: Vec<History>,
    sample_rate: u32,
}

impl Butterworth {
    fn new() -> Self {
        Self {
            coefs: Coefficients::PASS,
            history: Vec::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }

    fn rate(&self) -> f32 {
        self.sample_rate as f32
    }

    /// Keeps a frequency inside (0, Nyquist).
    fn clamp_frequency(&self, hz: f32) -> f32 {
        hz.clamp(1.0, self.rate() * 0.49)
    }

    fn init(&mut self, buffer: &SampleBuffer) {
        self.sample_rate = buffer.sample_rate().max(1);
        self.history = vec![[0.0; 4]; buffer.channel_count()];
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        if self.history.len() < buffer.channel_count() {
            self.history.resize(buffer.channel_count(), [0.0; 4]);
        }
        let Coefficients { a0, a1, a2, b1, b2 } = self.coefs;
        for (channel, h) in buffer.channels_mut().zip(self.history.iter_mut()) {
            for sample in channel.iter_mut() {
                let x = *sample;
                let y = a0 * x + a1 * h[0] + a2 * h[1] - b1 * h[2] - b2 * h[3];
                *h = [x, h[0], y, h[2]];
                *sample = y;
            }
        }
    }

    fn release(&mut self) {
        self.history.clear();
    }
}

fn frequency_descriptor(desc: &mut ParamDescriptor, default: f32) {
    *desc = desc
        .with_default(default)
        .with_lower_bound(0.0)
        .with_scale(ParamScale::Logarithmic);
}

macro_rules! impl_chain_operator {
    ($ty:ty) => {
        impl ChainOperator for $ty {
            fn init(&mut self, buffer: &SampleBuffer) {
                self.filter.init(buffer);
                self.update();
            }

            fn process(&mut self, buffer: &mut SampleBuffer) {
                self.filter.process(buffer);
            }

            fn release(&mut self) {
                self.filter.release();
            }
        }
    };
}

/// Butterworth lowpass.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | cutoff-freq | > 0 Hz | 1000.0 |
#[derive(Debug, Clone)]
pub struct Lowpass {
    cutoff: f32,
    filter: Butterworth,
}

impl Lowpass {
    /// Creates a lowpass at `cutoff` Hz.
    pub fn new(cutoff: f32) -> Self {
        let mut f = Self {
            cutoff,
            filter: Butterworth::new(),
        };
        f.update();
        f
    }

    fn update(&mut self) {
        let cutoff = self.filter.clamp_frequency(self.cutoff);
        self.filter.coefs = Coefficients::lowpass(cutoff, self.filter.rate());
    }
}

impl Default for Lowpass {
    fn default() -> Self {
        Self::new(1000.0)
    }
}

impl Operator for Lowpass {
    fn name(&self) -> &str {
        "Lowpass filter"
    }

    fn keyword(&self) -> &str {
        "efl"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("cutoff-freq")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == 1 {
            self.cutoff = value;
            self.update();
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.cutoff,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        if index == 1 {
            frequency_descriptor(desc, 1000.0);
        }
    }
}

impl_chain_operator!(Lowpass);

/// Butterworth highpass.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | cutoff-freq | > 0 Hz | 1000.0 |
#[derive(Debug, Clone)]
pub struct Highpass {
    cutoff: f32,
    filter: Butterworth,
}

impl Highpass {
    /// Creates a highpass at `cutoff` Hz.
    pub fn new(cutoff: f32) -> Self {
        let mut f = Self {
            cutoff,
            filter: Butterworth::new(),
        };
        f.update();
        f
    }

    fn update(&mut self) {
        let cutoff = self.filter.clamp_frequency(self.cutoff);
        self.filter.coefs = Coefficients::highpass(cutoff, self.filter.rate());
    }
}

impl Default for Highpass {
    fn default() -> Self {
        Self::new(1000.0)
    }
}

impl Operator for Highpass {
    fn name(&self) -> &str {
        "Highpass filter"
    }

    fn keyword(&self) -> &str {
        "efh"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("cutoff-freq")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == 1 {
            self.cutoff = value;
            self.update();
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.cutoff,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        if index == 1 {
            frequency_descriptor(desc, 1000.0);
        }
    }
}

impl_chain_operator!(Highpass);

/// Butterworth bandpass around a center frequency.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | center-freq | > 0 Hz | 1000.0 |
/// | 2 | width | > 0 Hz | 1000.0 |
#[derive(Debug, Clone)]
pub struct Bandpass {
    center: f32,
    width: f32,
    filter: Butterworth,
}

impl Bandpass {
    /// Creates a bandpass.
    pub fn new(center: f32, width: f32) -> Self {
        let mut f = Self {
            center,
            width,
            filter: Butterworth::new(),
        };
        f.update();
        f
    }

    fn update(&mut self) {
        let center = self.filter.clamp_frequency(self.center);
        let width = self.filter.clamp_frequency(self.width);
        self.filter.coefs = Coefficients::bandpass(center, width, self.filter.rate());
    }
}

impl Default for Bandpass {
    fn default() -> Self {
        Self::new(1000.0, 1000.0)
    }
}

impl Operator for Bandpass {
    fn name(&self) -> &str {
        "Bandpass filter"
    }

    fn keyword(&self) -> &str {
        "efb"
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

impl_chain_operator!(Bandpass);

/// Butterworth band-reject (notch) filter.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | center-freq | > 0 Hz | 1000.0 |
/// | 2 | width | > 0 Hz | 1000.0 |
#[derive(Debug, Clone)]
pub struct Bandreject {
    center: f32,
    width: f32,
    filter: Butterworth,
}

impl Bandreject {
    /// Creates a band-reject filter.
    pub fn new(center: f32, width: f32) -> Self {
        let mut f = Self {
            center,
            width,
            filter: Butterworth::new(),
        };
        f.update();
        f
    }

    fn update(&mut self) {
        let center = self.filter.clamp_frequency(self.center);
        let width = self.filter.clamp_frequency(self.width);
        self.filter.coefs = Coefficients::bandreject(center, width, self.filter.rate());
    }
}

impl Default for Bandreject {
    fn default() -> Self {
        Self::new(1000.0, 1000.0)
    }
}

impl Operator for Bandreject {
    fn name(&self) -> &str {
        "Bandreject filter"
    }

    fn keyword(&self) -> &str {
        "efr"
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

impl_chain_operator!(Bandreject);
