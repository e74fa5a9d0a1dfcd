//! Envelope modulation: pulse gates and tremolo.
//!
//! These operators multiply every channel of a frame by the same envelope,
//! driven by their own running phase. The phase is kept in samples, so
//! gate edges land on exact frames.

use std::borrow::Cow;
use std::f64::consts::PI;

use catena_core::{ChainOperator, Operator, ParamDescriptor, SampleBuffer, param_names};

const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Square-wave gate: open for the first `on-time-%` of each period, silent
/// for the rest.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | freq-Hz | > 0 | 4.0 |
/// | 2 | on-time-% | 0–100, exclusive | 50.0 |
///
/// Out of range values are rejected and keep the previous setting.
#[derive(Debug, Clone)]
pub struct PulseGate {
    freq: f32,
    on_percent: f32,
    sample_rate: u32,
    /// Position within the current period, in samples.
    phase: f64,
}

impl PulseGate {
    /// Creates a pulse gate.
    pub fn new(freq: f32, on_percent: f32) -> Self {
        let mut gate = Self {
            freq: 4.0,
            on_percent: 50.0,
            sample_rate: DEFAULT_SAMPLE_RATE,
            phase: 0.0,
        };
        gate.set_parameter(1, freq);
        gate.set_parameter(2, on_percent);
        gate
    }

    /// Whether the gate is currently passing audio.
    pub fn is_open(&self) -> bool {
        self.phase < self.period() * f64::from(self.on_percent) / 100.0
    }

    fn period(&self) -> f64 {
        f64::from(self.sample_rate) / f64::from(self.freq)
    }
}

impl Default for PulseGate {
    fn default() -> Self {
        Self::new(4.0, 50.0)
    }
}

impl Operator for PulseGate {
    fn name(&self) -> &str {
        "Pulse gate"
    }

    fn description(&self) -> &str {
        "Gates the signal on and off at a fixed rate."
    }

    fn keyword(&self) -> &str {
        "eemp"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("freq-Hz,on-time-%")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 if value > 0.0 => self.freq = value,
            2 if value > 0.0 && value < 100.0 => self.on_percent = value,
            1 | 2 => {
                #[cfg(feature = "tracing")]
                tracing::warn!(index, value, "pulse gate parameter out of range, ignored");
            }
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.freq,
            2 => self.on_percent,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => *desc = desc.with_default(4.0).with_lower_bound(0.0),
            2 => *desc = desc.with_default(50.0).bounded(0.0, 100.0),
            _ => {}
        }
    }
}

impl ChainOperator for PulseGate {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.sample_rate = buffer.sample_rate().max(1);
        self.phase = 0.0;
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        let period = self.period();
        let stop = period * f64::from(self.on_percent) / 100.0;
        for n in 0..buffer.frame_count() {
            if self.phase >= stop {
                for channel in buffer.channels_mut() {
                    channel[n] = 0.0;
                }
            }
            self.phase += 1.0;
            if self.phase >= period {
                self.phase -= period;
            }
        }
    }
}

/// [`PulseGate`] with its rate given in beats per minute.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | bpm | > 0 | 120.0 |
/// | 2 | on-time-% | 0–100, exclusive | 50.0 |
#[derive(Debug, Clone)]
pub struct PulseGateBpm {
    bpm: f32,
    gate: PulseGate,
}

impl PulseGateBpm {
    /// Creates a pulse gate at `bpm` pulses per minute.
    pub fn new(bpm: f32, on_percent: f32) -> Self {
        Self {
            bpm,
            gate: PulseGate::new(bpm / 60.0, on_percent),
        }
    }
}

impl Default for PulseGateBpm {
    fn default() -> Self {
        Self::new(120.0, 50.0)
    }
}

impl Operator for PulseGateBpm {
    fn name(&self) -> &str {
        "Pulse gate (bpm)"
    }

    fn description(&self) -> &str {
        "Gates the signal on and off in time with a tempo."
    }

    fn keyword(&self) -> &str {
        "eemb"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("bpm,on-time-%")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => {
                // Kept separately so the value reads back exactly.
                if value > 0.0 {
                    self.bpm = value;
                }
                self.gate.set_parameter(1, value / 60.0);
            }
            2 => self.gate.set_parameter(2, value),
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.bpm,
            2 => self.gate.get_parameter(2),
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => *desc = desc.with_default(120.0).with_lower_bound(0.0),
            2 => self.gate.parameter_description(2, desc),
            _ => {}
        }
    }
}

impl ChainOperator for PulseGateBpm {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.gate.init(buffer);
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        self.gate.process(buffer);
    }
}

/// Tremolo: `gain = (1 - depth) + depth · |sin(2π · t · bpm / 120)|`.
///
/// The rectified sine peaks twice per cycle, so the level dips once per
/// beat.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | bpm | > 0 | 120.0 |
/// | 2 | depth-% | 0.0–100.0 | 50.0 |
#[derive(Debug, Clone)]
pub struct Tremolo {
    bpm: f32,
    depth_percent: f32,
    sample_rate: u32,
    /// Position within one sine cycle, in samples.
    phase: f64,
}

impl Tremolo {
    /// Creates a tremolo.
    pub fn new(bpm: f32, depth_percent: f32) -> Self {
        let mut t = Self {
            bpm: 120.0,
            depth_percent,
            sample_rate: DEFAULT_SAMPLE_RATE,
            phase: 0.0,
        };
        t.set_parameter(1, bpm);
        t
    }

    fn cycle(&self) -> f64 {
        f64::from(self.sample_rate) * 120.0 / f64::from(self.bpm)
    }
}

impl Default for Tremolo {
    fn default() -> Self {
        Self::new(120.0, 50.0)
    }
}

impl Operator for Tremolo {
    fn name(&self) -> &str {
        "Tremolo"
    }

    fn description(&self) -> &str {
        "Modulates the level with a rectified sine in time with a tempo."
    }

    fn keyword(&self) -> &str {
        "eemt"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("bpm,depth-%")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 if value > 0.0 => self.bpm = value,
            1 => {
                #[cfg(feature = "tracing")]
                tracing::warn!(value, "tremolo bpm must be positive, ignored");
            }
            2 => self.depth_percent = value,
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.bpm,
            2 => self.depth_percent,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => *desc = desc.with_default(120.0).with_lower_bound(0.0),
            2 => *desc = desc.with_default(50.0).bounded(0.0, 100.0),
            _ => {}
        }
    }
}

impl ChainOperator for Tremolo {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.sample_rate = buffer.sample_rate().max(1);
        self.phase = 0.0;
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        let cycle = self.cycle();
        let depth = f64::from(self.depth_percent) / 100.0;
        for n in 0..buffer.frame_count() {
            let envelope = ((1.0 - depth) + depth * libm::sin(2.0 * PI * self.phase / cycle).abs())
                .max(0.0) as f32;
            for channel in buffer.channels_mut() {
                channel[n] *= envelope;
            }
            self.phase += 1.0;
            if self.phase >= cycle {
                self.phase -= cycle;
            }
        }
    }
}
