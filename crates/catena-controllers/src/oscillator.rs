//! Periodic control sources.
//!
//! Oscillators here run at control rate: they are evaluated once per chain
//! block, so frequencies well below the block rate are what they are for.

use std::borrow::Cow;
use std::f64::consts::PI;

use catena_core::{
    ControllerSource, Operator, ParamDescriptor, ParamFlags, SourceClock, param_names,
};

/// Most value points a [`GenericOscillator`] accepts.
pub const MAX_OSCILLATOR_POINTS: usize = 1024;

fn frequency_descriptor(desc: &mut ParamDescriptor) {
    *desc = desc.with_default(1.0).with_lower_bound(0.0);
}

/// Sine wave mapped into \[0, 1\].
///
/// `(sin(2π·f·t + φ·π) + 1) / 2`, where `t` is the chain position.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | freq-hz | ≥ 0 | 1.0 |
/// | 2 | initial-phase | multiples of π | 0.0 |
#[derive(Debug, Clone)]
pub struct SineOscillator {
    frequency: f32,
    initial_phase: f32,
    clock: SourceClock,
}

impl SineOscillator {
    /// Creates a sine with `frequency` Hz and `initial_phase` in multiples
    /// of π.
    pub fn new(frequency: f32, initial_phase: f32) -> Self {
        Self {
            frequency,
            initial_phase,
            clock: SourceClock::default(),
        }
    }

    /// Output at `position` seconds.
    pub fn at(&self, position: f64) -> f32 {
        let phase =
            2.0 * PI * f64::from(self.frequency) * position + f64::from(self.initial_phase) * PI;
        ((libm::sin(phase) + 1.0) / 2.0) as f32
    }
}

impl Default for SineOscillator {
    fn default() -> Self {
        Self::new(1.0, 0.0)
    }
}

impl Operator for SineOscillator {
    fn name(&self) -> &str {
        "Sine oscillator"
    }

    fn description(&self) -> &str {
        "Sine wave between 0 and 1."
    }

    fn keyword(&self) -> &str {
        "kos"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("freq-hz,initial-phase")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.frequency = value,
            2 => self.initial_phase = value,
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.frequency,
            2 => self.initial_phase,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => frequency_descriptor(desc),
            2 => *desc = desc.with_default(0.0).bounded(0.0, 2.0),
            _ => {}
        }
    }
}

impl ControllerSource for SineOscillator {
    fn init(&mut self, step_length: f64) {
        self.clock.init(step_length);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            frequency = self.frequency,
            phase = self.initial_phase,
            "sine oscillator initialized"
        );
    }

    fn value(&mut self) -> f32 {
        let now = self.clock.advance();
        self.at(now)
    }

    fn step_length(&self) -> f64 {
        self.clock.step()
    }

    fn is_position_aware(&self) -> bool {
        true
    }

    fn seek(&mut self, position: f64) {
        self.clock.seek(position);
    }
}

/// How [`GenericOscillator`] moves between its value points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OscillatorMode {
    /// Each point holds for an equal share of the period.
    #[default]
    Static,
    /// The period is split into `n - 1` ramps between consecutive points.
    Linear,
}

impl OscillatorMode {
    fn from_value(value: f32) -> Self {
        if value >= 0.5 { Self::Linear } else { Self::Static }
    }

    fn as_value(self) -> f32 {
        match self {
            Self::Static => 0.0,
            Self::Linear => 1.0,
        }
    }
}

/// Loops over a list of values once per period.
///
/// ## Parameter Indices
///
/// The parameter list grows with the point count.
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | freq-hz | ≥ 0 | 1.0 |
/// | 2 | mode | 0 static, 1 linear | 0 |
/// | 3 | point_count | 0–1024, integer | 0 |
/// | 3+k | val*k* | any | 0.0 |
///
/// With no points the output is 0. A frequency of 0 holds the first point.
#[derive(Debug, Clone)]
pub struct GenericOscillator {
    frequency: f32,
    mode: OscillatorMode,
    values: Vec<f32>,
    clock: SourceClock,
}

impl GenericOscillator {
    /// Creates an oscillator over `values`.
    pub fn new(frequency: f32, mode: OscillatorMode, values: &[f32]) -> Self {
        Self {
            frequency,
            mode,
            values: values[..values.len().min(MAX_OSCILLATOR_POINTS)].to_vec(),
            clock: SourceClock::default(),
        }
    }

    /// Interpolation mode.
    pub fn mode(&self) -> OscillatorMode {
        self.mode
    }

    /// Output at `position` seconds.
    pub fn at(&self, position: f64) -> f32 {
        let n = self.values.len();
        if n == 0 {
            return 0.0;
        }
        let cycles = f64::from(self.frequency.max(0.0)) * position.max(0.0);
        let phase = cycles - cycles.floor();
        match self.mode {
            OscillatorMode::Static => {
                let index = ((phase * n as f64) as usize).min(n - 1);
                self.values[index]
            }
            OscillatorMode::Linear if n == 1 => self.values[0],
            OscillatorMode::Linear => {
                let segments = (n - 1) as f64;
                let pos = phase * segments;
                let index = (pos as usize).min(n - 2);
                let frac = (pos - index as f64) as f32;
                let (a, b) = (self.values[index], self.values[index + 1]);
                a + (b - a) * frac
            }
        }
    }
}

impl Default for GenericOscillator {
    fn default() -> Self {
        Self::new(1.0, OscillatorMode::Static, &[])
    }
}

impl Operator for GenericOscillator {
    fn name(&self) -> &str {
        "Generic oscillator"
    }

    fn description(&self) -> &str {
        "Periodic sequence of user-defined values."
    }

    fn keyword(&self) -> &str {
        "kog"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        let mut names = param_names("freq-hz,mode,point_count");
        names.extend((1..=self.values.len()).map(|n| Cow::Owned(format!("val{n}"))));
        names
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            0 => {}
            1 => self.frequency = value,
            2 => self.mode = OscillatorMode::from_value(value),
            3 => {
                let count = (value.max(0.0) as usize).min(MAX_OSCILLATOR_POINTS);
                self.values.resize(count, 0.0);
            }
            i => {
                if let Some(slot) = self.values.get_mut(i - 4) {
                    *slot = value;
                }
            }
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            0 => 0.0,
            1 => self.frequency,
            2 => self.mode.as_value(),
            3 => self.values.len() as f32,
            i => self.values.get(i - 4).copied().unwrap_or(0.0),
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => frequency_descriptor(desc),
            2 => *desc = desc.bounded(0.0, 1.0).with_flags(ParamFlags::INTEGER),
            3 => {
                *desc = desc
                    .bounded(0.0, MAX_OSCILLATOR_POINTS as f32)
                    .with_flags(ParamFlags::INTEGER);
            }
            _ => {}
        }
    }
}

impl ControllerSource for GenericOscillator {
    fn init(&mut self, step_length: f64) {
        self.clock.init(step_length);
    }

    fn value(&mut self) -> f32 {
        let now = self.clock.advance();
        self.at(now)
    }

    fn step_length(&self) -> f64 {
        self.clock.step()
    }

    fn is_position_aware(&self) -> bool {
        true
    }

    fn seek(&mut self, position: f64) {
        self.clock.seek(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    #[test]
    fn test_sine_quarter_points() {
        let mut osc = SineOscillator::new(1.0, 0.0);
        osc.init(0.25);
        let values: Vec<f32> = (0..5).map(|_| osc.value()).collect();
        let expected = [0.5, 1.0, 0.5, 0.0, 0.5];
        for (v, e) in values.iter().zip(expected) {
            assert!((v - e).abs() < EPS, "{values:?}");
        }
    }

    #[test]
    fn test_sine_initial_phase_in_pi_units() {
        let osc = SineOscillator::new(1.0, 0.5);
        assert!((osc.at(0.0) - 1.0).abs() < EPS);
        let osc = SineOscillator::new(1.0, 1.0);
        assert!((osc.at(0.0) - 0.5).abs() < EPS);
    }

    #[test]
    fn test_sine_is_position_aware() {
        let mut a = SineOscillator::new(0.3, 0.0);
        let mut b = a.clone();
        a.init(0.1);
        b.init(0.1);
        for _ in 0..7 {
            a.value();
        }
        b.seek(0.7);
        assert!((a.value() - b.value()).abs() < EPS);
    }

    #[test]
    fn test_generic_static_steps() {
        let mut osc = GenericOscillator::new(1.0, OscillatorMode::Static, &[0.0, 0.5, 1.0, 0.25]);
        osc.init(0.25);
        let values: Vec<f32> = (0..6).map(|_| osc.value()).collect();
        assert_eq!(values, vec![0.0, 0.5, 1.0, 0.25, 0.0, 0.5]);
    }

    #[test]
    fn test_generic_linear_ramps() {
        let osc = GenericOscillator::new(1.0, OscillatorMode::Linear, &[0.0, 1.0, 0.0]);
        assert_eq!(osc.at(0.0), 0.0);
        assert_eq!(osc.at(0.25), 0.5);
        assert_eq!(osc.at(0.5), 1.0);
        assert_eq!(osc.at(0.75), 0.5);
        assert_eq!(osc.at(1.0), 0.0);
    }

    #[test]
    fn test_generic_degenerate_inputs() {
        let empty = GenericOscillator::default();
        assert_eq!(empty.at(0.3), 0.0);
        let single = GenericOscillator::new(2.0, OscillatorMode::Linear, &[0.7]);
        assert_eq!(single.at(0.3), 0.7);
        let frozen = GenericOscillator::new(0.0, OscillatorMode::Static, &[0.2, 0.9]);
        assert_eq!(frozen.at(12.0), 0.2);
    }

    #[test]
    fn test_generic_parameters_grow_with_point_count() {
        let mut osc = GenericOscillator::default();
        osc.set_parameter(3, 3.0);
        assert_eq!(osc.number_of_params(), 6);
        assert_eq!(osc.parameter_name(6).as_deref(), Some("val3"));
        osc.set_parameter(5, 0.4);
        assert_eq!(osc.get_parameter(5), 0.4);
        osc.set_parameter(2, 1.0);
        assert_eq!(osc.mode(), OscillatorMode::Linear);
        assert_eq!(osc.get_parameter(2), 1.0);
        osc.set_parameter(9, 1.0);
        assert_eq!(osc.get_parameter(9), 0.0);
    }
}
