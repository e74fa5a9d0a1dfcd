//! Finite envelopes.
//!
//! Each envelope is a function of the time since the chain started. Outputs
//! stay in \[0, 1\] for the fixed shapes; the generic envelope outputs
//! whatever values its points hold.

use std::borrow::Cow;

use catena_core::{
    ControllerSource, Operator, ParamDescriptor, ParamFlags, SourceClock, param_names,
};

/// Most points a [`GenericLinearEnvelope`] accepts.
pub const MAX_ENVELOPE_POINTS: usize = 1024;

fn length_descriptor(desc: &mut ParamDescriptor, default: f32) {
    *desc = desc.with_default(default).with_lower_bound(0.0);
}

/// Ramp from 0 to 1 over `length-sec`, then holds at 1.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | length-sec | ≥ 0 | 1.0 |
///
/// A zero length jumps straight to 1.
#[derive(Debug, Clone)]
pub struct LinearEnvelope {
    length: f64,
    clock: SourceClock,
}

impl LinearEnvelope {
    /// Creates a ramp of `length` seconds.
    pub fn new(length: f64) -> Self {
        Self {
            length,
            clock: SourceClock::default(),
        }
    }

    /// Output at `position` seconds.
    pub fn at(&self, position: f64) -> f32 {
        if self.length <= 0.0 {
            return 1.0;
        }
        (position / self.length).clamp(0.0, 1.0) as f32
    }
}

impl Default for LinearEnvelope {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Operator for LinearEnvelope {
    fn name(&self) -> &str {
        "Linear envelope"
    }

    fn description(&self) -> &str {
        "Rises linearly from 0 to 1 and stays there."
    }

    fn keyword(&self) -> &str {
        "kl"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("length-sec")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == 1 {
            self.length = f64::from(value);
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.length as f32,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        if index == 1 {
            length_descriptor(desc, 1.0);
        }
    }
}

impl ControllerSource for LinearEnvelope {
    fn init(&mut self, step_length: f64) {
        self.clock.init(step_length);
        #[cfg(feature = "tracing")]
        tracing::debug!(length = self.length, "linear envelope initialized");
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

/// Holds at 0 for the first stage, ramps to 1 during the second, then holds
/// at 1.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | first-stage-length-sec | ≥ 0 | 0.0 |
/// | 2 | second-stage-length-sec | ≥ 0 | 1.0 |
#[derive(Debug, Clone)]
pub struct TwoStageLinearEnvelope {
    first: f64,
    second: f64,
    clock: SourceClock,
}

impl TwoStageLinearEnvelope {
    /// Creates a delayed ramp.
    pub fn new(first: f64, second: f64) -> Self {
        Self {
            first,
            second,
            clock: SourceClock::default(),
        }
    }

    /// Output at `position` seconds.
    pub fn at(&self, position: f64) -> f32 {
        if position <= self.first {
            0.0
        } else if self.second <= 0.0 {
            1.0
        } else {
            ((position - self.first) / self.second).min(1.0) as f32
        }
    }
}

impl Default for TwoStageLinearEnvelope {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

impl Operator for TwoStageLinearEnvelope {
    fn name(&self) -> &str {
        "Two-stage linear envelope"
    }

    fn description(&self) -> &str {
        "Stays at 0, then rises linearly to 1."
    }

    fn keyword(&self) -> &str {
        "kl2"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("first-stage-length-sec,second-stage-length-sec")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.first = f64::from(value),
            2 => self.second = f64::from(value),
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.first as f32,
            2 => self.second as f32,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => length_descriptor(desc, 0.0),
            2 => length_descriptor(desc, 1.0),
            _ => {}
        }
    }
}

impl ControllerSource for TwoStageLinearEnvelope {
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

/// Piecewise linear envelope through user-given `(position, value)` points.
///
/// Before the first point the output is the first value; after the last
/// point it is the last value. Points are expected in increasing position
/// order; a segment of zero length jumps to its end value.
///
/// ## Parameter Indices
///
/// The parameter list grows with the point count.
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | point_count | 0–1024, integer | 0 |
/// | 2k | pos*k* | ≥ 0 seconds | 0.0 |
/// | 2k+1 | val*k* | any | 0.0 |
#[derive(Debug, Clone, Default)]
pub struct GenericLinearEnvelope {
    positions: Vec<f64>,
    values: Vec<f32>,
    clock: SourceClock,
}

impl GenericLinearEnvelope {
    /// Creates an envelope from `(position, value)` points.
    pub fn new(points: &[(f64, f32)]) -> Self {
        let points = &points[..points.len().min(MAX_ENVELOPE_POINTS)];
        Self {
            positions: points.iter().map(|p| p.0).collect(),
            values: points.iter().map(|p| p.1).collect(),
            clock: SourceClock::default(),
        }
    }

    /// Number of points.
    pub fn point_count(&self) -> usize {
        self.positions.len()
    }

    /// Output at `position` seconds.
    pub fn at(&self, position: f64) -> f32 {
        let (Some(&first), Some(&last)) = (self.positions.first(), self.positions.last()) else {
            return 0.0;
        };
        if position < first {
            return self.values[0];
        }
        if position >= last {
            return self.values[self.values.len() - 1];
        }
        for i in 0..self.positions.len() - 1 {
            let (start, end) = (self.positions[i], self.positions[i + 1]);
            if position < end {
                let span = end - start;
                if span <= 0.0 {
                    return self.values[i + 1];
                }
                let frac = ((position - start) / span) as f32;
                return self.values[i] + (self.values[i + 1] - self.values[i]) * frac;
            }
        }
        self.values[self.values.len() - 1]
    }

    fn resize(&mut self, count: usize) {
        let count = count.min(MAX_ENVELOPE_POINTS);
        self.positions.resize(count, 0.0);
        self.values.resize(count, 0.0);
    }
}

impl Operator for GenericLinearEnvelope {
    fn name(&self) -> &str {
        "Generic linear envelope"
    }

    fn description(&self) -> &str {
        "Linear interpolation between user-defined points."
    }

    fn keyword(&self) -> &str {
        "klg"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        let mut names = param_names("point_count");
        for n in 1..=self.point_count() {
            names.push(Cow::Owned(format!("pos{n}")));
            names.push(Cow::Owned(format!("val{n}")));
        }
        names
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            0 => {}
            1 => self.resize(value.max(0.0) as usize),
            _ => {
                let point = (index - 2) / 2;
                if point >= self.point_count() {
                    return;
                }
                if index % 2 == 0 {
                    self.positions[point] = f64::from(value);
                } else {
                    self.values[point] = value;
                }
            }
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            0 => 0.0,
            1 => self.point_count() as f32,
            _ => {
                let point = (index - 2) / 2;
                if point >= self.point_count() {
                    0.0
                } else if index % 2 == 0 {
                    self.positions[point] as f32
                } else {
                    self.values[point]
                }
            }
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            0 => {}
            1 => {
                *desc = desc
                    .bounded(0.0, MAX_ENVELOPE_POINTS as f32)
                    .with_flags(ParamFlags::INTEGER);
            }
            i if i % 2 == 0 => length_descriptor(desc, 0.0),
            _ => {}
        }
    }
}

impl ControllerSource for GenericLinearEnvelope {
    fn init(&mut self, step_length: f64) {
        self.clock.init(step_length);
        #[cfg(feature = "tracing")]
        tracing::debug!(points = self.point_count(), "generic linear envelope initialized");
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

    #[test]
    fn test_linear_ramp_and_hold() {
        let mut env = LinearEnvelope::new(2.0);
        env.init(0.5);
        let values: Vec<f32> = (0..6).map(|_| env.value()).collect();
        assert_eq!(values, vec![0.0, 0.25, 0.5, 0.75, 1.0, 1.0]);
    }

    #[test]
    fn test_linear_zero_length_is_full() {
        let mut env = LinearEnvelope::new(0.0);
        env.init(0.1);
        assert_eq!(env.value(), 1.0);
    }

    #[test]
    fn test_linear_seek_is_absolute() {
        let mut env = LinearEnvelope::new(4.0);
        env.init(0.25);
        env.value();
        env.seek(3.0);
        assert_eq!(env.value(), 0.75);
        assert!(env.is_position_aware());
    }

    #[test]
    fn test_two_stage_waits_then_ramps() {
        let mut env = TwoStageLinearEnvelope::new(1.0, 2.0);
        env.init(0.5);
        let values: Vec<f32> = (0..8).map(|_| env.value()).collect();
        assert_eq!(values, vec![0.0, 0.0, 0.0, 0.25, 0.5, 0.75, 1.0, 1.0]);
    }

    #[test]
    fn test_two_stage_zero_second_stage_steps() {
        let env = TwoStageLinearEnvelope::new(1.0, 0.0);
        assert_eq!(env.at(1.0), 0.0);
        assert_eq!(env.at(1.01), 1.0);
    }

    #[test]
    fn test_generic_interpolates_between_points() {
        let env = GenericLinearEnvelope::new(&[(1.0, 0.2), (2.0, 1.0), (4.0, 0.0)]);
        assert_eq!(env.at(0.0), 0.2);
        assert_eq!(env.at(1.0), 0.2);
        assert!((env.at(1.5) - 0.6).abs() < 1e-6);
        assert_eq!(env.at(3.0), 0.5);
        assert_eq!(env.at(9.0), 0.0);
    }

    #[test]
    fn test_generic_empty_is_zero() {
        let env = GenericLinearEnvelope::default();
        assert_eq!(env.at(1.0), 0.0);
        assert_eq!(env.number_of_params(), 1);
    }

    #[test]
    fn test_generic_parameter_list_follows_point_count() {
        let mut env = GenericLinearEnvelope::default();
        env.set_parameter(1, 2.0);
        assert_eq!(env.number_of_params(), 5);
        assert_eq!(env.parameter_name(4).as_deref(), Some("pos2"));
        assert_eq!(env.parameter_name(5).as_deref(), Some("val2"));

        env.set_parameter(2, 0.5);
        env.set_parameter(3, 0.1);
        env.set_parameter(4, 1.5);
        env.set_parameter(5, 0.9);
        assert_eq!(env.parameter_values(), vec![2.0, 0.5, 0.1, 1.5, 0.9]);
        assert!((env.at(1.0) - 0.5).abs() < 1e-6);

        // Out of range writes are ignored.
        env.set_parameter(6, 7.0);
        assert_eq!(env.get_parameter(6), 0.0);
    }

    #[test]
    fn test_generic_point_count_is_capped() {
        let mut env = GenericLinearEnvelope::default();
        env.set_parameter(1, 1e9);
        assert_eq!(env.point_count(), MAX_ENVELOPE_POINTS);
        env.set_parameter(1, -3.0);
        assert_eq!(env.point_count(), 0);
    }
}
