//! Time-varying control sources and the controller binding.
//!
//! A [`ControllerSource`] produces a scalar, nominally in \[0, 1\], once per
//! tick. A [`GenericController`] owns one source and rescales its output into
//! `[low, high]` before writing it to a parameter of its target. The target
//! is never stored here; the owning [`Chain`](crate::Chain) resolves it by
//! handle each tick, so a controller can target an operator or another
//! controller without holding a reference to either.
//!
//! # Parameters of a controller
//!
//! | Index | Name | Meaning |
//! |-------|------|---------|
//! | 1 | `param-id` | 1-based target parameter |
//! | 2 | `range-low` | output at source value 0 |
//! | 3 | `range-high` | output at source value 1 |
//! | 4.. | source parameters | forwarded with an offset of 3 |
//!
//! Because the range is exposed as ordinary parameters, one controller can
//! sweep the range of another.

use std::borrow::Cow;
use std::fmt;

use dyn_clone::DynClone;

use crate::operator::{Operator, ParamDescriptor, ParamFlags, param_names};

/// Number of parameters owned by [`GenericController`] itself.
pub const CONTROLLER_PARAMS: usize = 3;

/// Scalar generator advanced once per tick.
///
/// [`value`](Self::value) is not idempotent: it returns the output for the
/// current position and then advances by one step. Position-aware sources
/// compute the output from an absolute position, so after a
/// [`seek`](Self::seek) they produce the same value regardless of how many
/// ticks preceded it.
pub trait ControllerSource: Operator + DynClone + Send {
    /// Sets the time advanced per [`value`](Self::value) call, in seconds.
    fn init(&mut self, step_length: f64);

    /// Returns the current output and advances one step.
    fn value(&mut self) -> f32;

    /// Returns the step length set by [`init`](Self::init).
    fn step_length(&self) -> f64;

    /// Returns true if [`seek`](Self::seek) moves the source.
    fn is_position_aware(&self) -> bool {
        false
    }

    /// Jumps to an absolute position in seconds.
    fn seek(&mut self, _position: f64) {}

    /// Suggests an initial output in \[0, 1\] so enabling the source does not
    /// jump the controlled parameter.
    ///
    /// Only sources whose output is free state use it (a MIDI controller
    /// before its first message). Position-aware sources ignore it: their
    /// phase comes from the chain position, so a seek or a restart at
    /// position zero always reproduces the same curve.
    fn seed(&mut self, _value: f32) {}
}

dyn_clone::clone_trait_object!(ControllerSource);

/// Position bookkeeping shared by time-driven sources.
///
/// ```rust
/// use catena_core::SourceClock;
///
/// let mut clock = SourceClock::default();
/// clock.init(0.5);
/// assert_eq!(clock.advance(), 0.0);
/// assert_eq!(clock.advance(), 0.5);
/// clock.seek(10.0);
/// assert_eq!(clock.position(), 10.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SourceClock {
    position: f64,
    step: f64,
}

impl SourceClock {
    /// Sets the step length and rewinds to zero.
    pub fn init(&mut self, step: f64) {
        self.step = step;
        self.position = 0.0;
    }

    /// Returns the position in seconds.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Returns the step length in seconds.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Returns the current position, then moves forward one step.
    pub fn advance(&mut self) -> f64 {
        let now = self.position;
        self.position += self.step;
        now
    }

    /// Jumps to `position` seconds. Negative positions clamp to zero.
    pub fn seek(&mut self, position: f64) {
        self.position = position.max(0.0);
    }
}

/// Binds a [`ControllerSource`] to one parameter of a target.
///
/// # Example
///
/// ```rust
/// use std::borrow::Cow;
/// use catena_core::{ControllerSource, GenericController, Operator, param_names};
///
/// #[derive(Clone)]
/// struct Half;
///
/// impl Operator for Half {
///     fn name(&self) -> &str { "Half" }
///     fn keyword(&self) -> &str { "kh" }
///     fn parameter_names(&self) -> Vec<Cow<'static, str>> { Vec::new() }
///     fn set_parameter(&mut self, _index: usize, _value: f32) {}
///     fn get_parameter(&self, _index: usize) -> f32 { 0.0 }
/// }
///
/// impl ControllerSource for Half {
///     fn init(&mut self, _step: f64) {}
///     fn value(&mut self) -> f32 { 0.5 }
///     fn step_length(&self) -> f64 { 0.0 }
/// }
///
/// let mut ctrl = GenericController::new(Box::new(Half), 1, 100.0, 200.0);
/// assert_eq!(ctrl.value(0.0), 150.0);
/// assert_eq!(ctrl.parameter_names()[0], "param-id");
/// ```
#[derive(Clone)]
pub struct GenericController {
    source: Box<dyn ControllerSource>,
    param_id: usize,
    low: f32,
    high: f32,
}

impl GenericController {
    /// Wraps `source`, writing into parameter `param_id` over `[low, high]`.
    pub fn new(source: Box<dyn ControllerSource>, param_id: usize, low: f32, high: f32) -> Self {
        Self {
            source,
            param_id,
            low,
            high,
        }
    }

    /// Wraps `source` targeting parameter 1 over `[0, 1]`.
    pub fn from_source(source: Box<dyn ControllerSource>) -> Self {
        Self::new(source, 1, 0.0, 1.0)
    }

    /// Returns the owned source.
    pub fn source(&self) -> &dyn ControllerSource {
        self.source.as_ref()
    }

    /// Returns the owned source mutably.
    pub fn source_mut(&mut self) -> &mut dyn ControllerSource {
        self.source.as_mut()
    }

    /// Returns the 1-based target parameter index.
    pub fn param_id(&self) -> usize {
        self.param_id
    }

    /// Sets the 1-based target parameter index.
    pub fn set_param_id(&mut self, param_id: usize) {
        self.param_id = param_id;
    }

    /// Returns the output range as `(low, high)`.
    pub fn range(&self) -> (f32, f32) {
        (self.low, self.high)
    }

    /// Sets the output range.
    pub fn set_range(&mut self, low: f32, high: f32) {
        self.low = low;
        self.high = high;
    }

    /// Returns true if the controller addresses a real parameter.
    pub fn is_valid(&self) -> bool {
        self.param_id >= 1
    }

    /// Maps a target value back into the source's \[0, 1\] range.
    ///
    /// An empty range maps everything to 0.0 ("always at low").
    pub fn inverse_map(&self, target_value: f32) -> f32 {
        let span = self.high - self.low;
        if span == 0.0 {
            return 0.0;
        }
        ((target_value - self.low) / span).clamp(0.0, 1.0)
    }

    /// Prepares the source and seeds it from the target's current value.
    pub fn init(&mut self, step_length: f64, current_target_value: f32) {
        self.source.init(step_length);
        let seed = self.inverse_map(current_target_value);
        self.source.seed(seed);
    }

    /// Reads the source at `position` seconds and rescales to the range.
    pub fn value(&mut self, position: f64) -> f32 {
        if self.source.is_position_aware() {
            self.source.seek(position);
        }
        let v01 = self.source.value();
        v01 * (self.high - self.low) + self.low
    }

    /// Computes the value at `position` and writes it to `target`.
    ///
    /// Returns the value written.
    pub fn apply<T: Operator + ?Sized>(&mut self, position: f64, target: &mut T) -> f32 {
        let value = self.value(position);
        target.set_parameter(self.param_id, value);
        value
    }

    /// One-line summary: source, target parameter and range.
    pub fn status(&self) -> String {
        format!(
            "{} -> parameter {} in [{}, {}]",
            self.source.name(),
            self.param_id,
            self.low,
            self.high
        )
    }
}

impl fmt::Debug for GenericController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericController")
            .field("source", &self.source.keyword())
            .field("param_id", &self.param_id)
            .field("low", &self.low)
            .field("high", &self.high)
            .finish()
    }
}

impl Operator for GenericController {
    fn name(&self) -> &str {
        self.source.name()
    }

    fn description(&self) -> &str {
        self.source.description()
    }

    fn keyword(&self) -> &str {
        self.source.keyword()
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        let mut names = param_names("param-id,range-low,range-high");
        names.extend(self.source.parameter_names());
        names
    }

    fn number_of_params(&self) -> usize {
        CONTROLLER_PARAMS + self.source.number_of_params()
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if !value.is_finite() {
            return;
        }
        match index {
            1 => self.param_id = value.round().max(0.0) as usize,
            2 => self.low = value,
            3 => self.high = value,
            i if i > CONTROLLER_PARAMS => {
                self.source.set_parameter(i - CONTROLLER_PARAMS, value);
            }
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.param_id as f32,
            2 => self.low,
            3 => self.high,
            i if i > CONTROLLER_PARAMS => self.source.get_parameter(i - CONTROLLER_PARAMS),
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => {
                *desc = desc
                    .with_default(1.0)
                    .with_lower_bound(1.0)
                    .with_flags(ParamFlags::INTEGER);
            }
            2 => *desc = desc.with_default(0.0),
            3 => *desc = desc.with_default(1.0),
            i if i > CONTROLLER_PARAMS => {
                self.source.parameter_description(i - CONTROLLER_PARAMS, desc);
            }
            _ => {}
        }
    }
}
