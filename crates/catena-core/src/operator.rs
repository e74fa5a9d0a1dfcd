//! Named, parameterized operators with runtime parameter reflection.
//!
//! [`Operator`] is the surface shared by chain operators and controller
//! sources. It lets a chain string like `-ea:120` be applied to any operator
//! without knowing its concrete type, and lets a chain be written back out as
//! text.
//!
//! # Indexing
//!
//! Parameters are **1-based**. Index 0 and indices above
//! [`number_of_params`](Operator::number_of_params) are accepted everywhere:
//! setting them does nothing and reading them returns 0.0. Chain strings come
//! from users, and a bad index must never take down a running pipeline.
//!
//! # Dynamic arity
//!
//! Some operators change their parameter list at runtime (an envelope whose
//! first parameter is its point count, an analyser with one result per
//! channel). Such operators rebuild the list returned by
//! [`parameter_names`](Operator::parameter_names) whenever the shape changes,
//! and `number_of_params` follows automatically.
//!
//! # Example
//!
//! ```rust
//! use std::borrow::Cow;
//! use catena_core::{Operator, ParamDescriptor, param_names};
//!
//! #[derive(Clone)]
//! struct Gain {
//!     percent: f32,
//! }
//!
//! impl Operator for Gain {
//!     fn name(&self) -> &str { "Gain" }
//!     fn keyword(&self) -> &str { "gain" }
//!     fn parameter_names(&self) -> Vec<Cow<'static, str>> { param_names("amp-%") }
//!
//!     fn set_parameter(&mut self, index: usize, value: f32) {
//!         if index == 1 {
//!             self.percent = value;
//!         }
//!     }
//!
//!     fn get_parameter(&self, index: usize) -> f32 {
//!         match index {
//!             1 => self.percent,
//!             _ => 0.0,
//!         }
//!     }
//!
//!     fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
//!         if index == 1 {
//!             *desc = desc.with_default(100.0).with_lower_bound(0.0);
//!         }
//!     }
//! }
//!
//! let mut gain = Gain { percent: 100.0 };
//! gain.set_parameter(gain.find_parameter("AMP-%").unwrap(), 50.0);
//! assert_eq!(gain.get_parameter(1), 50.0);
//!
//! // Out of range indices are ignored.
//! gain.set_parameter(7, 1.0);
//! assert_eq!(gain.get_parameter(7), 0.0);
//! ```

use std::borrow::Cow;

/// Scaling curve used when mapping a parameter to a normalized \[0, 1\] range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamScale {
    /// Equal resolution across the range.
    #[default]
    Linear,
    /// More resolution at low values. Requires a positive lower bound.
    Logarithmic,
}

/// Parameter property flags.
///
/// Use [`union`](Self::union) to combine.
///
/// ```rust
/// use catena_core::ParamFlags;
///
/// let flags = ParamFlags::INTEGER.union(ParamFlags::OUTPUT);
/// assert!(flags.contains(ParamFlags::OUTPUT));
/// assert!(!flags.contains(ParamFlags::TOGGLED));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParamFlags(u8);

impl ParamFlags {
    /// No flags set: a continuous input parameter.
    pub const NONE: Self = Self(0);
    /// On/off switch. Values other than zero mean "on".
    pub const TOGGLED: Self = Self(1 << 0);
    /// Only whole numbers are meaningful.
    pub const INTEGER: Self = Self(1 << 1);
    /// Read-only result written by the operator (peak levels, offsets).
    pub const OUTPUT: Self = Self(1 << 2);

    /// Returns `true` if all bits in `other` are set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of two flag sets.
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Metadata for one parameter.
///
/// The default descriptor describes an unbounded, continuous input parameter
/// with a default of 0.0. Operators fill in what they know through
/// [`Operator::parameter_description`] and leave everything else alone.
///
/// ```rust
/// use catena_core::{ParamDescriptor, ParamFlags};
///
/// let pan = ParamDescriptor::default()
///     .with_default(50.0)
///     .bounded(0.0, 100.0);
/// assert_eq!(pan.clamp(140.0), 100.0);
/// assert_eq!(pan.normalize(25.0), 0.25);
/// assert!(!pan.is_integer());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParamDescriptor {
    /// Value used when the operator is constructed.
    pub default_value: f32,
    /// Smallest accepted value, if bounded below.
    pub lower_bound: Option<f32>,
    /// Largest accepted value, if bounded above.
    pub upper_bound: Option<f32>,
    /// Toggle / integer / output properties.
    pub flags: ParamFlags,
    /// Normalization curve.
    pub scale: ParamScale,
}

impl ParamDescriptor {
    /// Sets the default value.
    pub const fn with_default(mut self, value: f32) -> Self {
        self.default_value = value;
        self
    }

    /// Sets both bounds.
    pub const fn bounded(mut self, lower: f32, upper: f32) -> Self {
        self.lower_bound = Some(lower);
        self.upper_bound = Some(upper);
        self
    }

    /// Sets the lower bound only.
    pub const fn with_lower_bound(mut self, lower: f32) -> Self {
        self.lower_bound = Some(lower);
        self
    }

    /// Sets the upper bound only.
    pub const fn with_upper_bound(mut self, upper: f32) -> Self {
        self.upper_bound = Some(upper);
        self
    }

    /// Replaces the flags.
    pub const fn with_flags(mut self, flags: ParamFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the normalization scale.
    pub const fn with_scale(mut self, scale: ParamScale) -> Self {
        self.scale = scale;
        self
    }

    /// Returns true for on/off parameters.
    pub const fn is_toggled(&self) -> bool {
        self.flags.contains(ParamFlags::TOGGLED)
    }

    /// Returns true for whole-number parameters.
    pub const fn is_integer(&self) -> bool {
        self.flags.contains(ParamFlags::INTEGER)
    }

    /// Returns true for read-only result parameters.
    pub const fn is_output(&self) -> bool {
        self.flags.contains(ParamFlags::OUTPUT)
    }

    /// Returns true for logarithmically scaled parameters.
    pub fn is_logarithmic(&self) -> bool {
        self.scale == ParamScale::Logarithmic
    }

    /// Returns true if the parameter has an upper bound.
    pub const fn is_bounded_above(&self) -> bool {
        self.upper_bound.is_some()
    }

    /// Returns true if the parameter has a lower bound.
    pub const fn is_bounded_below(&self) -> bool {
        self.lower_bound.is_some()
    }

    /// Clamps a value to whichever bounds are set.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        let mut v = value;
        if let Some(lower) = self.lower_bound
            && v < lower
        {
            v = lower;
        }
        if let Some(upper) = self.upper_bound
            && v > upper
        {
            v = upper;
        }
        v
    }

    /// Maps a value into \[0, 1\] using the bounds and scale.
    ///
    /// Returns 0.0 when either bound is missing or the range is empty.
    pub fn normalize(&self, value: f32) -> f32 {
        let (Some(min), Some(max)) = (self.lower_bound, self.upper_bound) else {
            return 0.0;
        };
        let range = max - min;
        if range == 0.0 {
            return 0.0;
        }
        match self.scale {
            ParamScale::Linear => (value - min) / range,
            ParamScale::Logarithmic => {
                if min <= 0.0 || value <= 0.0 {
                    return 0.0;
                }
                libm::logf(value / min) / libm::logf(max / min)
            }
        }
    }

    /// Inverse of [`normalize`](Self::normalize).
    ///
    /// Without both bounds the normalized value is returned unchanged.
    pub fn denormalize(&self, normalized: f32) -> f32 {
        let (Some(min), Some(max)) = (self.lower_bound, self.upper_bound) else {
            return normalized;
        };
        match self.scale {
            ParamScale::Linear => min + normalized * (max - min),
            ParamScale::Logarithmic => {
                if min <= 0.0 {
                    return min;
                }
                min * libm::powf(max / min, normalized)
            }
        }
    }
}

/// Builds a static parameter name list from a comma separated string.
///
/// ```rust
/// use catena_core::param_names;
///
/// let names = param_names("delay-time-msec,mix-%");
/// assert_eq!(names, vec!["delay-time-msec", "mix-%"]);
/// assert!(param_names("").is_empty());
/// ```
pub fn param_names(list: &'static str) -> Vec<Cow<'static, str>> {
    list.split(',')
        .filter(|name| !name.is_empty())
        .map(Cow::Borrowed)
        .collect()
}

/// Named entity with a 1-based, runtime-introspectable parameter list.
///
/// Implemented by every chain operator and every controller source. Only
/// [`name`](Self::name), [`keyword`](Self::keyword),
/// [`parameter_names`](Self::parameter_names),
/// [`set_parameter`](Self::set_parameter) and
/// [`get_parameter`](Self::get_parameter) are required.
pub trait Operator {
    /// Human-readable name, e.g. "Amplify".
    fn name(&self) -> &str;

    /// One-line description. Empty by default.
    fn description(&self) -> &str {
        ""
    }

    /// Keyword used in chain strings, e.g. `ea` for `-ea:100`.
    fn keyword(&self) -> &str;

    /// Current ordered parameter names.
    fn parameter_names(&self) -> Vec<Cow<'static, str>>;

    /// Current parameter count.
    ///
    /// Operators with many or dynamic parameters can override this to avoid
    /// building the name list.
    fn number_of_params(&self) -> usize {
        self.parameter_names().len()
    }

    /// Sets parameter `index` (1-based). Out of range indices are ignored.
    fn set_parameter(&mut self, index: usize, value: f32);

    /// Returns parameter `index` (1-based), or 0.0 when out of range.
    fn get_parameter(&self, index: usize) -> f32;

    /// Fills in metadata for parameter `index`.
    ///
    /// The default leaves the caller's descriptor untouched.
    fn parameter_description(&self, _index: usize, _desc: &mut ParamDescriptor) {}

    /// Returns true if `index` addresses a current parameter.
    fn is_parameter_index(&self, index: usize) -> bool {
        index >= 1 && index <= self.number_of_params()
    }

    /// Returns the name of parameter `index`.
    fn parameter_name(&self, index: usize) -> Option<Cow<'static, str>> {
        if index == 0 {
            return None;
        }
        self.parameter_names().into_iter().nth(index - 1)
    }

    /// Finds a parameter by name, ignoring ASCII case. Returns a 1-based index.
    fn find_parameter(&self, name: &str) -> Option<usize> {
        self.parameter_names()
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .map(|i| i + 1)
    }

    /// Returns the descriptor of parameter `index`, starting from
    /// [`ParamDescriptor::default`].
    fn describe_parameter(&self, index: usize) -> Option<ParamDescriptor> {
        if !self.is_parameter_index(index) {
            return None;
        }
        let mut desc = ParamDescriptor::default();
        self.parameter_description(index, &mut desc);
        Some(desc)
    }

    /// Returns every current parameter value in order.
    fn parameter_values(&self) -> Vec<f32> {
        (1..=self.number_of_params())
            .map(|i| self.get_parameter(i))
            .collect()
    }
}
