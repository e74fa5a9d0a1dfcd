//! Keyword registry and factory for catena chain operators and controllers.
//!
//! Every chain operator and controller source has a short keyword (`ea`,
//! `efl`, `kos`, ...). This crate maps those keywords to constructors and to
//! descriptors carrying a display name, a description and a category, which
//! is what the chain-string parser and the command line build on.
//!
//! # Example
//!
//! ```rust
//! use catena_core::Operator;
//! use catena_registry::{OperatorCategory, Registry};
//!
//! let registry = Registry::new();
//!
//! // Create an operator with positional parameter values
//! let amp = registry.create_operator("ea", &[120.0]).unwrap();
//! assert_eq!(amp.get_parameter(1), 120.0);
//!
//! // Controllers take param-id, range-low, range-high, then source values
//! let lfo = registry.create_controller("kos", &[1.0, 0.0, 100.0, 0.5]).unwrap();
//! assert_eq!(lfo.range(), (0.0, 100.0));
//!
//! for op in registry.operators().operators_in_category(OperatorCategory::Filter) {
//!     println!("-{}: {}", op.keyword, op.name);
//! }
//! ```
//!
//! # Stamps
//!
//! The `eS` operator and the `ksv` controller meet through a
//! [`StampServer`]. [`Registry::new`] hands one server to both halves, so a
//! stamp written by any chain built from the registry is visible to every
//! volume analyser built from it.
//!
//! # Presets
//!
//! A registry also stores named preset definitions, chain-string fragments
//! that `-pn:name` expands. The registry keeps the text only; expanding it is
//! the parser's job.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use catena_controllers::{
    GenericLinearEnvelope, GenericOscillator, LinearEnvelope, MidiController, SineOscillator,
    TwoStageLinearEnvelope, VolumeAnalyzer,
};
use catena_core::{ChainOperator, ControllerSource, GenericController, Operator, StampServer};
use catena_effects::{
    AdvancedCompressor, AdvancedReverb, Allpass, Amplify, AmplifyChannel, AmplifyClipCount,
    AudioStamp, Bandpass, Bandreject, ChannelCopy, Chorus, CombFilter, Compress, DcFind, DcFix,
    Delay, FakeStereo, Flanger, Highpass, InverseCombFilter, Limiter, Lowpass, MixToChannel,
    MultitapDelay, NoiseGate, NormalPan, Phaser, PitchShift, PulseGate, PulseGateBpm, RcLowpass,
    ResonantBandpass, ResonantLowpass, Resonator, Reverb, ThresholdGate, TimeCropGate, Tremolo,
    VolumeBuckets, VolumePeak,
};

/// Errors raised while looking up or constructing registered objects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No chain operator is registered under the keyword.
    #[error("unknown chain operator '-{0}'")]
    UnknownOperator(String),

    /// No controller source is registered under the keyword.
    #[error("unknown controller '-{0}'")]
    UnknownController(String),

    /// The category name matches none of [`OperatorCategory::ALL`].
    #[error("unknown operator category '{0}'")]
    UnknownCategory(String),
}

/// Category of chain operator for organization and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorCategory {
    /// Level changes and limiting
    Amplitude,
    /// Compressors and noise gates
    Dynamics,
    /// Panning, channel copies and downmixes
    Mixing,
    /// Butterworth, resonant, comb and allpass filters
    Filter,
    /// Delays, chorus, flanger, phaser and reverbs
    TimeBased,
    /// Signal analysis and DC offset tools
    Analysis,
    /// Gates that pass or drop whole stretches of audio
    Gate,
    /// Pitch shifting
    Pitch,
    /// Pulse gates and tremolo
    Modulation,
}

impl OperatorCategory {
    /// Every category, in display order.
    pub const ALL: [Self; 9] = [
        Self::Amplitude,
        Self::Dynamics,
        Self::Mixing,
        Self::Filter,
        Self::TimeBased,
        Self::Modulation,
        Self::Analysis,
        Self::Gate,
        Self::Pitch,
    ];

    /// Returns a human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            OperatorCategory::Amplitude => "Amplitude",
            OperatorCategory::Dynamics => "Dynamics",
            OperatorCategory::Mixing => "Mixing",
            OperatorCategory::Filter => "Filter",
            OperatorCategory::TimeBased => "Time-Based",
            OperatorCategory::Analysis => "Analysis",
            OperatorCategory::Gate => "Gate",
            OperatorCategory::Pitch => "Pitch",
            OperatorCategory::Modulation => "Modulation",
        }
    }

    /// Returns a description of the category.
    pub const fn description(&self) -> &'static str {
        match self {
            OperatorCategory::Amplitude => "Amplifiers, channel gain and limiters",
            OperatorCategory::Dynamics => "Compressors, limiters and noise gates",
            OperatorCategory::Mixing => "Panning, channel copies and mixdowns",
            OperatorCategory::Filter => "Butterworth, resonant, comb and allpass filters",
            OperatorCategory::TimeBased => "Delays, modulated delays and reverbs",
            OperatorCategory::Analysis => "Volume statistics, stamps and DC offset tools",
            OperatorCategory::Gate => "Time and threshold gates",
            OperatorCategory::Pitch => "Resampling pitch shift",
            OperatorCategory::Modulation => "Pulse gates and tremolo",
        }
    }
}

impl fmt::Display for OperatorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperatorCategory {
    type Err = RegistryError;

    /// Accepts the display name in any case, with or without the hyphen.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.replace('-', "");
        Self::ALL
            .into_iter()
            .find(|c| c.name().replace('-', "").eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| RegistryError::UnknownCategory(s.to_string()))
    }
}

/// Describes a chain operator in the registry.
#[derive(Debug, Clone)]
pub struct OperatorDescriptor {
    /// Chain-string keyword, without the leading `-`.
    pub keyword: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description of the operator.
    pub description: &'static str,
    /// Category for organization.
    pub category: OperatorCategory,
    /// Number of parameters of a freshly created instance.
    pub param_count: usize,
}

/// Describes a controller source in the registry.
#[derive(Debug, Clone)]
pub struct ControllerDescriptor {
    /// Chain-string keyword, without the leading `-`.
    pub keyword: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description of the source.
    pub description: &'static str,
    /// Number of source parameters, not counting param-id and range.
    pub param_count: usize,
}

/// Factory type for creating chain operators.
///
/// Factories may capture shared state such as a [`StampServer`].
pub type OperatorFactory = Arc<dyn Fn() -> Box<dyn ChainOperator> + Send + Sync>;

/// Factory type for creating controller sources.
pub type ControllerFactory = Arc<dyn Fn() -> Box<dyn ControllerSource> + Send + Sync>;

#[derive(Clone)]
struct OperatorEntry {
    descriptor: OperatorDescriptor,
    factory: OperatorFactory,
}

#[derive(Clone)]
struct ControllerEntry {
    descriptor: ControllerDescriptor,
    factory: ControllerFactory,
}

/// A named chain-string fragment that `-pn:name` expands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetDefinition {
    /// Name used after `-pn:`.
    pub name: String,
    /// Chain-string fragment. `%name` values become preset parameters and
    /// `|` separates parallel branches.
    pub definition: String,
}

/// Writes `values` to parameters 1, 2, ... of `target`.
///
/// Each value is checked against the parameter count at the time it is
/// written, so a value that grows the parameter list (a point count) makes
/// room for the values after it. Values with no parameter to go to are
/// dropped. Returns how many values were applied.
pub fn apply_values<T: Operator + ?Sized>(target: &mut T, values: &[f32]) -> usize {
    let mut applied = 0;
    for (i, &value) in values.iter().enumerate() {
        let index = i + 1;
        if !target.is_parameter_index(index) {
            break;
        }
        target.set_parameter(index, value);
        applied += 1;
    }
    applied
}

/// Registry of all available chain operators.
///
/// All built-in operators are registered by [`OperatorRegistry::new`].
/// Keywords are unique; registering an existing keyword replaces it.
#[derive(Clone)]
pub struct OperatorRegistry {
    entries: Vec<OperatorEntry>,
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.descriptor.keyword))
            .finish()
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorRegistry {
    /// Create a new registry with all built-in operators registered.
    ///
    /// Stamp writers get a private [`StampServer`]; use
    /// [`with_stamps`](Self::with_stamps) to share one with controllers.
    pub fn new() -> Self {
        Self::with_stamps(StampServer::new())
    }

    /// Create a registry whose `eS` operators write to `stamps`.
    pub fn with_stamps(stamps: StampServer) -> Self {
        let mut registry = Self {
            entries: Vec::new(),
        };
        registry.register_builtin_operators(stamps);
        registry
    }

    /// Create a registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn register_builtin_operators(&mut self, stamps: StampServer) {
        use OperatorCategory::{
            Amplitude, Analysis, Dynamics, Filter, Gate, Mixing, Modulation, Pitch, TimeBased,
        };

        // Amplitude
        self.register(
            OperatorDescriptor {
                keyword: "ea",
                name: "Amplify",
                description: "Adjusts the signal level by a percentage",
                category: Amplitude,
                param_count: 1,
            },
            || Box::new(Amplify::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "eac",
                name: "Channel amplify",
                description: "Adjusts the level of a single channel",
                category: Amplitude,
                param_count: 2,
            },
            || Box::new(AmplifyChannel::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "eal",
                name: "Limiter",
                description: "Clamps samples to a fraction of full scale",
                category: Amplitude,
                param_count: 1,
            },
            || Box::new(Limiter::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "eaw",
                name: "Amplify with clip-control",
                description: "Adjusts the level and warns about consecutive clipped samples",
                category: Amplitude,
                param_count: 2,
            },
            || Box::new(AmplifyClipCount::default()),
        );

        // Dynamics
        self.register(
            OperatorDescriptor {
                keyword: "ec",
                name: "Compressor",
                description: "Slows down level changes above a threshold",
                category: Dynamics,
                param_count: 2,
            },
            || Box::new(Compress::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "eca",
                name: "Advanced compressor",
                description: "Stereo gain rider with a fast peak stage and a soft limiter",
                category: Dynamics,
                param_count: 4,
            },
            || Box::new(AdvancedCompressor::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "enm",
                name: "Noisegate",
                description: "Silences the signal after it stays below a threshold",
                category: Dynamics,
                param_count: 5,
            },
            || Box::new(NoiseGate::default()),
        );

        // Mixing
        self.register(
            OperatorDescriptor {
                keyword: "epp",
                name: "Normal pan",
                description: "Balances a stereo signal between left and right",
                category: Mixing,
                param_count: 1,
            },
            || Box::new(NormalPan::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "erc",
                name: "Channel copy",
                description: "Copies one channel onto another",
                category: Mixing,
                param_count: 2,
            },
            || Box::new(ChannelCopy::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "erm",
                name: "Mix to channel",
                description: "Mixes all channels down into a single channel",
                category: Mixing,
                param_count: 1,
            },
            || Box::new(MixToChannel::default()),
        );

        // Filters
        self.register(
            OperatorDescriptor {
                keyword: "efl",
                name: "Lowpass filter",
                description: "Second-order Butterworth lowpass",
                category: Filter,
                param_count: 1,
            },
            || Box::new(Lowpass::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "efh",
                name: "Highpass filter",
                description: "Second-order Butterworth highpass",
                category: Filter,
                param_count: 1,
            },
            || Box::new(Highpass::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "efb",
                name: "Bandpass filter",
                description: "Passes a band around a center frequency",
                category: Filter,
                param_count: 2,
            },
            || Box::new(Bandpass::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "efr",
                name: "Bandreject filter",
                description: "Removes a band around a center frequency",
                category: Filter,
                param_count: 2,
            },
            || Box::new(Bandreject::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "ef1",
                name: "Resonant bandpass",
                description: "Two-pole bandpass with a sharp peak",
                category: Filter,
                param_count: 2,
            },
            || Box::new(ResonantBandpass::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "ef3",
                name: "Resonant lowpass",
                description: "Four-pole lowpass with adjustable resonance",
                category: Filter,
                param_count: 3,
            },
            || Box::new(ResonantLowpass::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "ef4",
                name: "RC lowpass",
                description: "Three-stage RC lowpass with saturating feedback",
                category: Filter,
                param_count: 2,
            },
            || Box::new(RcLowpass::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "efa",
                name: "Allpass filter",
                description: "Delay-based allpass that smears phase without colouring",
                category: Filter,
                param_count: 2,
            },
            || Box::new(Allpass::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "efc",
                name: "Comb filter",
                description: "Feedback comb with decaying repeats",
                category: Filter,
                param_count: 2,
            },
            || Box::new(CombFilter::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "efi",
                name: "Inverse comb filter",
                description: "Feed-forward comb that notches harmonics of the delay",
                category: Filter,
                param_count: 2,
            },
            || Box::new(InverseCombFilter::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "efs",
                name: "Resonator",
                description: "Two-pole resonator with unity peak gain",
                category: Filter,
                param_count: 2,
            },
            || Box::new(Resonator::default()),
        );

        // Time-based
        self.register(
            OperatorDescriptor {
                keyword: "etd",
                name: "Delay",
                description: "Echo with optional stereo routing",
                category: TimeBased,
                param_count: 4,
            },
            || Box::new(Delay::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "etm",
                name: "Multitap delay",
                description: "Evenly spaced taps mixed with the dry signal",
                category: TimeBased,
                param_count: 3,
            },
            || Box::new(MultitapDelay::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "etf",
                name: "Fake stereo",
                description: "Widens mono material by delaying one side",
                category: TimeBased,
                param_count: 1,
            },
            || Box::new(FakeStereo::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "etr",
                name: "Reverb",
                description: "Single feedback delay line",
                category: TimeBased,
                param_count: 3,
            },
            || Box::new(Reverb::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "ete",
                name: "Advanced reverb",
                description: "Room simulation from 64 scattered reflections",
                category: TimeBased,
                param_count: 3,
            },
            || Box::new(AdvancedReverb::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "etc",
                name: "Chorus",
                description: "Swept delay with the sweep offset per channel",
                category: TimeBased,
                param_count: 4,
            },
            || Box::new(Chorus::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "etl",
                name: "Flanger",
                description: "Short swept delay mixed with the input",
                category: TimeBased,
                param_count: 4,
            },
            || Box::new(Flanger::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "etp",
                name: "Phaser",
                description: "Swept delay subtracted from the input",
                category: TimeBased,
                param_count: 4,
            },
            || Box::new(Phaser::default()),
        );

        // Modulation
        self.register(
            OperatorDescriptor {
                keyword: "eemb",
                name: "Pulse gate (bpm)",
                description: "Gates the signal on and off in time with a tempo",
                category: Modulation,
                param_count: 2,
            },
            || Box::new(PulseGateBpm::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "eemp",
                name: "Pulse gate",
                description: "Gates the signal on and off at a frequency",
                category: Modulation,
                param_count: 2,
            },
            || Box::new(PulseGate::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "eemt",
                name: "Tremolo",
                description: "Sine amplitude modulation in time with a tempo",
                category: Modulation,
                param_count: 2,
            },
            || Box::new(Tremolo::default()),
        );

        // Analysis
        self.register(
            OperatorDescriptor {
                keyword: "ev",
                name: "Volume analysis",
                description: "Amplitude histogram, peaks and clipped sample counts",
                category: Analysis,
                param_count: 2,
            },
            || Box::new(VolumeBuckets::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "ezf",
                name: "DC-Find",
                description: "Finds the offset that removes DC from each channel",
                category: Analysis,
                param_count: 0,
            },
            || Box::new(DcFind::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "ezx",
                name: "DC-Fix",
                description: "Adds a fixed DC offset to the left and right channels",
                category: Analysis,
                param_count: 2,
            },
            || Box::new(DcFix::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "evp",
                name: "Peak amplitude",
                description: "Per-channel peak since the value was last read",
                category: Analysis,
                param_count: 0,
            },
            || Box::new(VolumePeak::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "eS",
                name: "Audio stamp",
                description: "Publishes each block for volume analysers",
                category: Analysis,
                param_count: 1,
            },
            move || Box::new(AudioStamp::with_server(1, stamps.clone())),
        );

        // Gates
        self.register(
            OperatorDescriptor {
                keyword: "gc",
                name: "Time crop gate",
                description: "Passes audio only between two points in time",
                category: Gate,
                param_count: 2,
            },
            || Box::new(TimeCropGate::default()),
        );
        self.register(
            OperatorDescriptor {
                keyword: "ge",
                name: "Threshold gate",
                description: "Starts passing audio above one level and stops below another",
                category: Gate,
                param_count: 3,
            },
            || Box::new(ThresholdGate::default()),
        );

        // Pitch
        self.register(
            OperatorDescriptor {
                keyword: "ei",
                name: "Pitch shifter",
                description: "Shifts pitch by resampling the signal",
                category: Pitch,
                param_count: 1,
            },
            || Box::new(PitchShift::default()),
        );
    }

    /// Register an operator, replacing any entry with the same keyword.
    pub fn register<F>(&mut self, descriptor: OperatorDescriptor, factory: F)
    where
        F: Fn() -> Box<dyn ChainOperator> + Send + Sync + 'static,
    {
        let entry = OperatorEntry {
            descriptor,
            factory: Arc::new(factory),
        };
        match self
            .entries
            .iter_mut()
            .find(|e| e.descriptor.keyword == entry.descriptor.keyword)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Returns descriptors for all registered operators.
    pub fn all_operators(&self) -> Vec<&OperatorDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    /// Returns descriptors for operators in a specific category.
    pub fn operators_in_category(&self, category: OperatorCategory) -> Vec<&OperatorDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.category == category)
            .map(|e| &e.descriptor)
            .collect()
    }

    /// Get a descriptor by keyword.
    pub fn get(&self, keyword: &str) -> Option<&OperatorDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.keyword == keyword)
            .map(|e| &e.descriptor)
    }

    /// Returns true if `keyword` names a registered operator.
    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    /// Create an operator with default parameters.
    pub fn create(&self, keyword: &str) -> Option<Box<dyn ChainOperator>> {
        self.entries
            .iter()
            .find(|e| e.descriptor.keyword == keyword)
            .map(|e| (e.factory)())
    }

    /// Find a 1-based parameter index by name for an operator type.
    ///
    /// Creates a temporary instance to scan the parameter names.
    pub fn param_index_by_name(&self, keyword: &str, param_name: &str) -> Option<usize> {
        self.create(keyword)?.find_parameter(param_name)
    }

    /// Returns the number of registered operators.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no operators are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Registry of all available controller sources.
#[derive(Clone)]
pub struct ControllerRegistry {
    entries: Vec<ControllerEntry>,
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.descriptor.keyword))
            .finish()
    }
}

impl Default for ControllerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerRegistry {
    /// Create a new registry with all built-in sources registered.
    pub fn new() -> Self {
        Self::with_stamps(StampServer::new())
    }

    /// Create a registry whose `ksv` sources read from `stamps`.
    pub fn with_stamps(stamps: StampServer) -> Self {
        let mut registry = Self {
            entries: Vec::new(),
        };
        registry.register_builtin_controllers(stamps);
        registry
    }

    /// Create a registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn register_builtin_controllers(&mut self, stamps: StampServer) {
        self.register(
            ControllerDescriptor {
                keyword: "kl",
                name: "Linear envelope",
                description: "Rises linearly from 0 to 1 and stays there",
                param_count: 1,
            },
            || Box::new(LinearEnvelope::default()),
        );
        self.register(
            ControllerDescriptor {
                keyword: "kl2",
                name: "Two-stage linear envelope",
                description: "Stays at 0, then rises linearly to 1",
                param_count: 2,
            },
            || Box::new(TwoStageLinearEnvelope::default()),
        );
        self.register(
            ControllerDescriptor {
                keyword: "klg",
                name: "Generic linear envelope",
                description: "Linear interpolation between user-defined points",
                param_count: 1,
            },
            || Box::new(GenericLinearEnvelope::default()),
        );
        self.register(
            ControllerDescriptor {
                keyword: "kos",
                name: "Sine oscillator",
                description: "Sine wave between 0 and 1",
                param_count: 2,
            },
            || Box::new(SineOscillator::default()),
        );
        self.register(
            ControllerDescriptor {
                keyword: "kog",
                name: "Generic oscillator",
                description: "Periodic sequence of user-defined values",
                param_count: 3,
            },
            || Box::new(GenericOscillator::default()),
        );
        self.register(
            ControllerDescriptor {
                keyword: "km",
                name: "MIDI controller",
                description: "Value of a MIDI continuous controller",
                param_count: 2,
            },
            || Box::new(MidiController::default()),
        );
        self.register(
            ControllerDescriptor {
                keyword: "ksv",
                name: "Volume analyzer",
                description: "RMS or average level of an audio stamp",
                param_count: 2,
            },
            move || Box::new(VolumeAnalyzer::with_server(stamps.clone(), 1, true)),
        );
    }

    /// Register a source, replacing any entry with the same keyword.
    pub fn register<F>(&mut self, descriptor: ControllerDescriptor, factory: F)
    where
        F: Fn() -> Box<dyn ControllerSource> + Send + Sync + 'static,
    {
        let entry = ControllerEntry {
            descriptor,
            factory: Arc::new(factory),
        };
        match self
            .entries
            .iter_mut()
            .find(|e| e.descriptor.keyword == entry.descriptor.keyword)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Returns descriptors for all registered sources.
    pub fn all_controllers(&self) -> Vec<&ControllerDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    /// Get a descriptor by keyword.
    pub fn get(&self, keyword: &str) -> Option<&ControllerDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.keyword == keyword)
            .map(|e| &e.descriptor)
    }

    /// Returns true if `keyword` names a registered source.
    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    /// Create a bare source with default parameters.
    pub fn create_source(&self, keyword: &str) -> Option<Box<dyn ControllerSource>> {
        self.entries
            .iter()
            .find(|e| e.descriptor.keyword == keyword)
            .map(|e| (e.factory)())
    }

    /// Create a controller wrapping a default source, targeting parameter 1
    /// over `[0, 1]`.
    pub fn create(&self, keyword: &str) -> Option<GenericController> {
        self.create_source(keyword)
            .map(GenericController::from_source)
    }

    /// Returns the number of registered sources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no sources are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What a keyword refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordKind {
    /// A chain operator.
    Operator,
    /// A controller source.
    Controller,
}

/// Operators, controllers and presets together: everything a chain string
/// can name.
#[derive(Debug, Clone)]
pub struct Registry {
    operators: OperatorRegistry,
    controllers: ControllerRegistry,
    presets: Vec<PresetDefinition>,
    stamps: StampServer,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates a registry holding every built-in operator and source, with
    /// one stamp table shared between them and no presets.
    pub fn new() -> Self {
        let stamps = StampServer::new();
        Self {
            operators: OperatorRegistry::with_stamps(stamps.clone()),
            controllers: ControllerRegistry::with_stamps(stamps.clone()),
            presets: Vec::new(),
            stamps,
        }
    }

    /// Combines separately built registries.
    ///
    /// Stamp sharing is whatever the parts were built with; the table
    /// returned by [`stamps`](Self::stamps) is a fresh one.
    pub fn from_parts(operators: OperatorRegistry, controllers: ControllerRegistry) -> Self {
        Self {
            operators,
            controllers,
            presets: Vec::new(),
            stamps: StampServer::new(),
        }
    }

    /// The stamp table shared by the built-in `eS` and `ksv`.
    pub fn stamps(&self) -> &StampServer {
        &self.stamps
    }

    /// Stores a preset definition, replacing any preset with the same name.
    pub fn register_preset(&mut self, name: impl Into<String>, definition: impl Into<String>) {
        let preset = PresetDefinition {
            name: name.into(),
            definition: definition.into(),
        };
        match self.presets.iter_mut().find(|p| p.name == preset.name) {
            Some(existing) => *existing = preset,
            None => self.presets.push(preset),
        }
    }

    /// Looks up a preset definition by name.
    pub fn preset(&self, name: &str) -> Option<&PresetDefinition> {
        self.presets.iter().find(|p| p.name == name)
    }

    /// Every stored preset, in registration order.
    pub fn presets(&self) -> &[PresetDefinition] {
        &self.presets
    }

    /// The chain operator half.
    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    /// The chain operator half, for registering more.
    pub fn operators_mut(&mut self) -> &mut OperatorRegistry {
        &mut self.operators
    }

    /// The controller half.
    pub fn controllers(&self) -> &ControllerRegistry {
        &self.controllers
    }

    /// The controller half, for registering more.
    pub fn controllers_mut(&mut self) -> &mut ControllerRegistry {
        &mut self.controllers
    }

    /// Classifies `keyword`. Controllers are checked first.
    pub fn lookup(&self, keyword: &str) -> Option<KeywordKind> {
        if self.controllers.contains(keyword) {
            Some(KeywordKind::Controller)
        } else if self.operators.contains(keyword) {
            Some(KeywordKind::Operator)
        } else {
            None
        }
    }

    /// Creates an operator and writes `values` to parameters 1, 2, ...
    ///
    /// Missing values keep their defaults; surplus values are ignored.
    pub fn create_operator(
        &self,
        keyword: &str,
        values: &[f32],
    ) -> Result<Box<dyn ChainOperator>, RegistryError> {
        let mut op = self
            .operators
            .create(keyword)
            .ok_or_else(|| RegistryError::UnknownOperator(keyword.to_string()))?;
        apply_values(op.as_mut(), values);
        Ok(op)
    }

    /// Creates a controller and writes `values` to its parameters:
    /// param-id, range-low, range-high, then the source's own.
    pub fn create_controller(
        &self,
        keyword: &str,
        values: &[f32],
    ) -> Result<GenericController, RegistryError> {
        let mut ctrl = self
            .controllers
            .create(keyword)
            .ok_or_else(|| RegistryError::UnknownController(keyword.to_string()))?;
        apply_values(&mut ctrl, values);
        Ok(ctrl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = OperatorRegistry::new();
        assert_eq!(registry.len(), 40);
        assert!(!registry.is_empty());
        assert_eq!(ControllerRegistry::new().len(), 7);
    }

    #[test]
    fn test_get_operator() {
        let registry = OperatorRegistry::new();

        let amp = registry.get("ea");
        assert!(amp.is_some());
        let amp = amp.unwrap();
        assert_eq!(amp.name, "Amplify");
        assert_eq!(amp.category, OperatorCategory::Amplitude);

        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_operators_by_category() {
        let registry = OperatorRegistry::new();

        let filters = registry.operators_in_category(OperatorCategory::Filter);
        let keywords: Vec<_> = filters.iter().map(|d| d.keyword).collect();
        assert_eq!(
            keywords,
            vec!["efl", "efh", "efb", "efr", "ef1", "ef3", "ef4", "efa", "efc", "efi", "efs"]
        );

        let time = registry.operators_in_category(OperatorCategory::TimeBased);
        assert_eq!(time.len(), 8);
        let modulation = registry.operators_in_category(OperatorCategory::Modulation);
        assert_eq!(modulation.len(), 3);
        for category in OperatorCategory::ALL {
            assert!(
                !registry.operators_in_category(category).is_empty(),
                "{category} is empty"
            );
        }
    }

    #[test]
    fn test_all_operators_can_be_created() {
        let registry = OperatorRegistry::new();
        for desc in registry.all_operators() {
            let op = registry.create(desc.keyword);
            assert!(op.is_some(), "failed to create -{}", desc.keyword);
            let op = op.unwrap();
            assert_eq!(op.keyword(), desc.keyword);
            assert_eq!(op.number_of_params(), desc.param_count, "-{}", desc.keyword);
        }
    }

    #[test]
    fn test_all_controllers_can_be_created() {
        let registry = ControllerRegistry::new();
        for desc in registry.all_controllers() {
            let source = registry.create_source(desc.keyword);
            assert!(source.is_some(), "failed to create -{}", desc.keyword);
            let source = source.unwrap();
            assert_eq!(source.keyword(), desc.keyword);
            assert_eq!(source.number_of_params(), desc.param_count, "-{}", desc.keyword);
        }
    }

    #[test]
    fn test_keywords_are_unique_across_registries() {
        let registry = Registry::new();
        for op in registry.operators().all_operators() {
            assert!(!registry.controllers().contains(op.keyword), "-{}", op.keyword);
        }
    }

    #[test]
    fn test_create_operator_applies_values() {
        let registry = Registry::new();
        let op = registry.create_operator("etd", &[250.0, 1.0]).unwrap();
        // Given values land positionally, the rest keep defaults.
        assert_eq!(op.get_parameter(1), 250.0);
        assert_eq!(op.get_parameter(2), 1.0);
        let defaults = registry.create_operator("etd", &[]).unwrap();
        assert_eq!(op.get_parameter(3), defaults.get_parameter(3));
        assert_eq!(op.get_parameter(4), defaults.get_parameter(4));
    }

    #[test]
    fn test_surplus_values_are_ignored() {
        let registry = Registry::new();
        let op = registry.create_operator("ea", &[50.0, 7.0, 9.0]).unwrap();
        assert_eq!(op.parameter_values(), vec![50.0]);
    }

    #[test]
    fn test_create_controller_applies_values() {
        let registry = Registry::new();
        let ctrl = registry
            .create_controller("kos", &[2.0, 10.0, 90.0, 0.25, 0.5])
            .unwrap();
        assert_eq!(ctrl.param_id(), 2);
        assert_eq!(ctrl.range(), (10.0, 90.0));
        assert_eq!(ctrl.source().get_parameter(1), 0.25);
        assert_eq!(ctrl.source().get_parameter(2), 0.5);
    }

    #[test]
    fn test_point_count_makes_room_for_points() {
        let registry = Registry::new();
        let ctrl = registry
            .create_controller("klg", &[1.0, 0.0, 1.0, 2.0, 0.0, 0.0, 1.0, 1.0])
            .unwrap();
        assert_eq!(ctrl.number_of_params(), 3 + 5);
        assert_eq!(ctrl.get_parameter(8), 1.0);
    }

    #[test]
    fn test_unknown_keywords() {
        let registry = Registry::new();
        assert_eq!(
            registry.create_operator("xyz", &[]).err(),
            Some(RegistryError::UnknownOperator("xyz".into()))
        );
        assert!(matches!(
            registry.create_controller("ea", &[]),
            Err(RegistryError::UnknownController(_))
        ));
        assert_eq!(registry.lookup("kos"), Some(KeywordKind::Controller));
        assert_eq!(registry.lookup("ea"), Some(KeywordKind::Operator));
        assert_eq!(registry.lookup("xyz"), None);
    }

    #[test]
    fn test_param_index_by_name() {
        let registry = OperatorRegistry::new();
        assert_eq!(registry.param_index_by_name("ec", "threshold-%"), Some(2));
        assert_eq!(registry.param_index_by_name("ec", "THRESHOLD-%"), Some(2));
        assert_eq!(registry.param_index_by_name("ec", "nope"), None);
        assert_eq!(registry.param_index_by_name("nope", "amp-%"), None);
    }

    #[test]
    fn test_register_replaces_existing_keyword() {
        let mut registry = OperatorRegistry::empty();
        assert!(registry.is_empty());
        let desc = OperatorDescriptor {
            keyword: "ea",
            name: "Gain",
            description: "Level",
            category: OperatorCategory::Amplitude,
            param_count: 1,
        };
        registry.register(desc.clone(), || Box::new(Amplify::default()));
        registry.register(
            OperatorDescriptor {
                name: "Boost",
                ..desc
            },
            || Box::new(Amplify::new(200.0)),
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("ea").map(|d| d.name), Some("Boost"));
        assert_eq!(registry.create("ea").map(|op| op.get_parameter(1)), Some(200.0));
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("filter".parse(), Ok(OperatorCategory::Filter));
        assert_eq!("time-based".parse(), Ok(OperatorCategory::TimeBased));
        assert_eq!("TimeBased".parse(), Ok(OperatorCategory::TimeBased));
        assert!("reverbs".parse::<OperatorCategory>().is_err());
        assert_eq!(OperatorCategory::TimeBased.to_string(), "Time-Based");
    }

    #[test]
    fn test_stamp_writer_and_reader_share_a_table() {
        let registry = Registry::new();
        let mut writer = registry.create_operator("eS", &[9.0]).unwrap();
        let mut reader = registry.create_controller("ksv", &[1.0, 0.0, 1.0, 9.0, 1.0]).unwrap();

        let mut block = catena_core::SampleBuffer::new(1, 4, 1000);
        block.channel_mut(0).fill(0.5);
        writer.init(&block);
        writer.process(&mut block);

        assert!(registry.stamps().contains(9));
        assert_eq!(reader.value(0.0), 0.5);
    }

    #[test]
    fn test_separate_registries_do_not_share_stamps() {
        let a = Registry::new();
        let b = Registry::new();
        let mut writer = a.create_operator("eS", &[1.0]).unwrap();
        let mut block = catena_core::SampleBuffer::new(1, 4, 1000);
        writer.process(&mut block);
        assert!(a.stamps().contains(1));
        assert!(b.stamps().is_empty());
    }

    #[test]
    fn test_preset_store() {
        let mut registry = Registry::new();
        assert!(registry.presets().is_empty());
        registry.register_preset("bright", "-efh:%cutoff -ea:120");
        registry.register_preset("dark", "-efl:800");
        registry.register_preset("bright", "-efh:2000");
        assert_eq!(registry.presets().len(), 2);
        assert_eq!(
            registry.preset("bright").map(|p| p.definition.as_str()),
            Some("-efh:2000")
        );
        assert!(registry.preset("missing").is_none());
    }

    #[test]
    fn test_registry_clones_keep_factories() {
        let registry = Registry::new();
        let copy = registry.clone();
        assert_eq!(copy.operators().len(), registry.operators().len());
        assert!(copy.create_operator("etl", &[]).is_ok());
    }
}
