//! Catena Controllers - controller sources
//!
//! Sources produce one scalar per chain block. Wrapped in a
//! [`catena_core::GenericController`], the scalar is rescaled into a range
//! and written to a parameter of an operator or of another controller.
//!
//! | Keyword | Type | Output |
//! |---------|------|--------|
//! | `kl` | [`LinearEnvelope`] | 0 to 1 ramp, then 1 |
//! | `kl2` | [`TwoStageLinearEnvelope`] | 0, then a ramp, then 1 |
//! | `klg` | [`GenericLinearEnvelope`] | interpolated user points |
//! | `kos` | [`SineOscillator`] | sine between 0 and 1 |
//! | `kog` | [`GenericOscillator`] | looped user values |
//! | `km` | [`MidiController`] | last MIDI CC value / 127 |
//! | `ksv` | [`VolumeAnalyzer`] | level of an audio stamp |
//!
//! All envelope and oscillator sources are position aware: their output is a
//! function of the chain position, so seeking a chain moves them too. They
//! also ignore the seed a controller offers from its target's current value;
//! the MIDI and stamp sources hold that seed until their first reading.
//!
//! ## Example
//!
//! ```rust
//! use catena_controllers::SineOscillator;
//! use catena_core::{ControllerSource, GenericController};
//!
//! // 0.5 Hz sweep of parameter 1 between 200 and 800.
//! let sine = SineOscillator::new(0.5, 0.0);
//! let mut ctrl = GenericController::new(Box::new(sine), 1, 200.0, 800.0);
//! ctrl.init(0.5, 500.0);
//! assert_eq!(ctrl.value(0.0), 500.0);
//! assert!(ctrl.source().is_position_aware());
//! ```

pub mod envelope;
pub mod midi;
pub mod oscillator;
pub mod volume;

pub use envelope::{
    GenericLinearEnvelope, LinearEnvelope, MAX_ENVELOPE_POINTS, TwoStageLinearEnvelope,
};
pub use midi::{MIDI_CHANNELS, MIDI_CONTROLLERS, MidiCcTable, MidiController};
pub use oscillator::{GenericOscillator, MAX_OSCILLATOR_POINTS, OscillatorMode, SineOscillator};
pub use volume::VolumeAnalyzer;
