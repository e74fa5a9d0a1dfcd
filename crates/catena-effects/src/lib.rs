//! Catena Effects - chain operator implementations
//!
//! Every type here implements [`catena_core::ChainOperator`] and is
//! addressable from a chain string by its keyword:
//!
//! | Keyword | Type | Module |
//! |---------|------|--------|
//! | `ea` | [`Amplify`] | [`amplitude`] |
//! | `eac` | [`AmplifyChannel`] | [`amplitude`] |
//! | `eal` | [`Limiter`] | [`amplitude`] |
//! | `eaw` | [`AmplifyClipCount`] | [`amplitude`] |
//! | `ec` | [`Compress`] | [`dynamics`] |
//! | `enm` | [`NoiseGate`] | [`dynamics`] |
//! | `epp` | [`NormalPan`] | [`mixing`] |
//! | `erc` | [`ChannelCopy`] | [`mixing`] |
//! | `erm` | [`MixToChannel`] | [`mixing`] |
//! | `efl` `efh` `efb` `efr` | [`Lowpass`] [`Highpass`] [`Bandpass`] [`Bandreject`] | [`filter`] |
//! | `etd` | [`Delay`] | [`timebased`] |
//! | `etm` | [`MultitapDelay`] | [`timebased`] |
//! | `etf` | [`FakeStereo`] | [`timebased`] |
//! | `etr` | [`Reverb`] | [`timebased`] |
//! | `ete` | [`AdvancedReverb`] | [`reverb`] |
//! | `ev` | [`VolumeBuckets`] | [`analysis`] |
//! | `ezf` | [`DcFind`] | [`analysis`] |
//! | `ezx` | [`DcFix`] | [`analysis`] |
//! | `gc` | [`TimeCropGate`] | [`gate`] |
//! | `ge` | [`ThresholdGate`] | [`gate`] |
//! | `ei` | [`PitchShift`] | [`pitch`] |
//! | `eca` | [`AdvancedCompressor`] | [`dynamics`] |
//! | `eemb` `eemp` | [`PulseGateBpm`] [`PulseGate`] | [`modulation`] |
//! | `eemt` | [`Tremolo`] | [`modulation`] |
//! | `ef1` `efs` | [`ResonantBandpass`] [`Resonator`] | [`resonant`] |
//! | `ef3` `ef4` | [`ResonantLowpass`] [`RcLowpass`] | [`resonant`] |
//! | `efa` | [`Allpass`] | [`comb`] |
//! | `efc` `efi` | [`CombFilter`] [`InverseCombFilter`] | [`comb`] |
//! | `etc` `etl` `etp` | [`Chorus`] [`Flanger`] [`Phaser`] | [`modulated`] |
//! | `evp` | [`VolumePeak`] | [`analysis`] |
//! | `eS` | [`AudioStamp`] | [`stamp`] |
//!
//! ## Conventions
//!
//! - Parameters are 1-based and stored in the units the user typed, so a
//!   value read back equals the value written (integer parameters truncate).
//! - Operators that keep per-channel state size it in `init` and grow it in
//!   `process` if a later block carries more channels.
//! - Time constants given in milliseconds are converted with the sample rate
//!   seen at `init`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use catena_core::{Chain, SampleBuffer};
//! use catena_effects::{Amplify, Lowpass, NormalPan};
//!
//! let mut chain = Chain::new("main");
//! chain.add_chain_operator(Box::new(Amplify::new(80.0)));
//! chain.add_chain_operator(Box::new(Lowpass::new(4000.0)));
//! chain.add_chain_operator(Box::new(NormalPan::new(30.0)));
//!
//! let mut buffer = SampleBuffer::new(1, 512, 48000);
//! let mut running = chain.init(&mut buffer, 1, 2);
//! running.process();
//! ```

pub mod amplitude;
pub mod analysis;
pub mod comb;
pub mod dynamics;
pub mod filter;
pub mod gate;
pub mod mixing;
pub mod modulated;
pub mod modulation;
pub mod pitch;
pub mod resonant;
pub mod reverb;
pub mod stamp;
pub mod timebased;

pub use amplitude::{Amplify, AmplifyChannel, AmplifyClipCount, Limiter};
pub use analysis::{DcFind, DcFix, PeakStats, VolumeBuckets, VolumePeak};
pub use comb::{Allpass, CombFilter, InverseCombFilter};
pub use dynamics::{AdvancedCompressor, Compress, GatePhase, NoiseGate};
pub use filter::{Bandpass, Bandreject, Highpass, Lowpass};
pub use gate::{GateState, ThresholdGate, TimeCropGate};
pub use mixing::{ChannelCopy, MixToChannel, NormalPan};
pub use modulated::{Chorus, Flanger, Phaser};
pub use modulation::{PulseGate, PulseGateBpm, Tremolo};
pub use pitch::{MIN_CHANGE_PERCENT, PitchShift};
pub use resonant::{RcLowpass, ResonantBandpass, ResonantLowpass, Resonator};
pub use reverb::AdvancedReverb;
pub use stamp::AudioStamp;
pub use timebased::{
    Delay, FakeStereo, MAX_DELAY_SAMPLES, MultitapDelay, Reverb, SurroundMode,
};
