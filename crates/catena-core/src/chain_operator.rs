//! The block processing contract for audio transforms.
//!
//! A [`ChainOperator`] is an [`Operator`] that rewrites a [`SampleBuffer`] in
//! place, one block per tick. Chains hold operators as
//! `Box<dyn ChainOperator>`; boxes clone through [`dyn_clone`], producing an
//! independent copy with its own internal state.
//!
//! ## Lifecycle
//!
//! `constructed -> init -> process (repeated) -> release`, and `init` again
//! after a release or a shape change. The ordering is enforced by
//! [`Chain::init`](crate::Chain::init): only the
//! [`InitializedChain`](crate::InitializedChain) it returns can call
//! `process`.
//!
//! ## Shape changes
//!
//! Before each operator runs, the chain sets the buffer's channel count to
//! [`output_channels`](ChainOperator::output_channels) of the current count,
//! so an operator forcing stereo sees two channels (the added one silent)
//! and every later operator sees the new count. Operators that change the
//! block length resize the buffer themselves and report it through
//! [`output_samples`](ChainOperator::output_samples).

use dyn_clone::DynClone;

use crate::buffer::SampleBuffer;
use crate::operator::Operator;

/// Stateful audio transform driven block by block.
///
/// # Example
///
/// ```rust
/// use std::borrow::Cow;
/// use catena_core::{ChainOperator, Operator, SampleBuffer, param_names};
///
/// #[derive(Clone)]
/// struct Invert;
///
/// impl Operator for Invert {
///     fn name(&self) -> &str { "Invert" }
///     fn keyword(&self) -> &str { "inv" }
///     fn parameter_names(&self) -> Vec<Cow<'static, str>> { Vec::new() }
///     fn set_parameter(&mut self, _index: usize, _value: f32) {}
///     fn get_parameter(&self, _index: usize) -> f32 { 0.0 }
/// }
///
/// impl ChainOperator for Invert {
///     fn init(&mut self, _buffer: &SampleBuffer) {}
///
///     fn process(&mut self, buffer: &mut SampleBuffer) {
///         for channel in buffer.channels_mut() {
///             channel.iter_mut().for_each(|s| *s = -*s);
///         }
///     }
/// }
///
/// let ops: Vec<Box<dyn ChainOperator>> = vec![Box::new(Invert)];
/// let copy = ops.clone();
/// assert_eq!(copy[0].keyword(), "inv");
/// ```
pub trait ChainOperator: Operator + DynClone + Send {
    /// Binds to the buffer's channel count and sample rate.
    ///
    /// Allocates any per-channel state. Called again whenever the chain is
    /// re-initialised.
    fn init(&mut self, buffer: &SampleBuffer);

    /// Transforms the buffer in place.
    ///
    /// Never fails; a misconfigured operator degrades to passing audio
    /// through or producing silence.
    fn process(&mut self, buffer: &mut SampleBuffer);

    /// Channel count produced from `input_channels` input channels.
    fn output_channels(&self, input_channels: usize) -> usize {
        input_channels
    }

    /// Frame count produced from `input_samples` input frames.
    fn output_samples(&self, input_samples: usize) -> usize {
        input_samples
    }

    /// Drops buffer-bound state. The operator may be initialised again.
    fn release(&mut self) {}

    /// Human-readable status (analysis results, counters). Empty by default.
    fn status(&self) -> String {
        String::new()
    }

    /// Text written between the keyword and the values when the chain is
    /// printed, e.g. the preset name in `-pn:wah,0.5`. `None` for operators
    /// that are fully described by their values.
    fn label(&self) -> Option<&str> {
        None
    }
}

dyn_clone::clone_trait_object!(ChainOperator);
