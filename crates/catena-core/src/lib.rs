//! Catena Core - chains, chain operators and parameter controllers
//!
//! This crate defines the processing model every other catena crate builds
//! on: a block of audio flows through an ordered chain of operators, while
//! controllers rewrite operator parameters once per block.
//!
//! # Core Abstractions
//!
//! ## Buffers
//!
//! - [`SampleBuffer`] - `[channel][frame]` audio block with a sample rate
//! - [`ChannelCursor`], [`ChannelsCursor`], [`InterleavedCursor`] - layout
//!   independent sample traversal
//!
//! ## Operators
//!
//! - [`Operator`] - names plus a 1-based, runtime-introspectable parameter list
//! - [`ParamDescriptor`] - bounds, default and flags of one parameter
//! - [`ChainOperator`] - `init` / `process` / `output_channels` block contract
//!
//! ## Control
//!
//! - [`ControllerSource`] - scalar generator advanced once per tick
//! - [`GenericController`] - rescales a source into `[low, high]` and writes
//!   it to a target parameter
//!
//! ## Stamps
//!
//! - [`StampServer`] - shared table of the latest block seen at each stamp
//!   id, written by one chain and read by analysers in another
//!
//! ## Chains
//!
//! - [`Chain`] - owns operators and controllers, editable by selection
//! - [`InitializedChain`] - the only way to process; returned by
//!   [`Chain::init`]
//! - [`Preset`] - a chain (or parallel chains) packaged as one operator
//!
//! # Example
//!
//! ```rust,ignore
//! use catena_core::{Chain, SampleBuffer};
//!
//! let mut chain = Chain::new("main");
//! chain.add_chain_operator(Box::new(amplify));
//! chain.add_controller(GenericController::new(Box::new(sine), 1, 50.0, 150.0));
//!
//! let mut buffer = SampleBuffer::new(2, 1024, 48000);
//! let mut running = chain.init(&mut buffer, 2, 2);
//! loop {
//!     // refill running.buffer_mut() from the input
//!     running.process();
//!     // drain running.buffer() to the output
//! }
//! ```
//!
//! # Error Policy
//!
//! Nothing here fails at processing time. Invalid parameter indices read 0.0
//! and ignore writes; operations that need a selection do nothing without
//! one. Construction errors belong to the registry and parser crates.
//!
//! # Features
//!
//! - `tracing`: chain lifecycle events through the `tracing` crate

pub mod buffer;
pub mod chain;
pub mod chain_operator;
pub mod controller;
pub mod iter;
pub mod operator;
pub mod preset;
pub mod stamp;

pub use buffer::{MAX_AMPLITUDE, MAX_CHANNELS, Sample, SampleBuffer};
pub use chain::{Chain, ControllerId, ControllerTarget, InitializedChain, OperatorId};
pub use chain_operator::ChainOperator;
pub use controller::{CONTROLLER_PARAMS, ControllerSource, GenericController, SourceClock};
pub use iter::{ChannelCursor, ChannelsCursor, InterleavedCursor};
pub use operator::{Operator, ParamDescriptor, ParamFlags, ParamScale, param_names};
pub use preset::{Preset, PresetOrigin, PresetParam, PresetSlot};
pub use stamp::StampServer;
