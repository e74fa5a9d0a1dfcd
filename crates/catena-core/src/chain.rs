//! Ordered operator chains with attached controllers.
//!
//! A [`Chain`] owns its chain operators (processing order is insertion order)
//! and its controllers. Controllers name their target by handle
//! ([`ControllerTarget`]), so removing an operator can find and remove every
//! controller that would otherwise dangle, including controllers that
//! modulate those controllers.
//!
//! ## Lifecycle
//!
//! Editing happens on `&mut Chain`. Processing needs an
//! [`InitializedChain`], obtained from [`Chain::init`]. It borrows the chain
//! and the sample buffer for as long as it lives, so the chain cannot be
//! restructured mid-stream, and dropping it releases every operator.
//!
//! ```rust
//! use catena_core::{Chain, SampleBuffer};
//!
//! let mut chain = Chain::new("main");
//! let mut buffer = SampleBuffer::new(2, 256, 48000);
//! {
//!     let mut running = chain.init(&mut buffer, 2, 2);
//!     running.process();
//!     running.process();
//! }
//! assert_eq!(chain.position_in_samples(), 512);
//! assert!(!chain.is_initialized());
//! ```
//!
//! ## Selection
//!
//! Editing operations act on a current selection, mirroring an interactive
//! session: `add_chain_operator` selects the new operator and makes it the
//! target for the next `add_controller`. Out of range selections clear the
//! selection, and operations that need one become no-ops.

use std::fmt;

use crate::buffer::SampleBuffer;
use crate::chain_operator::ChainOperator;
use crate::controller::GenericController;
use crate::operator::Operator;

/// Stable handle to an operator in a [`Chain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperatorId(u32);

/// Stable handle to a controller in a [`Chain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerId(u32);

/// What a controller writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerTarget {
    /// A chain operator's parameter.
    Operator(OperatorId),
    /// Another controller's parameter (its range, or its source's).
    Controller(ControllerId),
}

#[derive(Clone)]
struct OperatorEntry {
    id: OperatorId,
    op: Box<dyn ChainOperator>,
}

#[derive(Clone)]
struct ControllerEntry {
    id: ControllerId,
    target: ControllerTarget,
    controller: GenericController,
}

/// An ordered sequence of chain operators plus their controllers.
#[derive(Clone)]
pub struct Chain {
    name: String,
    operators: Vec<OperatorEntry>,
    controllers: Vec<ControllerEntry>,
    selected_operator: Option<usize>,
    selected_controller: Option<usize>,
    target: Option<ControllerTarget>,
    input: Option<usize>,
    output: Option<usize>,
    muted: bool,
    initialized: bool,
    position: u64,
    sample_rate: u32,
    in_channels: usize,
    out_channels: usize,
    next_id: u32,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new("default")
    }
}

impl Chain {
    /// Creates an empty chain.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operators: Vec::new(),
            controllers: Vec::new(),
            selected_operator: None,
            selected_controller: None,
            target: None,
            input: None,
            output: None,
            muted: false,
            initialized: false,
            position: 0,
            sample_rate: 0,
            in_channels: 0,
            out_channels: 0,
            next_id: 0,
        }
    }

    /// Returns the chain name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the chain.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ---- chain operators ----

    /// Appends an operator, selects it and makes it the controller target.
    pub fn add_chain_operator(&mut self, op: Box<dyn ChainOperator>) -> OperatorId {
        let id = OperatorId(self.allocate_id());
        #[cfg(feature = "tracing")]
        tracing::debug!(chain = %self.name, keyword = op.keyword(), "operator added");
        self.operators.push(OperatorEntry { id, op });
        self.selected_operator = Some(self.operators.len() - 1);
        self.target = Some(ControllerTarget::Operator(id));
        self.initialized = false;
        id
    }

    /// Removes the selected operator and every controller that depends on it.
    ///
    /// Clears the selection and the controller target. No-op without a
    /// selection.
    pub fn remove_chain_operator(&mut self) {
        let Some(index) = self.selected_operator else {
            return;
        };
        let entry = self.operators.remove(index);
        #[cfg(feature = "tracing")]
        tracing::debug!(chain = %self.name, keyword = entry.op.keyword(), "operator removed");
        self.remove_dependents(ControllerTarget::Operator(entry.id));
        self.selected_operator = None;
        self.selected_controller = None;
        self.target = None;
        self.initialized = false;
    }

    /// Selects operator `index` (1-based). Out of range clears the selection.
    pub fn select_chain_operator(&mut self, index: usize) {
        self.selected_operator = (index >= 1 && index <= self.operators.len()).then(|| index - 1);
    }

    /// Returns the selected operator's 1-based index.
    pub fn selected_chain_operator(&self) -> Option<usize> {
        self.selected_operator.map(|i| i + 1)
    }

    /// Makes the selected operator the target for new controllers.
    pub fn selected_chain_operator_as_target(&mut self) {
        self.target = self
            .selected_operator
            .map(|i| ControllerTarget::Operator(self.operators[i].id));
    }

    /// Sets parameter `index` of the selected operator.
    ///
    /// Non-finite values are ignored.
    pub fn set_parameter(&mut self, index: usize, value: f32) {
        if !value.is_finite() {
            return;
        }
        if let Some(i) = self.selected_operator {
            self.operators[i].op.set_parameter(index, value);
        }
    }

    /// Reads parameter `index` of the selected operator, or 0.0.
    pub fn get_parameter(&self, index: usize) -> f32 {
        self.selected_operator
            .map(|i| self.operators[i].op.get_parameter(index))
            .unwrap_or(0.0)
    }

    /// Returns operator `index` (1-based).
    pub fn chain_operator(&self, index: usize) -> Option<&dyn ChainOperator> {
        index
            .checked_sub(1)
            .and_then(|i| self.operators.get(i))
            .map(|e| e.op.as_ref())
    }

    /// Returns operator `index` (1-based) mutably.
    pub fn chain_operator_mut(&mut self, index: usize) -> Option<&mut dyn ChainOperator> {
        match index.checked_sub(1).and_then(|i| self.operators.get_mut(i)) {
            Some(entry) => Some(entry.op.as_mut()),
            None => None,
        }
    }

    /// Returns the handle of operator `index` (1-based).
    pub fn operator_id(&self, index: usize) -> Option<OperatorId> {
        index
            .checked_sub(1)
            .and_then(|i| self.operators.get(i))
            .map(|e| e.id)
    }

    /// Returns the 1-based index of the operator with handle `id`.
    pub fn operator_index(&self, id: OperatorId) -> Option<usize> {
        self.operators.iter().position(|e| e.id == id).map(|i| i + 1)
    }

    /// Returns the number of chain operators.
    pub fn number_of_chain_operators(&self) -> usize {
        self.operators.len()
    }

    /// Returns true if the chain has at least one operator.
    pub fn is_processing(&self) -> bool {
        !self.operators.is_empty()
    }

    // ---- controllers ----

    /// Attaches a controller to the current target and selects it.
    ///
    /// Returns `None`, dropping the controller, when there is no target.
    pub fn add_controller(&mut self, controller: GenericController) -> Option<ControllerId> {
        let Some(target) = self.target else {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                chain = %self.name,
                keyword = controller.keyword(),
                "controller has no target, ignored"
            );
            return None;
        };
        let id = ControllerId(self.allocate_id());
        #[cfg(feature = "tracing")]
        tracing::debug!(chain = %self.name, keyword = controller.keyword(), ?target, "controller added");
        self.controllers.push(ControllerEntry {
            id,
            target,
            controller,
        });
        self.selected_controller = Some(self.controllers.len() - 1);
        self.initialized = false;
        Some(id)
    }

    /// Removes the selected controller and every controller targeting it.
    pub fn remove_controller(&mut self) {
        let Some(index) = self.selected_controller else {
            return;
        };
        let entry = self.controllers.remove(index);
        self.remove_dependents(ControllerTarget::Controller(entry.id));
        self.selected_controller = None;
        if self.target.is_some_and(|t| !self.target_exists(t)) {
            self.target = None;
        }
    }

    /// Selects controller `index` (1-based). Out of range clears the selection.
    pub fn select_controller(&mut self, index: usize) {
        self.selected_controller =
            (index >= 1 && index <= self.controllers.len()).then(|| index - 1);
    }

    /// Returns the selected controller's 1-based index.
    pub fn selected_controller(&self) -> Option<usize> {
        self.selected_controller.map(|i| i + 1)
    }

    /// Makes the selected controller the target for new controllers.
    pub fn selected_controller_as_target(&mut self) {
        self.target = self
            .selected_controller
            .map(|i| ControllerTarget::Controller(self.controllers[i].id));
    }

    /// Returns the target the next controller will attach to.
    pub fn current_target(&self) -> Option<ControllerTarget> {
        self.target
    }

    /// Sets parameter `index` of the selected controller.
    ///
    /// Non-finite values are ignored.
    pub fn set_controller_parameter(&mut self, index: usize, value: f32) {
        if !value.is_finite() {
            return;
        }
        if let Some(i) = self.selected_controller {
            self.controllers[i].controller.set_parameter(index, value);
        }
    }

    /// Reads parameter `index` of the selected controller, or 0.0.
    pub fn get_controller_parameter(&self, index: usize) -> f32 {
        self.selected_controller
            .map(|i| self.controllers[i].controller.get_parameter(index))
            .unwrap_or(0.0)
    }

    /// Returns controller `index` (1-based).
    pub fn controller(&self, index: usize) -> Option<&GenericController> {
        index
            .checked_sub(1)
            .and_then(|i| self.controllers.get(i))
            .map(|e| &e.controller)
    }

    /// Returns controller `index` (1-based) mutably.
    pub fn controller_mut(&mut self, index: usize) -> Option<&mut GenericController> {
        index
            .checked_sub(1)
            .and_then(|i| self.controllers.get_mut(i))
            .map(|e| &mut e.controller)
    }

    /// Returns what controller `index` (1-based) writes to.
    pub fn controller_target(&self, index: usize) -> Option<ControllerTarget> {
        index
            .checked_sub(1)
            .and_then(|i| self.controllers.get(i))
            .map(|e| e.target)
    }

    /// Returns the handle of controller `index` (1-based).
    pub fn controller_id(&self, index: usize) -> Option<ControllerId> {
        index
            .checked_sub(1)
            .and_then(|i| self.controllers.get(i))
            .map(|e| e.id)
    }

    /// Returns the 1-based index of the controller with handle `id`.
    pub fn controller_index(&self, id: ControllerId) -> Option<usize> {
        self.controllers.iter().position(|e| e.id == id).map(|i| i + 1)
    }

    /// Returns the number of controllers.
    pub fn number_of_controllers(&self) -> usize {
        self.controllers.len()
    }

    fn target_exists(&self, target: ControllerTarget) -> bool {
        match target {
            ControllerTarget::Operator(id) => self.operators.iter().any(|e| e.id == id),
            ControllerTarget::Controller(id) => self.controllers.iter().any(|e| e.id == id),
        }
    }

    /// Removes every controller reachable from `root` through target links.
    fn remove_dependents(&mut self, root: ControllerTarget) {
        let mut doomed: Vec<ControllerTarget> = vec![root];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let current = doomed[cursor];
            for entry in &self.controllers {
                let as_target = ControllerTarget::Controller(entry.id);
                if entry.target == current && !doomed.contains(&as_target) {
                    doomed.push(as_target);
                }
            }
            cursor += 1;
        }
        let before = self.controllers.len();
        self.controllers
            .retain(|e| !doomed.contains(&ControllerTarget::Controller(e.id)));
        if self.controllers.len() != before {
            self.selected_controller = None;
            #[cfg(feature = "tracing")]
            tracing::debug!(
                chain = %self.name,
                removed = before - self.controllers.len(),
                "dependent controllers removed"
            );
        }
    }

    // ---- state ----

    /// Mutes or unmutes the chain. A muted chain outputs silence.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Flips the mute state.
    pub fn toggle_muting(&mut self) {
        self.muted = !self.muted;
        #[cfg(feature = "tracing")]
        tracing::debug!(chain = %self.name, muted = self.muted, "mute toggled");
    }

    /// Returns true if the chain is muted.
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Returns true while an [`InitializedChain`] is alive.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Connects the chain to input `index` of the surrounding engine.
    pub fn connect_input(&mut self, index: usize) {
        self.input = Some(index);
    }

    /// Connects the chain to output `index` of the surrounding engine.
    pub fn connect_output(&mut self, index: usize) {
        self.output = Some(index);
    }

    /// Clears the input connection.
    pub fn disconnect_input(&mut self) {
        self.input = None;
    }

    /// Clears the output connection.
    pub fn disconnect_output(&mut self) {
        self.output = None;
    }

    /// Returns the connected input index.
    pub fn connected_input(&self) -> Option<usize> {
        self.input
    }

    /// Returns the connected output index.
    pub fn connected_output(&self) -> Option<usize> {
        self.output
    }

    /// Returns true if both input and output are connected.
    pub fn is_valid(&self) -> bool {
        self.input.is_some() && self.output.is_some()
    }

    /// Returns the number of frames processed since the start or last seek.
    pub fn position_in_samples(&self) -> u64 {
        self.position
    }

    /// Returns the position in seconds at the last initialised sample rate.
    pub fn position_in_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.position as f64 / f64::from(self.sample_rate)
    }

    /// Moves the chain position. Position-aware controllers follow it.
    pub fn seek(&mut self, position_in_samples: u64) {
        self.position = position_in_samples;
    }

    /// Channel count leaving the chain for `input_channels` input channels.
    pub fn output_channels(&self, input_channels: usize) -> usize {
        self.operators
            .iter()
            .fold(input_channels, |ch, e| e.op.output_channels(ch))
    }

    /// Block length leaving the chain for `input_samples` input frames.
    pub fn output_samples(&self, input_samples: usize) -> usize {
        self.operators
            .iter()
            .fold(input_samples, |n, e| e.op.output_samples(n))
    }

    /// Channel counts passed to the last [`init`](Self::init).
    pub fn channel_config(&self) -> (usize, usize) {
        (self.in_channels, self.out_channels)
    }

    /// Drops every operator and controller and resets selection and flags.
    pub fn clear(&mut self) {
        self.operators.clear();
        self.controllers.clear();
        self.selected_operator = None;
        self.selected_controller = None;
        self.target = None;
        self.initialized = false;
    }

    /// Multi-line summary of operators, controllers and state.
    pub fn status(&self) -> String {
        let mut out = format!(
            "chain \"{}\": {} operator(s), {} controller(s){}\n",
            self.name,
            self.operators.len(),
            self.controllers.len(),
            if self.muted { ", muted" } else { "" }
        );
        for (i, entry) in self.operators.iter().enumerate() {
            out.push_str(&format!("  {}. {} (-{})", i + 1, entry.op.name(), entry.op.keyword()));
            let status = entry.op.status();
            if !status.is_empty() {
                out.push_str(&format!(": {status}"));
            }
            out.push('\n');
        }
        for (i, entry) in self.controllers.iter().enumerate() {
            out.push_str(&format!("  c{}. {}\n", i + 1, entry.controller.status()));
        }
        out
    }

    // ---- processing ----

    /// Binds `buffer`, initialises every operator and controller and returns
    /// the handle that drives processing.
    ///
    /// The buffer's channel count is set to `in_channels`; each operator is
    /// initialised at the current count, which then becomes its
    /// `output_channels`. Every parameter is written back to itself so
    /// operators can recompute derived state, and every controller is seeded
    /// from its target's current value.
    pub fn init<'a>(
        &'a mut self,
        buffer: &'a mut SampleBuffer,
        in_channels: usize,
        out_channels: usize,
    ) -> InitializedChain<'a> {
        self.bind(buffer, in_channels, out_channels);
        InitializedChain {
            chain: self,
            buffer,
        }
    }

    /// Initialises operators and controllers against `buffer` without
    /// handing out a processing handle. Used by [`init`](Self::init) and by
    /// operators that run whole chains inside their own block.
    pub(crate) fn bind(
        &mut self,
        buffer: &mut SampleBuffer,
        in_channels: usize,
        out_channels: usize,
    ) {
        self.in_channels = in_channels;
        self.out_channels = out_channels;
        self.sample_rate = buffer.sample_rate();

        let mut channels = in_channels;
        buffer.set_channel_count(channels);
        for entry in &mut self.operators {
            entry.op.init(buffer);
            channels = entry.op.output_channels(channels);
            buffer.set_channel_count(channels);
        }
        self.refresh_parameters();

        let step = buffer.length_in_seconds();
        for i in 0..self.controllers.len() {
            let entry = &self.controllers[i];
            let current = self.read_target(entry.target, entry.controller.param_id());
            self.controllers[i].controller.init(step, current);
        }
        self.initialized = true;

        #[cfg(feature = "tracing")]
        tracing::info!(
            chain = %self.name,
            operators = self.operators.len(),
            controllers = self.controllers.len(),
            in_channels,
            out_channels = channels,
            "chain initialized"
        );
    }

    /// Runs controllers, then operators (or silence when muted), on one
    /// block and advances the position.
    pub(crate) fn process_block(&mut self, buffer: &mut SampleBuffer) {
        let frames = buffer.frame_count();
        self.controller_update();
        if self.muted {
            buffer.make_silent();
        } else {
            for entry in &mut self.operators {
                let channels = entry.op.output_channels(buffer.channel_count());
                buffer.set_channel_count(channels);
                entry.op.process(buffer);
            }
        }
        self.position += frames as u64;
    }

    /// Releases every operator and marks the chain uninitialised.
    pub(crate) fn unbind(&mut self) {
        for entry in &mut self.operators {
            entry.op.release();
        }
        self.initialized = false;
    }

    fn refresh_parameters(&mut self) {
        for entry in &mut self.operators {
            for i in 1..=entry.op.number_of_params() {
                let value = entry.op.get_parameter(i);
                entry.op.set_parameter(i, value);
            }
        }
    }

    fn read_target(&self, target: ControllerTarget, param: usize) -> f32 {
        match target {
            ControllerTarget::Operator(id) => self
                .operators
                .iter()
                .find(|e| e.id == id)
                .map(|e| e.op.get_parameter(param))
                .unwrap_or(0.0),
            ControllerTarget::Controller(id) => self
                .controllers
                .iter()
                .find(|e| e.id == id)
                .map(|e| e.controller.get_parameter(param))
                .unwrap_or(0.0),
        }
    }

    fn write_target(&mut self, target: ControllerTarget, param: usize, value: f32) {
        if !value.is_finite() {
            return;
        }
        match target {
            ControllerTarget::Operator(id) => {
                if let Some(e) = self.operators.iter_mut().find(|e| e.id == id) {
                    e.op.set_parameter(param, value);
                }
            }
            ControllerTarget::Controller(id) => {
                if let Some(e) = self.controllers.iter_mut().find(|e| e.id == id) {
                    e.controller.set_parameter(param, value);
                }
            }
        }
    }

    /// Runs every controller once, in insertion order.
    fn controller_update(&mut self) {
        let position = self.position_in_seconds();
        for i in 0..self.controllers.len() {
            let entry = &mut self.controllers[i];
            let value = entry.controller.value(position);
            let (target, param) = (entry.target, entry.controller.param_id());
            self.write_target(target, param, value);
        }
    }

    fn fmt_controller(
        &self,
        f: &mut fmt::Formatter<'_>,
        entry: &ControllerEntry,
        depth: usize,
    ) -> fmt::Result {
        write!(f, " ")?;
        for _ in 0..depth {
            write!(f, "-kx ")?;
        }
        write_clause(f, &entry.controller, None)?;
        let me = ControllerTarget::Controller(entry.id);
        for child in self.controllers.iter().filter(|c| c.target == me) {
            self.fmt_controller(f, child, depth + 1)?;
        }
        Ok(())
    }
}

/// Writes `-keyword[:label][,value...]`.
///
/// A non-finite value cannot be read back by the parser, so it is written
/// as 0.
fn write_clause<O: Operator + ?Sized>(
    f: &mut fmt::Formatter<'_>,
    op: &O,
    label: Option<&str>,
) -> fmt::Result {
    write!(f, "-{}", op.keyword())?;
    let mut first = true;
    if let Some(label) = label {
        write!(f, ":{label}")?;
        first = false;
    }
    for i in 1..=op.number_of_params() {
        let sep = if first { ':' } else { ',' };
        first = false;
        let value = op.get_parameter(i);
        let value = if value.is_finite() { value } else { 0.0 };
        write!(f, "{sep}{value}")?;
    }
    Ok(())
}

/// Writes the chain string: each operator clause followed by the clauses of
/// the controllers attached to it.
///
/// A controller that targets another controller is preceded by one `-kx`
/// marker per level of nesting, so `-efl:800 -kos:1,400,1200,0.5,0 -kx
/// -kl:3,0.1,2,4` reads as "a sine on the cutoff, with a ramp on the sine's
/// upper range limit".
impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.operators.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write_clause(f, entry.op.as_ref(), entry.op.label())?;
            let me = ControllerTarget::Operator(entry.id);
            for ctrl in self.controllers.iter().filter(|c| c.target == me) {
                self.fmt_controller(f, ctrl, 0)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keywords: Vec<&str> = self.operators.iter().map(|e| e.op.keyword()).collect();
        f.debug_struct("Chain")
            .field("name", &self.name)
            .field("operators", &keywords)
            .field("controllers", &self.controllers.len())
            .field("muted", &self.muted)
            .field("position", &self.position)
            .finish()
    }
}

/// A chain bound to a buffer and ready to process.
///
/// Returned by [`Chain::init`]. Dropping it releases every operator and
/// marks the chain uninitialised.
pub struct InitializedChain<'a> {
    chain: &'a mut Chain,
    buffer: &'a mut SampleBuffer,
}

impl InitializedChain<'_> {
    /// Processes one block in place.
    ///
    /// Controllers always run first, muted or not, so un-muting resumes in
    /// phase. A muted chain then zeroes the buffer; otherwise every operator
    /// runs in order, with the channel count set to its `output_channels`
    /// just before it runs.
    pub fn process(&mut self) {
        self.chain.process_block(&mut *self.buffer);
    }

    /// Runs every controller once without processing audio.
    pub fn controller_update(&mut self) {
        self.chain.controller_update();
    }

    /// Returns the bound buffer.
    pub fn buffer(&self) -> &SampleBuffer {
        &*self.buffer
    }

    /// Returns the bound buffer mutably, to refill it between ticks.
    pub fn buffer_mut(&mut self) -> &mut SampleBuffer {
        &mut *self.buffer
    }

    /// Returns the chain for inspection.
    pub fn chain(&self) -> &Chain {
        &*self.chain
    }

    /// Mutes or unmutes the running chain.
    pub fn set_muted(&mut self, muted: bool) {
        self.chain.set_muted(muted);
    }

    /// Flips the mute state of the running chain.
    pub fn toggle_muting(&mut self) {
        self.chain.toggle_muting();
    }

    /// Moves the running chain's position.
    pub fn seek(&mut self, position_in_samples: u64) {
        self.chain.seek(position_in_samples);
    }

    /// Sets a parameter of operator `op_index` (both 1-based).
    pub fn set_parameter(&mut self, op_index: usize, index: usize, value: f32) {
        if let Some(op) = self.chain.chain_operator_mut(op_index) {
            op.set_parameter(index, value);
        }
    }

    /// Releases the operators now instead of at drop.
    pub fn release(self) {}
}

impl Drop for InitializedChain<'_> {
    fn drop(&mut self) {
        self.chain.unbind();
        #[cfg(feature = "tracing")]
        tracing::debug!(chain = %self.chain.name, "chain released");
    }
}
