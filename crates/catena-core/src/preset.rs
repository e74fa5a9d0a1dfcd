//! Chains packaged as a single chain operator.
//!
//! A [`Preset`] wraps one or more [`Chain`]s that were built from a preset
//! definition such as `-efl:%cutoff -ea:120 | -efh:2000`. Each `|`-separated
//! part becomes a branch. Every branch receives its own copy of the incoming
//! block and the branch outputs are averaged, so a single-branch preset is
//! a plain serial chain and a multi-branch preset is a parallel mix.
//!
//! `%name` placeholders in the definition become the preset's own
//! parameters: [`PresetParam`] records which branch, which operator or
//! controller, and which parameter each one routes to. Setting a preset
//! parameter writes straight through to that inner parameter.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::buffer::SampleBuffer;
use crate::chain::Chain;
use crate::chain_operator::ChainOperator;
use crate::operator::{Operator, ParamDescriptor};

/// Where a preset's definition came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetOrigin {
    /// A named entry in a preset store (`-pn:name`).
    Named(String),
    /// A definition read from a file (`-pf:path`).
    File(PathBuf),
}

impl PresetOrigin {
    /// Chain-string keyword for this origin.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Named(_) => "pn",
            Self::File(_) => "pf",
        }
    }

    /// Text written after the keyword: the name or the path.
    pub fn label(&self) -> String {
        match self {
            Self::Named(name) => name.clone(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// What a preset parameter writes to inside a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetSlot {
    /// Operator `n` (1-based) of the branch.
    Operator(usize),
    /// Controller `n` (1-based) of the branch.
    Controller(usize),
}

/// One `%name` placeholder of a preset definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetParam {
    /// Name without the leading `%`.
    pub name: String,
    /// Branch index (0-based).
    pub branch: usize,
    /// Operator or controller within the branch.
    pub slot: PresetSlot,
    /// Parameter index (1-based) on that operator or controller.
    pub param: usize,
}

/// A chain, or several parallel chains, behaving as one chain operator.
#[derive(Clone, Debug)]
pub struct Preset {
    origin: PresetOrigin,
    label: String,
    definition: String,
    branches: Vec<Chain>,
    params: Vec<PresetParam>,
    scratch: Vec<SampleBuffer>,
    in_channels: usize,
}

impl Preset {
    /// Wraps prebuilt branches.
    ///
    /// Parameters whose branch index is out of range are dropped.
    pub fn new(
        origin: PresetOrigin,
        definition: impl Into<String>,
        branches: Vec<Chain>,
        params: Vec<PresetParam>,
    ) -> Self {
        let params = params
            .into_iter()
            .filter(|p| p.branch < branches.len())
            .collect();
        let label = origin.label();
        Self {
            origin,
            label,
            definition: definition.into(),
            branches,
            params,
            scratch: Vec::new(),
            in_channels: 0,
        }
    }

    /// Where the definition came from.
    pub fn origin(&self) -> &PresetOrigin {
        &self.origin
    }

    /// The definition text the branches were built from.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// The parallel branches. A serial preset has exactly one.
    pub fn branches(&self) -> &[Chain] {
        &self.branches
    }

    /// Placeholder routing, in parameter order.
    pub fn params(&self) -> &[PresetParam] {
        &self.params
    }

    fn route(&self, index: usize) -> Option<&PresetParam> {
        index.checked_sub(1).and_then(|i| self.params.get(i))
    }
}

impl Operator for Preset {
    fn name(&self) -> &str {
        &self.label
    }

    fn description(&self) -> &str {
        &self.definition
    }

    fn keyword(&self) -> &str {
        self.origin.keyword()
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        self.params
            .iter()
            .map(|p| Cow::Owned(p.name.clone()))
            .collect()
    }

    fn number_of_params(&self) -> usize {
        self.params.len()
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        let Some(p) = self.route(index).cloned() else {
            return;
        };
        let branch = &mut self.branches[p.branch];
        match p.slot {
            PresetSlot::Operator(n) => {
                if let Some(op) = branch.chain_operator_mut(n) {
                    op.set_parameter(p.param, value);
                }
            }
            PresetSlot::Controller(n) => {
                if let Some(ctrl) = branch.controller_mut(n) {
                    ctrl.set_parameter(p.param, value);
                }
            }
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        let Some(p) = self.route(index) else {
            return 0.0;
        };
        let branch = &self.branches[p.branch];
        match p.slot {
            PresetSlot::Operator(n) => branch
                .chain_operator(n)
                .map(|op| op.get_parameter(p.param))
                .unwrap_or(0.0),
            PresetSlot::Controller(n) => branch
                .controller(n)
                .map(|c| c.get_parameter(p.param))
                .unwrap_or(0.0),
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        let Some(p) = self.route(index) else {
            return;
        };
        let branch = &self.branches[p.branch];
        let inner = match p.slot {
            PresetSlot::Operator(n) => branch
                .chain_operator(n)
                .and_then(|op| op.describe_parameter(p.param)),
            PresetSlot::Controller(n) => branch
                .controller(n)
                .and_then(|c| c.describe_parameter(p.param)),
        };
        if let Some(inner) = inner {
            *desc = inner;
        }
    }
}

impl ChainOperator for Preset {
    fn init(&mut self, buffer: &SampleBuffer) {
        self.in_channels = buffer.channel_count();
        self.scratch.clear();
        for branch in &mut self.branches {
            let mut scratch = buffer.clone();
            branch.bind(&mut scratch, self.in_channels, self.in_channels);
            self.scratch.push(scratch);
        }
    }

    fn process(&mut self, buffer: &mut SampleBuffer) {
        let out_channels = buffer.channel_count();
        let in_channels = self.in_channels.min(out_channels);
        match self.branches.as_mut_slice() {
            [] => {}
            [branch] => {
                buffer.set_channel_count(in_channels);
                branch.process_block(buffer);
                buffer.set_channel_count(out_channels);
            }
            branches => {
                let count = branches.len();
                self.scratch.resize_with(count, SampleBuffer::default);
                for (branch, scratch) in branches.iter_mut().zip(self.scratch.iter_mut()) {
                    scratch.set_sample_rate(buffer.sample_rate());
                    scratch.set_channel_count(in_channels);
                    scratch.copy_from(buffer);
                    branch.process_block(scratch);
                }
                buffer.make_silent();
                for scratch in &self.scratch {
                    buffer.add_from(scratch);
                }
                buffer.divide_by(count as f32);
            }
        }
    }

    fn output_channels(&self, input_channels: usize) -> usize {
        self.branches
            .iter()
            .map(|b| b.output_channels(input_channels))
            .max()
            .unwrap_or(input_channels)
    }

    fn output_samples(&self, input_samples: usize) -> usize {
        self.branches
            .iter()
            .map(|b| b.output_samples(input_samples))
            .max()
            .unwrap_or(input_samples)
    }

    fn release(&mut self) {
        for branch in &mut self.branches {
            branch.unbind();
        }
        self.scratch.clear();
    }

    fn status(&self) -> String {
        let mut out = String::new();
        for (i, branch) in self.branches.iter().enumerate() {
            if i > 0 {
                out.push_str(" | ");
            }
            let _ = write!(out, "{branch}");
        }
        out
    }

    fn label(&self) -> Option<&str> {
        Some(&self.label)
    }
}
