//! Audio stamping: publishing a chain's signal for controllers elsewhere.

use std::borrow::Cow;

use catena_core::{
    ChainOperator, Operator, ParamDescriptor, ParamFlags, SampleBuffer, StampServer, param_names,
};

/// Stores every block it sees in a [`StampServer`] under `stamp-id`, passing
/// the audio through untouched.
///
/// Controllers such as the volume analyser read the stamp back, so the
/// server handed to [`AudioStamp::with_server`] must be shared with them.
/// The default instance owns a private table.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | stamp-id | integer | 1 |
#[derive(Debug, Clone)]
pub struct AudioStamp {
    id: i32,
    server: StampServer,
}

impl AudioStamp {
    /// Creates a stamp writer on a private table.
    pub fn new(id: i32) -> Self {
        Self::with_server(id, StampServer::new())
    }

    /// Creates a stamp writer publishing into `server`.
    pub fn with_server(id: i32, server: StampServer) -> Self {
        Self { id, server }
    }

    /// The table this operator writes to.
    pub fn server(&self) -> &StampServer {
        &self.server
    }
}

impl Default for AudioStamp {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Operator for AudioStamp {
    fn name(&self) -> &str {
        "Audio stamp"
    }

    fn description(&self) -> &str {
        "Takes a snapshot of the passing audio for controllers to read."
    }

    fn keyword(&self) -> &str {
        "eS"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("stamp-id")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == 1 {
            self.id = value as i32;
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        if index == 1 { self.id as f32 } else { 0.0 }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        if index == 1 {
            *desc = desc.with_default(1.0).with_flags(ParamFlags::INTEGER);
        }
    }
}

impl ChainOperator for AudioStamp {
    fn init(&mut self, _buffer: &SampleBuffer) {}

    fn process(&mut self, buffer: &mut SampleBuffer) {
        self.server.store(self.id, buffer);
    }
}
