//! MIDI continuous controller input.
//!
//! A [`MidiCcTable`] holds the last value received for every
//! (channel, controller) pair. Whatever reads the MIDI port writes to the
//! table; any number of [`MidiController`] sources read from it on the
//! processing thread. Every slot is a single atomic, so neither side ever
//! blocks.

use std::borrow::Cow;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, LazyLock};

use catena_core::{ControllerSource, Operator, ParamDescriptor, ParamFlags, param_names};

/// MIDI channels, numbered 0–15.
pub const MIDI_CHANNELS: usize = 16;
/// Controllers per channel, numbered 0–127.
pub const MIDI_CONTROLLERS: usize = 128;

const UNSET: u16 = u16::MAX;
const CONTROL_CHANGE: u8 = 0xB0;

static GLOBAL_TABLE: LazyLock<Arc<MidiCcTable>> = LazyLock::new(|| Arc::new(MidiCcTable::new()));

/// Last received value per MIDI channel and controller number.
#[derive(Debug)]
pub struct MidiCcTable {
    slots: Box<[AtomicU16]>,
}

impl MidiCcTable {
    /// Creates a table with nothing received yet.
    pub fn new() -> Self {
        Self {
            slots: (0..MIDI_CHANNELS * MIDI_CONTROLLERS)
                .map(|_| AtomicU16::new(UNSET))
                .collect(),
        }
    }

    /// Process-wide table used by [`MidiController::new`].
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_TABLE)
    }

    fn slot(&self, channel: usize, controller: usize) -> Option<&AtomicU16> {
        if channel >= MIDI_CHANNELS || controller >= MIDI_CONTROLLERS {
            return None;
        }
        self.slots.get(channel * MIDI_CONTROLLERS + controller)
    }

    /// Stores a value (0–127; larger values are masked to 7 bits).
    pub fn set(&self, channel: usize, controller: usize, value: u8) {
        if let Some(slot) = self.slot(channel, controller) {
            slot.store(u16::from(value & 0x7F), Ordering::Relaxed);
        }
    }

    /// Returns the last value received, if any.
    pub fn get(&self, channel: usize, controller: usize) -> Option<u8> {
        let raw = self.slot(channel, controller)?.load(Ordering::Relaxed);
        (raw != UNSET).then_some(raw as u8)
    }

    /// Forgets every received value.
    pub fn clear(&self) {
        for slot in self.slots.iter() {
            slot.store(UNSET, Ordering::Relaxed);
        }
    }

    /// Records a raw MIDI message. Returns `true` if it was a control
    /// change; every other message is ignored.
    pub fn handle_message(&self, message: &[u8]) -> bool {
        let [status, controller, value, ..] = *message else {
            return false;
        };
        if status & 0xF0 != CONTROL_CHANGE {
            return false;
        }
        let channel = usize::from(status & 0x0F);
        self.set(channel, usize::from(controller & 0x7F), value);
        #[cfg(feature = "tracing")]
        tracing::trace!(channel, controller, value, "midi control change");
        true
    }
}

impl Default for MidiCcTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Follows one MIDI continuous controller.
///
/// Outputs the last received value divided by 127. Until the first message
/// arrives it outputs the seed value, which the owning controller sets from
/// the target parameter's current value, so attaching a controller does not
/// make the parameter jump.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | controller | 0–127, integer | 0 |
/// | 2 | channel | 0–15, integer | 0 |
#[derive(Debug, Clone)]
pub struct MidiController {
    controller: usize,
    channel: usize,
    current: f32,
    step: f64,
    table: Arc<MidiCcTable>,
}

impl MidiController {
    /// Creates a source reading the process-wide table.
    pub fn new(controller: usize, channel: usize) -> Self {
        Self::with_table(MidiCcTable::global(), controller, channel)
    }

    /// Creates a source reading `table`.
    pub fn with_table(table: Arc<MidiCcTable>, controller: usize, channel: usize) -> Self {
        Self {
            controller,
            channel,
            current: 0.0,
            step: 0.0,
            table,
        }
    }
}

impl Default for MidiController {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl Operator for MidiController {
    fn name(&self) -> &str {
        "MIDI controller"
    }

    fn description(&self) -> &str {
        "Value of a MIDI continuous controller."
    }

    fn keyword(&self) -> &str {
        "km"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("controller,channel")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.controller = value.max(0.0) as usize,
            2 => self.channel = value.max(0.0) as usize,
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.controller as f32,
            2 => self.channel as f32,
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        let upper = match index {
            1 => MIDI_CONTROLLERS - 1,
            2 => MIDI_CHANNELS - 1,
            _ => return,
        };
        *desc = desc
            .bounded(0.0, upper as f32)
            .with_flags(ParamFlags::INTEGER);
    }
}

impl ControllerSource for MidiController {
    fn init(&mut self, step_length: f64) {
        self.step = step_length;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            controller = self.controller,
            channel = self.channel,
            "midi controller initialized"
        );
    }

    fn value(&mut self) -> f32 {
        if let Some(raw) = self.table.get(self.channel, self.controller) {
            self.current = f32::from(raw) / 127.0;
        }
        self.current
    }

    fn step_length(&self) -> f64 {
        self.step
    }

    fn seed(&mut self, value: f32) {
        self.current = value.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_starts_empty() {
        let table = MidiCcTable::new();
        assert_eq!(table.get(0, 7), None);
        table.set(0, 7, 100);
        assert_eq!(table.get(0, 7), Some(100));
        assert_eq!(table.get(1, 7), None);
        table.clear();
        assert_eq!(table.get(0, 7), None);
    }

    #[test]
    fn test_table_ignores_out_of_range() {
        let table = MidiCcTable::new();
        table.set(16, 0, 1);
        table.set(0, 128, 1);
        assert_eq!(table.get(16, 0), None);
        assert_eq!(table.get(0, 128), None);
    }

    #[test]
    fn test_handle_message_parses_control_change() {
        let table = MidiCcTable::new();
        assert!(table.handle_message(&[0xB3, 74, 64]));
        assert_eq!(table.get(3, 74), Some(64));
        // Note on is not a control change.
        assert!(!table.handle_message(&[0x90, 60, 100]));
        assert!(!table.handle_message(&[0xB0, 1]));
    }

    #[test]
    fn test_controller_holds_seed_until_first_message() {
        let table = Arc::new(MidiCcTable::new());
        let mut ctrl = MidiController::with_table(Arc::clone(&table), 7, 2);
        ctrl.init(0.01);
        ctrl.seed(0.3);
        assert_eq!(ctrl.value(), 0.3);

        table.set(2, 7, 127);
        assert_eq!(ctrl.value(), 1.0);
        table.set(2, 7, 0);
        assert_eq!(ctrl.value(), 0.0);
        assert!(!ctrl.is_position_aware());
    }

    #[test]
    fn test_clones_share_the_table() {
        let table = Arc::new(MidiCcTable::new());
        let mut a = MidiController::with_table(Arc::clone(&table), 1, 0);
        let mut b = a.clone();
        table.handle_message(&[0xB0, 1, 127]);
        assert_eq!(a.value(), 1.0);
        assert_eq!(b.value(), 1.0);
    }
}
