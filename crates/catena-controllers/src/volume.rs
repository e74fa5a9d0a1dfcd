//! Level of a stamped block as a control signal.

use std::borrow::Cow;

use catena_core::{
    ControllerSource, Operator, ParamDescriptor, ParamFlags, StampServer, param_names,
};

/// Follows the level of the block stored under `stamp-id`.
///
/// Pair it with an `eS` operator writing to the same [`StampServer`]. With
/// `rms-toggle` set the output is the block's RMS level, otherwise its mean
/// absolute amplitude; either way it is clamped to \[0, 1\]. While no stamp
/// exists under the id the source holds its last value, starting from the
/// seed.
///
/// ## Parameter Indices
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 1 | stamp-id | integer | 1 |
/// | 2 | rms-toggle | 0 or 1 | 1 |
#[derive(Debug, Clone)]
pub struct VolumeAnalyzer {
    id: i32,
    rms: bool,
    current: f32,
    step: f64,
    server: StampServer,
}

impl VolumeAnalyzer {
    /// Creates a source reading `server`.
    pub fn with_server(server: StampServer, id: i32, rms: bool) -> Self {
        Self {
            id,
            rms,
            current: 0.0,
            step: 0.0,
            server,
        }
    }

    /// The table this source reads from.
    pub fn server(&self) -> &StampServer {
        &self.server
    }
}

impl Default for VolumeAnalyzer {
    fn default() -> Self {
        Self::with_server(StampServer::new(), 1, true)
    }
}

impl Operator for VolumeAnalyzer {
    fn name(&self) -> &str {
        "Volume analyzer"
    }

    fn description(&self) -> &str {
        "Level of an audio stamp."
    }

    fn keyword(&self) -> &str {
        "ksv"
    }

    fn parameter_names(&self) -> Vec<Cow<'static, str>> {
        param_names("stamp-id,rms-toggle")
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            1 => self.id = value as i32,
            2 => self.rms = value != 0.0,
            _ => {}
        }
    }

    fn get_parameter(&self, index: usize) -> f32 {
        match index {
            1 => self.id as f32,
            2 => f32::from(u8::from(self.rms)),
            _ => 0.0,
        }
    }

    fn parameter_description(&self, index: usize, desc: &mut ParamDescriptor) {
        match index {
            1 => *desc = desc.with_default(1.0).with_flags(ParamFlags::INTEGER),
            2 => {
                *desc = desc
                    .with_default(1.0)
                    .bounded(0.0, 1.0)
                    .with_flags(ParamFlags::TOGGLED);
            }
            _ => {}
        }
    }
}

impl ControllerSource for VolumeAnalyzer {
    fn init(&mut self, step_length: f64) {
        self.step = step_length;
        #[cfg(feature = "tracing")]
        tracing::debug!(stamp = self.id, rms = self.rms, "volume analyzer initialized");
    }

    fn value(&mut self) -> f32 {
        let rms = self.rms;
        let level = self.server.with_stamp(self.id, |block| {
            if rms {
                block.rms_volume()
            } else {
                block.average_amplitude()
            }
        });
        if let Some(level) = level {
            self.current = level.clamp(0.0, 1.0);
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
    use catena_core::SampleBuffer;

    use super::*;

    fn square(level: f32) -> SampleBuffer {
        let mut buf = SampleBuffer::new(2, 4, 1000);
        for ch in buf.channels_mut() {
            ch.copy_from_slice(&[level, -level, level, -level]);
        }
        buf
    }

    #[test]
    fn test_follows_stamp_level() {
        let server = StampServer::new();
        let mut ctrl = VolumeAnalyzer::with_server(server.clone(), 2, true);
        ctrl.init(0.01);
        ctrl.seed(0.25);
        assert_eq!(ctrl.value(), 0.25);

        server.store(2, &square(0.5));
        assert_eq!(ctrl.value(), 0.5);

        // A half-silent block separates the two measures.
        let mut block = square(0.5);
        block.channel_mut(1).fill(0.0);
        server.store(2, &block);
        let rms = ctrl.value();
        ctrl.set_parameter(2, 0.0);
        assert_eq!(ctrl.value(), 0.25);
        assert!((rms - libm::sqrtf(0.125)).abs() < 1e-6);
    }

    #[test]
    fn test_level_is_clamped() {
        let server = StampServer::new();
        server.store(1, &square(4.0));
        let mut ctrl = VolumeAnalyzer::with_server(server, 1, false);
        assert_eq!(ctrl.value(), 1.0);
        assert!(!ctrl.is_position_aware());
    }

    #[test]
    fn test_parameters() {
        let mut ctrl = VolumeAnalyzer::default();
        assert_eq!(ctrl.parameter_values(), vec![1.0, 1.0]);
        ctrl.set_parameter(1, 5.0);
        ctrl.set_parameter(2, 0.0);
        assert_eq!(ctrl.parameter_values(), vec![5.0, 0.0]);
        assert_eq!(ctrl.keyword(), "ksv");
    }
}
